// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Traffic records and the line grammar of the traffic log.
//!
//! Each line of the log carries three whitespace-separated integers:
//! `<timestamp minutes> <sensor id> <cars passed>`.

use std::fmt;

use crate::constants::RECORD_FIELDS;
use crate::errors::ParseError;

pub type Timestamp = i64;
pub type SensorId = i64;

/// One reading of a traffic light: how many cars crossed at a given minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrafficRecord {
    pub timestamp: Timestamp,
    pub sensor_id: SensorId,
    pub count: u64,
}

impl TrafficRecord {
    #[must_use]
    pub const fn new(timestamp: Timestamp, sensor_id: SensorId, count: u64) -> Self {
        Self {
            timestamp,
            sensor_id,
            count,
        }
    }
}

impl fmt::Display for TrafficRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.sensor_id, self.count)
    }
}

/// Parses a single log line into a [`TrafficRecord`].
///
/// The sensor id is not range checked here; filtering is an aggregation policy.
///
/// The whole line must be exactly three integers. Nothing is salvaged from a
/// longer or suffixed line: `"1 2 3 4"` and `"1 2 3x"` are both malformed, where
/// a reader that extracts the first three integers from the stream would have
/// taken `(1, 2, 3)` from each.
///
/// ```
/// use traffic_stats::record::{parse, TrafficRecord};
///
/// assert_eq!(parse("5 1 20"), Ok(TrafficRecord::new(5, 1, 20)));
/// assert!(parse("5 1").is_err());
/// assert!(parse("5 1 20 7").is_err());
/// ```
pub fn parse(line: &str) -> Result<TrafficRecord, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != RECORD_FIELDS {
        return Err(ParseError::FieldCount(fields.len()));
    }

    let timestamp = parse_field("timestamp", fields[0])?;
    let sensor_id = parse_field("sensor id", fields[1])?;
    let count = parse_field("count", fields[2])?;
    let count = u64::try_from(count).map_err(|_| ParseError::NegativeCount(count))?;

    Ok(TrafficRecord {
        timestamp,
        sensor_id,
        count,
    })
}

fn parse_field(field: &'static str, value: &str) -> Result<i64, ParseError> {
    value.parse::<i64>().map_err(|_| ParseError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}
