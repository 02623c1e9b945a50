// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Congestion report built from the final aggregate state.

use std::cmp::Reverse;
use std::fmt;
use std::io;

use crate::aggregator::{AggregateState, SensorTotal, Timeline};

/// Sensors ordered by descending total, ties broken by ascending sensor id,
/// truncated to `top_n` entries.
#[must_use]
pub fn rank(state: &AggregateState, top_n: usize) -> Vec<SensorTotal> {
    let mut ranked = state.totals().to_vec();
    ranked.sort_unstable_by_key(|entry| (Reverse(entry.total), entry.sensor_id));
    ranked.truncate(top_n);
    ranked
}

#[derive(Debug)]
pub struct Report<'a> {
    top_n: usize,
    ranked: Vec<SensorTotal>,
    max_total: u64,
    timeline: &'a Timeline,
}

impl<'a> Report<'a> {
    #[must_use]
    pub fn build(state: &'a AggregateState, top_n: usize) -> Self {
        Self {
            top_n,
            ranked: rank(state, top_n),
            max_total: state.running_max(),
            timeline: state.timeline(),
        }
    }

    #[must_use]
    pub fn ranked(&self) -> &[SensorTotal] {
        &self.ranked
    }

    #[must_use]
    pub fn max_total(&self) -> u64 {
        self.max_total
    }

    pub fn write_to<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "{self}")?;
        out.flush()
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Top {} most congested traffic lights across all timestamps:",
            self.top_n
        )?;
        for entry in &self.ranked {
            writeln!(
                f,
                "Light ID: {}, Total Cars Passed: {}",
                entry.sensor_id, entry.total
            )?;
        }
        writeln!(
            f,
            "\nMaximum Cars Passed by a Single Traffic Light: {}",
            self.max_total
        )?;

        writeln!(f, "\nDetailed Timestamp-wise Traffic Data:")?;
        for (timestamp, entries) in self.timeline {
            writeln!(f, "Timestamp: {timestamp} min")?;
            for entry in entries {
                writeln!(
                    f,
                    "  Light ID: {} | Cars Passed: {}",
                    entry.sensor_id, entry.count
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Aggregator, SensorRange};
    use crate::record::TrafficRecord;
    use proptest::prelude::*;

    fn state(records: &[(i64, i64, u64)]) -> AggregateState {
        let mut aggregator = Aggregator::new(SensorRange::default());
        aggregator.fold_all(
            records
                .iter()
                .map(|&(timestamp, sensor_id, count)| TrafficRecord::new(timestamp, sensor_id, count)),
        );
        aggregator.into_state()
    }

    #[test]
    fn test_scenario_top_one() {
        let state = state(&[(0, 1, 10), (0, 2, 5), (5, 1, 20), (5, 7, 99)]);
        let report = Report::build(&state, 1);

        assert_eq!(
            report.ranked(),
            &[SensorTotal {
                sensor_id: 1,
                total: 30
            }]
        );
        assert!(report
            .to_string()
            .contains("Light ID: 1, Total Cars Passed: 30\n"));
    }

    #[test]
    fn test_full_rendering() {
        let state = state(&[(0, 1, 10), (0, 2, 5), (5, 1, 20), (5, 7, 99)]);
        let expected = "\
Top 5 most congested traffic lights across all timestamps:
Light ID: 1, Total Cars Passed: 30
Light ID: 2, Total Cars Passed: 5

Maximum Cars Passed by a Single Traffic Light: 30

Detailed Timestamp-wise Traffic Data:
Timestamp: 0 min
  Light ID: 1 | Cars Passed: 10
  Light ID: 2 | Cars Passed: 5
Timestamp: 5 min
  Light ID: 1 | Cars Passed: 20
";
        assert_eq!(Report::build(&state, 5).to_string(), expected);
    }

    #[test]
    fn test_empty_rendering() {
        let state = AggregateState::default();
        let expected = "\
Top 5 most congested traffic lights across all timestamps:

Maximum Cars Passed by a Single Traffic Light: 0

Detailed Timestamp-wise Traffic Data:
";
        assert_eq!(Report::build(&state, 5).to_string(), expected);
    }

    #[test]
    fn test_timeline_sorted_by_timestamp() {
        let state = state(&[(30, 0, 1), (-5, 1, 2), (10, 2, 3)]);
        let rendered = Report::build(&state, 5).to_string();
        let headers: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("Timestamp:"))
            .collect();
        assert_eq!(
            headers,
            vec!["Timestamp: -5 min", "Timestamp: 10 min", "Timestamp: 30 min"]
        );
    }

    #[test]
    fn test_ties_break_by_ascending_sensor_id() {
        let state = state(&[(0, 4, 7), (0, 2, 7), (0, 3, 9), (0, 0, 7)]);
        let ids: Vec<i64> = rank(&state, 5).iter().map(|e| e.sensor_id).collect();
        assert_eq!(ids, vec![3, 0, 2, 4]);
    }

    #[test]
    fn test_write_to_matches_display() {
        let state = state(&[(1, 1, 1)]);
        let report = Report::build(&state, 3);
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), report.to_string());
    }

    proptest! {
        #[test]
        fn prop_ranked_is_bounded_and_ordered(
            records in prop::collection::vec((0i64..10, 0i64..5, 0u64..50), 0..100),
            top_n in 0usize..8,
        ) {
            let state = state(&records);
            let ranked = rank(&state, top_n);

            prop_assert_eq!(ranked.len(), top_n.min(state.totals().len()));
            for pair in ranked.windows(2) {
                prop_assert!(
                    pair[0].total > pair[1].total
                        || (pair[0].total == pair[1].total && pair[0].sensor_id < pair[1].sensor_id)
                );
            }
        }
    }
}
