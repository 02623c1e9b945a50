// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Consumer side of the pipeline: folds drained records into [`AggregateState`].
//!
//! The state is owned by a single [`Aggregator`] while records are folded and is
//! only handed out once the drain loop has observed the end of input.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::constants::{MAX_SENSOR_ID, MIN_SENSOR_ID};
use crate::queue::{Drained, RecordReceiver};
use crate::record::{SensorId, Timestamp, TrafficRecord};

/// Inclusive range of sensor ids that are aggregated. Records outside of it are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRange {
    pub min: SensorId,
    pub max: SensorId,
}

impl Default for SensorRange {
    fn default() -> Self {
        Self {
            min: MIN_SENSOR_ID,
            max: MAX_SENSOR_ID,
        }
    }
}

impl SensorRange {
    #[must_use]
    pub fn contains(&self, sensor_id: SensorId) -> bool {
        (self.min..=self.max).contains(&sensor_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTotal {
    pub sensor_id: SensorId,
    pub total: u64,
}

/// A single `(sensor, count)` observation recorded under a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub sensor_id: SensorId,
    pub count: u64,
}

pub type Timeline = BTreeMap<Timestamp, Vec<TimelineEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    // first-seen order
    totals: Vec<SensorTotal>,
    positions: HashMap<SensorId, usize>,
    timeline: Timeline,
    running_max: u64,
    folded: usize,
    discarded: usize,
}

impl AggregateState {
    /// Per-sensor totals in the order each sensor was first seen.
    #[must_use]
    pub fn totals(&self) -> &[SensorTotal] {
        &self.totals
    }

    #[must_use]
    pub fn total_for(&self, sensor_id: SensorId) -> Option<u64> {
        self.positions
            .get(&sensor_id)
            .map(|&position| self.totals[position].total)
    }

    /// Observations grouped by timestamp, ascending; entries keep arrival order.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    #[must_use]
    pub fn entries_at(&self, timestamp: Timestamp) -> Option<&[TimelineEntry]> {
        self.timeline.get(&timestamp).map(Vec::as_slice)
    }

    /// Largest per-sensor total observed at any point while folding.
    #[must_use]
    pub fn running_max(&self) -> u64 {
        self.running_max
    }

    #[must_use]
    pub fn records_folded(&self) -> usize {
        self.folded
    }

    #[must_use]
    pub fn records_discarded(&self) -> usize {
        self.discarded
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    fn add(&mut self, record: TrafficRecord) {
        let position = match self.positions.get(&record.sensor_id) {
            Some(&position) => position,
            None => {
                self.totals.push(SensorTotal {
                    sensor_id: record.sensor_id,
                    total: 0,
                });
                self.positions
                    .insert(record.sensor_id, self.totals.len() - 1);
                self.totals.len() - 1
            }
        };

        let entry = &mut self.totals[position];
        entry.total = entry.total.saturating_add(record.count);
        self.running_max = self.running_max.max(entry.total);

        self.timeline
            .entry(record.timestamp)
            .or_default()
            .push(TimelineEntry {
                sensor_id: record.sensor_id,
                count: record.count,
            });
        self.folded += 1;
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    range: SensorRange,
    state: AggregateState,
}

impl Aggregator {
    #[must_use]
    pub fn new(range: SensorRange) -> Self {
        Self {
            range,
            state: AggregateState::default(),
        }
    }

    /// Folds one record. Returns `false` when the sensor id is outside the valid range.
    pub fn fold(&mut self, record: TrafficRecord) -> bool {
        if !self.range.contains(record.sensor_id) {
            trace!(
                "Discarding record for sensor {} outside [{}, {}]",
                record.sensor_id,
                self.range.min,
                self.range.max
            );
            self.state.discarded += 1;
            return false;
        }
        self.state.add(record);
        true
    }

    pub fn fold_all(&mut self, records: impl IntoIterator<Item = TrafficRecord>) {
        for record in records {
            self.fold(record);
        }
    }

    /// Receives batches until the producer has finished and nothing is left,
    /// then returns the final state.
    pub async fn run(mut self, mut rx: RecordReceiver) -> AggregateState {
        debug!("Aggregator started");
        while let Drained::Batch(records) = rx.recv_batch().await {
            self.fold_all(records);
        }
        self.finish()
    }

    /// Same as [`Aggregator::run`] for a consumer on a plain thread.
    pub fn run_blocking(mut self, mut rx: RecordReceiver) -> AggregateState {
        debug!("Aggregator started");
        while let Drained::Batch(records) = rx.drain_all() {
            self.fold_all(records);
        }
        self.finish()
    }

    fn finish(self) -> AggregateState {
        debug!(
            "Aggregator finished: {} records folded, {} discarded, {} sensors",
            self.state.folded,
            self.state.discarded,
            self.state.totals.len()
        );
        self.state
    }

    #[must_use]
    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> AggregateState {
        self.state
    }
}
