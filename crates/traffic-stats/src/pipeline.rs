// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot producer/consumer pipeline.
//!
//! The record source and the aggregator are two independent tasks connected
//! only by the record channel from [`crate::queue`]. [`Pipeline::run`] reads the
//! log on the tokio blocking pool and aggregates in an async task,
//! [`Pipeline::run_blocking`] uses two scoped OS threads. Either way both tasks
//! are joined before the final state is returned, and the state equals a
//! single-threaded fold over the input in file order.

use std::io::BufRead;
use std::path::PathBuf;

use tracing::debug;

use crate::aggregator::{AggregateState, Aggregator, SensorRange};
use crate::constants::DEFAULT_LOG_PATH;
use crate::errors::{PipelineError, SourceError};
use crate::queue::{self, RecordHandle};
use crate::source::{RecordSource, SourceSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub log_path: PathBuf,
    /// Unbounded queue when `None`.
    pub queue_capacity: Option<usize>,
    pub sensor_range: SensorRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            queue_capacity: None,
            sensor_range: SensorRange::default(),
        }
    }
}

/// Final state plus what the source reported. An unavailable log shows up as
/// `source: Err(..)` next to an empty state, the caller decides what to do with it.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub state: AggregateState,
    pub source: Result<SourceSummary, SourceError>,
}

enum Input {
    File(PathBuf),
    Reader(Box<dyn BufRead + Send>, String),
}

pub struct Pipeline {
    config: PipelineConfig,
    input: Input,
}

impl Pipeline {
    /// Pipeline over the log file at `config.log_path`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let input = Input::File(config.log_path.clone());
        Self { config, input }
    }

    /// Pipeline over an in-memory or already opened reader; `config.log_path` is ignored.
    #[must_use]
    pub fn from_reader(
        config: PipelineConfig,
        reader: impl BufRead + Send + 'static,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            config,
            input: Input::Reader(Box::new(reader), origin.into()),
        }
    }

    /// Reads the log on the blocking pool, aggregates in a spawned task and
    /// waits for both to finish.
    pub async fn run(self) -> Result<PipelineOutcome, PipelineError> {
        debug!("Starting traffic pipeline");
        let (handle, rx) = queue::channel(self.config.queue_capacity);
        let aggregator = Aggregator::new(self.config.sensor_range);

        let input = self.input;
        let source = tokio::task::spawn_blocking(move || produce(input, handle));
        let consumer = tokio::spawn(aggregator.run(rx));

        let (source, state) = tokio::join!(source, consumer);
        let source =
            source.map_err(|e| PipelineError::TaskJoin(format!("record source: {e}")))?;
        let state = state.map_err(|e| PipelineError::TaskJoin(format!("aggregator: {e}")))?;

        debug!("Traffic pipeline finished");
        Ok(PipelineOutcome { state, source })
    }

    /// Same as [`Pipeline::run`] for callers without a tokio runtime.
    pub fn run_blocking(self) -> Result<PipelineOutcome, PipelineError> {
        debug!("Starting traffic pipeline");
        let (handle, rx) = queue::channel(self.config.queue_capacity);
        let aggregator = Aggregator::new(self.config.sensor_range);
        let input = self.input;

        let outcome = std::thread::scope(|scope| {
            let source = scope.spawn(move || produce(input, handle));
            let consumer = scope.spawn(move || aggregator.run_blocking(rx));

            let source = source.join();
            let state = consumer.join();
            match (source, state) {
                (Ok(source), Ok(state)) => Ok(PipelineOutcome { state, source }),
                (Err(_), _) => Err(PipelineError::TaskJoin(
                    "record source panicked".to_string(),
                )),
                (_, Err(_)) => Err(PipelineError::TaskJoin("aggregator panicked".to_string())),
            }
        });

        debug!("Traffic pipeline finished");
        outcome
    }
}

fn produce(input: Input, handle: RecordHandle) -> Result<SourceSummary, SourceError> {
    match input {
        Input::File(path) => match RecordSource::open(&path) {
            Ok(source) => source.run(handle),
            Err(e) => {
                handle.mark_done();
                Err(e)
            }
        },
        Input::Reader(reader, origin) => RecordSource::new(reader, origin).run(handle),
    }
}
