// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record queue between the record source and the aggregator.
//!
//! Built on a tokio mpsc channel. The producer owns the only [`RecordHandle`];
//! dropping it (or calling [`RecordHandle::mark_done`]) closes the channel, and
//! the consumer observes [`Drained::Finished`] once every pushed record has been
//! received. The channel is unbounded unless built with [`bounded`], in which
//! case `push` blocks while the queue is full.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, trace};

use crate::record::TrafficRecord;

/// Result of a single drain of the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Drained {
    /// Every record that was queued when the consumer woke up, in push order.
    Batch(Vec<TrafficRecord>),
    /// The producer has finished and nothing is left to consume.
    Finished,
}

#[derive(Debug)]
enum Tx {
    Unbounded(mpsc::UnboundedSender<TrafficRecord>),
    Bounded(mpsc::Sender<TrafficRecord>),
}

#[derive(Debug)]
enum Rx {
    Unbounded(mpsc::UnboundedReceiver<TrafficRecord>),
    Bounded(mpsc::Receiver<TrafficRecord>),
}

impl Rx {
    fn blocking_recv(&mut self) -> Option<TrafficRecord> {
        match self {
            Rx::Unbounded(rx) => rx.blocking_recv(),
            Rx::Bounded(rx) => rx.blocking_recv(),
        }
    }

    async fn recv(&mut self) -> Option<TrafficRecord> {
        match self {
            Rx::Unbounded(rx) => rx.recv().await,
            Rx::Bounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<TrafficRecord> {
        match self {
            Rx::Unbounded(rx) => rx.try_recv().ok(),
            Rx::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

/// Producer side of the queue. Not `Clone`: there is exactly one producer and
/// the queue is done once this handle is gone.
#[derive(Debug)]
pub struct RecordHandle {
    tx: Tx,
}

#[derive(Debug)]
pub struct RecordReceiver {
    rx: Rx,
}

#[must_use]
pub fn unbounded() -> (RecordHandle, RecordReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RecordHandle {
            tx: Tx::Unbounded(tx),
        },
        RecordReceiver {
            rx: Rx::Unbounded(rx),
        },
    )
}

/// Queue holding at most `capacity` records. A capacity of zero is raised to one.
#[must_use]
pub fn bounded(capacity: usize) -> (RecordHandle, RecordReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RecordHandle {
            tx: Tx::Bounded(tx),
        },
        RecordReceiver {
            rx: Rx::Bounded(rx),
        },
    )
}

/// Unbounded when `capacity` is `None`.
#[must_use]
pub fn channel(capacity: Option<usize>) -> (RecordHandle, RecordReceiver) {
    match capacity {
        Some(capacity) => bounded(capacity),
        None => unbounded(),
    }
}

impl RecordHandle {
    /// Appends a record. Never blocks on an unbounded queue; on a bounded queue
    /// this waits for room, so it must be called from a blocking thread and not
    /// from within an async task.
    ///
    /// Fails only when the receiver has been dropped.
    pub fn push(&self, record: TrafficRecord) -> Result<(), SendError<TrafficRecord>> {
        match &self.tx {
            Tx::Unbounded(tx) => tx.send(record),
            Tx::Bounded(tx) => tx.blocking_send(record),
        }
    }

    /// Closes the queue. Records already pushed are still delivered.
    pub fn mark_done(self) {
        debug!("Record queue marked done");
    }
}

impl RecordReceiver {
    /// Blocks until at least one record is queued or the producer is done, then
    /// takes every queued record. Must not be called from within an async task.
    pub fn drain_all(&mut self) -> Drained {
        let first = self.rx.blocking_recv();
        self.collect(first)
    }

    /// Async counterpart of [`RecordReceiver::drain_all`].
    pub async fn recv_batch(&mut self) -> Drained {
        let first = self.rx.recv().await;
        self.collect(first)
    }

    fn collect(&mut self, first: Option<TrafficRecord>) -> Drained {
        let Some(first) = first else {
            return Drained::Finished;
        };

        let mut batch = vec![first];
        while let Some(record) = self.rx.try_recv() {
            batch.push(record);
        }
        trace!("Drained {} records from queue", batch.len());
        Drained::Batch(batch)
    }
}
