// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record source: reads the traffic log line by line and feeds the queue.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, trace};

use crate::errors::SourceError;
use crate::queue::RecordHandle;
use crate::record::parse;

/// Counters reported by the source once input is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub lines_read: usize,
    pub records_pushed: usize,
    pub malformed_lines: usize,
}

pub struct RecordSource<R> {
    reader: R,
    origin: String,
}

impl RecordSource<BufReader<File>> {
    /// Opens the log at `path`. Callers decide whether an unavailable log aborts
    /// the run or degrades to an empty one.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|source| SourceError::Unavailable {
            path: origin.clone(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), origin))
    }
}

impl<R: BufRead> RecordSource<R> {
    pub fn new(reader: R, origin: impl Into<String>) -> Self {
        Self {
            reader,
            origin: origin.into(),
        }
    }

    /// Pushes every well-formed line to `queue` in file order, then marks the
    /// queue done. The handle is consumed, so the queue is closed on every exit
    /// path, including read errors, and the consumer is never left waiting.
    pub fn run(mut self, queue: RecordHandle) -> Result<SourceSummary, SourceError> {
        let mut summary = SourceSummary::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| SourceError::Read {
                    path: self.origin.clone(),
                    line: summary.lines_read + 1,
                    source,
                })?;
            if read == 0 {
                break;
            }
            summary.lines_read += 1;

            // Non UTF-8 lines cannot hold three integers, treat them as malformed.
            let parsed = std::str::from_utf8(&buf)
                .ok()
                .map(parse)
                .and_then(Result::ok);
            match parsed {
                Some(record) => {
                    if queue.push(record).is_err() {
                        error!("Record queue closed while reading {}", self.origin);
                        return Err(SourceError::QueueClosed {
                            path: self.origin.clone(),
                            line: summary.lines_read,
                        });
                    }
                    summary.records_pushed += 1;
                }
                None => {
                    trace!(
                        "Skipping malformed line {} of {}",
                        summary.lines_read,
                        self.origin
                    );
                    summary.malformed_lines += 1;
                }
            }
        }

        queue.mark_done();
        debug!(
            "Read {} lines from {}: {} records, {} malformed",
            summary.lines_read, self.origin, summary.records_pushed, summary.malformed_lines
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{bounded, unbounded, Drained, RecordReceiver};
    use crate::record::TrafficRecord;
    use std::io::{self, Cursor, Read};
    use tracing_test::traced_test;

    fn drain(rx: &mut RecordReceiver) -> Vec<TrafficRecord> {
        let mut records = Vec::new();
        while let Drained::Batch(batch) = rx.drain_all() {
            records.extend(batch);
        }
        records
    }

    #[test]
    fn test_pushes_records_in_file_order() {
        let (queue, mut rx) = unbounded();
        let summary = RecordSource::new(Cursor::new("0 1 10\n0 2 5\n5 1 20\n5 7 99"), "test")
            .run(queue)
            .unwrap();

        assert_eq!(
            summary,
            SourceSummary {
                lines_read: 4,
                records_pushed: 4,
                malformed_lines: 0,
            }
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                TrafficRecord::new(0, 1, 10),
                TrafficRecord::new(0, 2, 5),
                TrafficRecord::new(5, 1, 20),
                TrafficRecord::new(5, 7, 99),
            ]
        );
        assert_eq!(rx.drain_all(), Drained::Finished);
    }

    #[test]
    #[traced_test]
    fn test_skips_blank_and_malformed_lines() {
        let (queue, mut rx) = unbounded();
        let input = b"1 0 3\n\nnot a record\n2 1\n3 4 -1\n\xff\xfe 1 1\n4 3 8\n\n".to_vec();
        let summary = RecordSource::new(Cursor::new(input), "test")
            .run(queue)
            .unwrap();

        assert_eq!(summary.lines_read, 8);
        assert_eq!(summary.records_pushed, 2);
        assert_eq!(summary.malformed_lines, 6);
        assert_eq!(
            drain(&mut rx),
            vec![TrafficRecord::new(1, 0, 3), TrafficRecord::new(4, 3, 8)]
        );
        assert!(logs_contain("Skipping malformed line 3 of test"));
    }

    #[test]
    fn test_empty_input_marks_done() {
        let (queue, mut rx) = unbounded();
        let summary = RecordSource::new(Cursor::new(""), "test")
            .run(queue)
            .unwrap();

        assert_eq!(summary, SourceSummary::default());
        assert_eq!(rx.drain_all(), Drained::Finished);
    }

    #[test]
    fn test_bounded_queue_delivers_every_record() {
        let (queue, mut rx) = bounded(1);
        let input: String = (0..100).map(|n| format!("{n} {} 1\n", n % 5)).collect();
        let consumer = std::thread::spawn(move || drain(&mut rx));

        let summary = RecordSource::new(Cursor::new(input), "test")
            .run(queue)
            .unwrap();

        assert_eq!(summary.records_pushed, 100);
        assert_eq!(consumer.join().unwrap().len(), 100);
    }

    #[test]
    fn test_closed_queue_stops_the_source() {
        let (queue, rx) = unbounded();
        drop(rx);

        match RecordSource::new(Cursor::new("bad\n1 1 1\n2 2 2\n"), "test").run(queue) {
            Err(SourceError::QueueClosed { path, line }) => {
                assert_eq!(path, "test");
                assert_eq!(line, 2);
            }
            other => panic!("expected closed queue, got {other:?}"),
        }
    }

    #[test]
    fn test_open_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("traffic_data.txt");

        match RecordSource::open(&missing) {
            Err(SourceError::Unavailable { path, source }) => {
                assert!(path.ends_with("traffic_data.txt"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("expected missing file to be unavailable"),
        }
    }

    struct FailAfter {
        inner: Cursor<&'static str>,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.inner.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_read_error_keeps_pushed_records_and_marks_done() {
        let (queue, mut rx) = unbounded();
        let reader = BufReader::new(FailAfter {
            inner: Cursor::new("1 1 1\n2 2 2\n"),
        });

        let result = RecordSource::new(reader, "flaky").run(queue);

        match result {
            Err(SourceError::Read { path, line, .. }) => {
                assert_eq!(path, "flaky");
                assert_eq!(line, 3);
            }
            other => panic!("expected read error, got {other:?}"),
        }
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(rx.drain_all(), Drained::Finished);
    }
}
