// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for parsing, reading and running the traffic pipeline.

use std::io;

/// Reasons a single log line is rejected by the record grammar.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    #[error("{field} is not an integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("count must not be negative, got {0}")]
    NegativeCount(i64),
}

/// Failures of the record source. Lines that fail to parse are not errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("traffic log {path} is unavailable: {source}")]
    Unavailable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed reading traffic log {path} at line {line}: {source}")]
    Read {
        path: String,
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("record queue closed while reading {path} at line {line}")]
    QueueClosed { path: String, line: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline task failed: {0}")]
    TaskJoin(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
