// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Lowest sensor id accepted by the aggregator in this deployment.
pub const MIN_SENSOR_ID: i64 = 0;

/// Highest sensor id accepted by the aggregator in this deployment.
pub const MAX_SENSOR_ID: i64 = 4;

pub const DEFAULT_TOP_N: usize = 5;

pub const DEFAULT_LOG_PATH: &str = "traffic_data.txt";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of whitespace-separated fields on a well-formed log line.
pub const RECORD_FIELDS: usize = 3;
