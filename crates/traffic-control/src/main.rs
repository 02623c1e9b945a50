// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, io, path::PathBuf};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use traffic_stats::{config::TrafficConfig, pipeline::Pipeline, report::Report};

#[tokio::main]
pub async fn main() {
    let (mut config, rejected) = TrafficConfig::from_env();

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level)
                .expect("could not parse log level in configuration"),
        )
        .with_writer(io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    for e in &rejected {
        error!("{e}, using the default for this setting");
    }

    if let Some(path) = env::args_os().nth(1) {
        config.log_path = PathBuf::from(path);
    }

    if let Err(e) = run(&config, io::stdout().lock()).await {
        error!("Failed to write traffic report: {e}");
    }
}

/// Aggregates the log named by `config` and writes the report to `out`. An
/// unavailable log is logged and reported as empty data.
async fn run(config: &TrafficConfig, out: impl io::Write) -> io::Result<()> {
    let outcome = match Pipeline::new(config.pipeline_config()).run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Traffic pipeline failed: {e}");
            return Ok(());
        }
    };

    match &outcome.source {
        Ok(summary) => info!(
            "Aggregated {} of {} lines from {}",
            summary.records_pushed,
            summary.lines_read,
            config.log_path.display()
        ),
        Err(e) => warn!("{e}, reporting on empty data"),
    }

    Report::build(&outcome.state, config.top_n).write_to(out)
}
