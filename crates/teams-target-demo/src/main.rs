// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use teams_target::{LogEvent, LogLevel, Target, TargetConfig, TeamsTarget, Variables};

const VARIABLE_PREFIX: &str = "TEAMS_VAR_";
const LOGGER_NAME: &str = "teams-target-demo";

const LEVELS: [LogLevel; 6] = [
    LogLevel::Trace,
    LogLevel::Debug,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Error,
    LogLevel::Critical,
];

/// Builds the variable table from `TEAMS_VAR_<NAME>` entries, keyed by the
/// lowercased name.
fn variables_from_env<I>(vars: I) -> Variables
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(VARIABLE_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_lowercase(), value))
        })
        .collect()
}

#[tokio::main]
pub async fn main() {
    let log_level = env::var("TEAMS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
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

    let config = match TargetConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating target config: {e}");
            return;
        }
    };

    let variables = variables_from_env(env::vars());
    debug!(count = variables.len(), "Loaded layout variables");

    let target = TeamsTarget::new(config);
    if let Err(e) = target.initialize(&variables) {
        error!("Error initializing {} target: {e}", target.name());
        return;
    }

    let cancel = CancellationToken::new();
    let mut failures = 0;
    for level in LEVELS {
        let event = LogEvent::new(level, LOGGER_NAME, format!("Sample {level} event"))
            .with_property("sample", true);
        match target.write_async(&event, cancel.child_token()).await {
            Ok(()) => info!(%level, "Event delivered"),
            Err(e) => {
                failures += 1;
                error!(%level, "Error delivering event: {e}");
            }
        }
    }

    target.close();
    info!(
        delivered = LEVELS.len() - failures,
        failed = failures,
        "Finished sending sample events"
    );
}
