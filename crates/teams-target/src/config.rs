// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Target configuration.
//!
//! A [`TargetConfig`] is built once when the pipeline loads its configuration,
//! either deserialized from the pipeline's own config format or read from the
//! process environment, and is immutable afterwards.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::card::{BUILTIN_LOCATION, DEFAULT_CARD};
use crate::error::{Result, TargetError};

/// Incoming webhook URL.
const ENV_WEBHOOK_URL: &str = "TEAMS_WEBHOOK_URL";
/// Registered type name of the payload formatter.
const ENV_CARD_IMPL: &str = "TEAMS_CARD_IMPL";
/// Registered location of the payload formatter.
const ENV_CARD_LOCATION: &str = "TEAMS_CARD_LOCATION";
const ENV_APPLICATION_NAME: &str = "TEAMS_APPLICATION_NAME";
const ENV_ENVIRONMENT: &str = "TEAMS_ENVIRONMENT";
const ENV_INCLUDE_EVENT_PROPERTIES: &str = "TEAMS_INCLUDE_EVENT_PROPERTIES";
const ENV_STRICT_VARIABLES: &str = "TEAMS_STRICT_VARIABLES";
const ENV_TIMEOUT_SECS: &str = "TEAMS_TIMEOUT_SECS";
const ENV_PROXY_HTTPS: &str = "TEAMS_PROXY_HTTPS";
/// Generic proxy variable used when no dedicated one is set.
const ENV_HTTPS_PROXY: &str = "HTTPS_PROXY";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration of a single Teams target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Teams incoming webhook URL.
    pub url: String,
    /// Type name the payload formatter is registered under.
    #[serde(default = "default_formatter_type")]
    pub formatter_type: String,
    /// Location (crate or plugin name) the payload formatter is registered under.
    #[serde(default = "default_formatter_location")]
    pub formatter_location: String,
    /// Name of the application, shown as the card title by the default card.
    /// Either a literal or a `${var:NAME}` reference.
    pub application_name: String,
    /// Stage the application runs in (develop, stage, production, ...). Not a
    /// process environment variable. Either a literal or a `${var:NAME}`
    /// reference.
    pub environment: String,
    /// Whether event properties are handed to the payload formatter.
    #[serde(default = "default_true")]
    pub include_event_properties: bool,
    /// Treat a `${var:NAME}` reference to an unknown variable as a
    /// configuration error instead of rendering it empty.
    #[serde(default)]
    pub strict_variables: bool,
    /// Timeout for each webhook request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// HTTPS proxy URL.
    #[serde(default)]
    pub https_proxy: Option<String>,
}

fn default_formatter_type() -> String {
    DEFAULT_CARD.to_string()
}

fn default_formatter_location() -> String {
    BUILTIN_LOCATION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl TargetConfig {
    /// Creates a configuration with the required fields and defaults for
    /// everything else.
    pub fn new(
        url: impl Into<String>,
        application_name: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            formatter_type: default_formatter_type(),
            formatter_location: default_formatter_location(),
            application_name: application_name.into(),
            environment: environment.into(),
            include_event_properties: true,
            strict_variables: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            https_proxy: None,
        }
    }

    /// Selects the payload formatter registered under `type_name` at `location`.
    pub fn with_formatter(
        mut self,
        type_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.formatter_type = type_name.into();
        self.formatter_location = location.into();
        self
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_iter(env::vars())
    }

    /// Builds a configuration from key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let required = |key: &str| {
            map.get(key)
                .and_then(|value| sanitize_non_empty(value))
                .ok_or_else(|| TargetError::configuration(format!("{key} is not set")))
        };

        let timeout_secs = match map.get(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                TargetError::configuration(format!("{ENV_TIMEOUT_SECS} is not a number: '{raw}'"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            url: required(ENV_WEBHOOK_URL)?,
            formatter_type: map
                .get(ENV_CARD_IMPL)
                .and_then(|value| sanitize_non_empty(value))
                .unwrap_or_else(default_formatter_type),
            formatter_location: map
                .get(ENV_CARD_LOCATION)
                .and_then(|value| sanitize_non_empty(value))
                .unwrap_or_else(default_formatter_location),
            // Trimmed like every other value; blank values are rejected.
            application_name: required(ENV_APPLICATION_NAME)?,
            environment: required(ENV_ENVIRONMENT)?,
            include_event_properties: parse_bool(
                map.get(ENV_INCLUDE_EVENT_PROPERTIES).map(String::as_str),
                true,
            ),
            strict_variables: parse_bool(map.get(ENV_STRICT_VARIABLES).map(String::as_str), false),
            timeout_secs,
            https_proxy: map
                .get(ENV_PROXY_HTTPS)
                .or_else(|| map.get(ENV_HTTPS_PROXY))
                .and_then(|value| sanitize_non_empty(value)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(TargetError::configuration("url is required"));
        }

        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| TargetError::configuration(format!("invalid url '{}': {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TargetError::configuration(format!(
                "url scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.application_name.trim().is_empty() {
            return Err(TargetError::configuration("application_name is required"));
        }

        if self.environment.trim().is_empty() {
            return Err(TargetError::configuration("environment is required"));
        }

        if self.formatter_type.trim().is_empty() || self.formatter_location.trim().is_empty() {
            return Err(TargetError::configuration(
                "formatter_type and formatter_location cannot be empty",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(TargetError::configuration(
                "timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses boolean values from strings, falling back to the provided default.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()) {
        Some(ref v) if ["1", "true", "t", "yes", "y"].contains(&v.as_str()) => true,
        Some(ref v) if ["0", "false", "f", "no", "n"].contains(&v.as_str()) => false,
        _ => default,
    }
}
