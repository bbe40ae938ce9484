// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log events as handed over by the owning pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "Trace",
            Self::Debug => "Debug",
            Self::Info => "Info",
            Self::Warn => "Warn",
            Self::Error => "Error",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// A single structured log event. Read-only to the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    /// Name of the logger (category) that produced the event.
    pub logger_name: String,
    pub timestamp: DateTime<Utc>,
    /// Rendered exception or error chain attached to the event.
    pub exception: Option<String>,
    /// Named event properties, ordered by name.
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl LogEvent {
    /// Creates an event stamped with the current time and no properties.
    pub fn new(level: LogLevel, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            logger_name: logger_name.into(),
            timestamp: Utc::now(),
            exception: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns a property rendered as text. Strings are returned verbatim,
    /// other JSON values in their serialized form.
    pub fn property_text(&self, name: &str) -> Option<String> {
        self.properties.get(name).map(value_text)
    }

    /// Copy of the event without its properties.
    pub(crate) fn without_properties(&self) -> Self {
        Self {
            properties: BTreeMap::new(),
            ..self.clone()
        }
    }
}

pub(crate) fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
