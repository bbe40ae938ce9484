// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Errors reported by the Teams target to the owning pipeline.
//!
//! The target never retries or swallows a failure. Every variant is handed
//! back verbatim so the pipeline decides whether to drop, retry or escalate.

/// Result type alias for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Errors that can occur while initializing the target or dispatching an event.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Missing or invalid configuration, or a payload formatter that cannot be
    /// resolved. Fatal: repeating the call will fail the same way.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The webhook answered with a non-success status code.
    #[error("Rest Call Failed - {reason}")]
    Delivery {
        /// HTTP status code returned by the webhook
        status: u16,
        /// Reason phrase of the response status line
        reason: String,
    },

    /// Network-level failure while sending the request.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller cancelled the dispatch before it completed.
    #[error("Dispatch cancelled")]
    Cancelled,

    #[error("Target not initialized")]
    NotInitialized,

    #[error("Target closed")]
    Closed,

    /// The runtime backing the blocking entry point could not be created.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl TargetError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a delivery failure from a response status and reason phrase.
    pub fn delivery(status: u16, reason: impl Into<String>) -> Self {
        Self::Delivery {
            status,
            reason: reason.into(),
        }
    }

    /// True when the dispatch was aborted by the caller rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for errors that will recur on every dispatch until the
    /// configuration changes.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
