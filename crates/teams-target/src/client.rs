// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport used to post payloads to the webhook.

use core::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use tracing::{debug, error};

use crate::config::TargetConfig;
use crate::error::{Result, TargetError};

const USER_AGENT: &str = concat!("teams-target/", env!("CARGO_PKG_VERSION"));

/// Settings for the underlying reqwest client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub https_proxy: Option<String>,
}

impl From<&TargetConfig> for ClientSettings {
    fn from(config: &TargetConfig) -> Self {
        Self {
            timeout: config.timeout(),
            https_proxy: config.https_proxy.clone(),
        }
    }
}

/// Builds a reqwest client with optional proxy configuration and timeout.
/// Uses rustls TLS.
pub fn build_client(settings: &ClientSettings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(settings.timeout)
        .user_agent(USER_AGENT);
    if let Some(proxy) = &settings.https_proxy {
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| TargetError::configuration(format!("invalid https proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TargetError::configuration(format!("failed to build HTTP client: {e}")))
}

/// A pooled HTTP client posting JSON payloads.
///
/// Connections are bound to the tokio runtime that first uses them, so one
/// client must only ever be driven by a single runtime.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }

    /// Posts `body` as `application/json` and maps a non-success status to a
    /// delivery failure carrying the reason phrase.
    pub async fn post(&self, url: &str, body: String) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(url, "Failed to send webhook request: {e}");
                TargetError::Transport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(url, status = status.as_u16(), "Webhook accepted message");
            return Ok(());
        }

        let reason = reason_phrase(&response);
        error!(
            url,
            status = status.as_u16(),
            "Webhook rejected message: {reason}"
        );
        Err(TargetError::delivery(status.as_u16(), reason))
    }
}

/// Reason phrase of the status line. Servers sending a non-standard phrase get
/// it reported verbatim; otherwise the canonical phrase of the status is used.
pub fn reason_phrase(response: &Response) -> String {
    if let Some(reason) = response.extensions().get::<hyper::ext::ReasonPhrase>() {
        return String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }
    response
        .status()
        .canonical_reason()
        .unwrap_or_default()
        .to_string()
}
