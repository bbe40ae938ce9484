// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The Teams delivery target.
//!
//! The owning pipeline creates the target, calls [`Target::initialize`] once,
//! then dispatches events through whichever entry point matches its own
//! scheduling model: [`Target::write`] blocks the calling thread until the
//! webhook answered, [`Target::write_async`] suspends instead and honours a
//! cancellation token. Both run the same render-and-send routine.
//!
//! Nothing here retries. A failed dispatch yields exactly one error and the
//! pipeline decides what happens to the event.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::runtime::Runtime;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::card::{FormatterRegistry, PayloadFormatter};
use crate::client::{ClientSettings, WebhookClient};
use crate::config::TargetConfig;
use crate::error::{Result, TargetError};
use crate::event::LogEvent;
use crate::variables::{resolve, ResolvedField, VariableSource};

/// Name the target is registered under in a pipeline.
pub const TARGET_NAME: &str = "MsTeams";

/// Inbound contract between a logging pipeline and a delivery target.
#[async_trait]
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    /// Prepares the target. Must complete before the first dispatch.
    fn initialize(&self, variables: &dyn VariableSource) -> Result<()>;

    /// Dispatches one event and blocks until the outcome is known.
    fn write(&self, event: &LogEvent) -> Result<()>;

    /// Dispatches one event. Cancelling `cancel` before the request is issued
    /// aborts the attempt with [`TargetError::Cancelled`]; a request already
    /// sent runs to completion and its outcome is returned.
    async fn write_async(&self, event: &LogEvent, cancel: CancellationToken) -> Result<()>;

    /// Marks the target as disposed. Later dispatches fail with
    /// [`TargetError::Closed`].
    fn close(&self);
}

#[derive(Debug)]
struct ResolvedFields {
    application_name: ResolvedField,
    environment: ResolvedField,
}

/// Runtime and client backing the blocking entry point.
struct BlockingSender {
    runtime: Option<Runtime>,
    client: WebhookClient,
}

impl BlockingSender {
    fn new(settings: &ClientSettings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("teams-target-blocking")
            .enable_all()
            .build()
            .map_err(|e| TargetError::Runtime(format!("failed to build blocking runtime: {e}")))?;

        Ok(Self {
            runtime: Some(runtime),
            client: WebhookClient::new(settings)?,
        })
    }

    fn block_on<F>(&self, task: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        match &self.runtime {
            Some(runtime) => runtime.block_on(task),
            None => Err(TargetError::Closed),
        }
    }
}

impl Drop for BlockingSender {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Posts log events to a Microsoft Teams incoming webhook.
pub struct TeamsTarget {
    config: TargetConfig,
    registry: Arc<FormatterRegistry>,
    fields: OnceLock<ResolvedFields>,
    formatter: OnceCell<Arc<dyn PayloadFormatter>>,
    async_client: OnceCell<WebhookClient>,
    blocking: OnceLock<BlockingSender>,
    closed: AtomicBool,
}

impl TeamsTarget {
    /// Creates a target using the built-in payload formatters.
    pub fn new(config: TargetConfig) -> Self {
        Self::with_registry(config, Arc::new(FormatterRegistry::new()))
    }

    /// Creates a target resolving its payload formatter from `registry`.
    ///
    /// The formatter is looked up on the first dispatch, not here, so a
    /// missing registration is reported by that dispatch.
    pub fn with_registry(config: TargetConfig, registry: Arc<FormatterRegistry>) -> Self {
        Self {
            config,
            registry,
            fields: OnceLock::new(),
            formatter: OnceCell::new(),
            async_client: OnceCell::new(),
            blocking: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.fields.get().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn resolve_field(
        &self,
        field: &str,
        raw: &str,
        variables: &dyn VariableSource,
    ) -> Result<ResolvedField> {
        let resolved = resolve(raw, variables);
        if let ResolvedField::Unresolved { name } = &resolved {
            if self.config.strict_variables {
                return Err(TargetError::configuration(format!(
                    "{field} references undefined variable '{name}'"
                )));
            }
            warn!(field, variable = %name, "Variable is not defined, {field} will render empty");
        }
        Ok(resolved)
    }

    fn ready(&self) -> Result<&ResolvedFields> {
        if self.is_closed() {
            return Err(TargetError::Closed);
        }
        self.fields.get().ok_or(TargetError::NotInitialized)
    }

    async fn formatter(&self) -> Result<&Arc<dyn PayloadFormatter>> {
        self.formatter
            .get_or_try_init(|| async {
                debug!(
                    formatter = %self.config.formatter_type,
                    location = %self.config.formatter_location,
                    "Creating payload formatter"
                );
                self.registry
                    .create(&self.config.formatter_type, &self.config.formatter_location)
            })
            .await
    }

    async fn async_client(&self) -> Result<&WebhookClient> {
        self.async_client
            .get_or_try_init(|| async { WebhookClient::new(&ClientSettings::from(&self.config)) })
            .await
    }

    fn blocking_sender(&self) -> Result<&BlockingSender> {
        if let Some(sender) = self.blocking.get() {
            return Ok(sender);
        }
        let sender = BlockingSender::new(&ClientSettings::from(&self.config))?;
        // A concurrent first call may have won the race; its sender is kept.
        Ok(self.blocking.get_or_init(|| sender))
    }

    /// Renders the payload for `event`.
    async fn create_message(&self, fields: &ResolvedFields, event: &LogEvent) -> Result<String> {
        let application_name = fields.application_name.render(event);
        let environment = fields.environment.render(event);
        let formatter = self.formatter().await?;

        let message = if self.config.include_event_properties {
            formatter.create_message(event, &application_name, &environment)
        } else {
            formatter.create_message(&event.without_properties(), &application_name, &environment)
        };
        Ok(message)
    }

    /// Renders `event` and posts it. `cancel` is honoured until the request
    /// is issued; after that the outcome of the request is returned.
    async fn render_and_send(
        &self,
        fields: &ResolvedFields,
        event: &LogEvent,
        client: &WebhookClient,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Dispatch cancelled before sending");
                return Err(TargetError::Cancelled);
            }
            message = self.create_message(fields, event) => message?,
        };
        client.post(&self.config.url, message).await
    }
}

#[async_trait]
impl Target for TeamsTarget {
    fn name(&self) -> &str {
        TARGET_NAME
    }

    fn initialize(&self, variables: &dyn VariableSource) -> Result<()> {
        if self.is_closed() {
            return Err(TargetError::Closed);
        }
        if self.is_initialized() {
            debug!("Target already initialized");
            return Ok(());
        }

        self.config.validate()?;
        let fields = ResolvedFields {
            application_name: self.resolve_field(
                "application_name",
                &self.config.application_name,
                variables,
            )?,
            environment: self.resolve_field("environment", &self.config.environment, variables)?,
        };
        debug!(?fields, "Target initialized");

        // Concurrent initialization keeps whichever resolution finished first.
        let _ = self.fields.set(fields);
        Ok(())
    }

    fn write(&self, event: &LogEvent) -> Result<()> {
        let fields = self.ready()?;
        let sender = self.blocking_sender()?;
        let never = CancellationToken::new();
        let task = self.render_and_send(fields, event, &sender.client, &never);

        if tokio::runtime::Handle::try_current().is_ok() {
            // A runtime cannot be blocked on from within another one, so the
            // private runtime is driven from a helper thread instead.
            std::thread::scope(|scope| scope.spawn(|| sender.block_on(task)).join())
                .unwrap_or_else(|_| {
                    Err(TargetError::Runtime(
                        "blocking dispatch thread panicked".to_string(),
                    ))
                })
        } else {
            sender.block_on(task)
        }
    }

    async fn write_async(&self, event: &LogEvent, cancel: CancellationToken) -> Result<()> {
        let fields = self.ready()?;
        if cancel.is_cancelled() {
            debug!("Dispatch cancelled before sending");
            return Err(TargetError::Cancelled);
        }
        let client = self.async_client().await?;
        self.render_and_send(fields, event, client, &cancel).await
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Target closed");
        }
    }
}

impl Debug for TeamsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeamsTarget")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish()
    }
}
