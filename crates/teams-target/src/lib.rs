// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log target posting log events to Microsoft Teams incoming webhooks.
//!
//! The owning logging pipeline schedules, batches and retries. This crate
//! only turns one event into one webhook call:
//!
//! 1. **Initialize** - `${var:NAME}` references in the application name and
//!    environment are bound to the pipeline's variable table, once.
//! 2. **Render** - the bound fields are rendered against the event and the
//!    configured payload formatter builds the message.
//! 3. **Send** - the message is posted as JSON; a non-success status is
//!    reported back as [`TargetError::Delivery`].
//!
//! ```no_run
//! use teams_target::{LogEvent, LogLevel, Target, TargetConfig, TeamsTarget, Variables};
//!
//! # fn example() -> teams_target::Result<()> {
//! let config = TargetConfig::new("https://hook.example/x", "${var:app}", "prod");
//! let target = TeamsTarget::new(config);
//!
//! let mut variables = Variables::new();
//! variables.insert("app", "Billing");
//! target.initialize(&variables)?;
//!
//! target.write(&LogEvent::new(LogLevel::Error, "billing", "disk full"))?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod card;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod layout;
pub mod target;
pub mod variables;

pub use card::{AdaptiveCard, DefaultCard, FormatterRegistry, PayloadFormatter};
pub use config::TargetConfig;
pub use error::{Result, TargetError};
pub use event::{LogEvent, LogLevel};
pub use layout::Layout;
pub use target::{Target, TeamsTarget, TARGET_NAME};
pub use variables::{ResolvedField, VariableSource, Variables};
