// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Payload formatters and the registry they are discovered from.
//!
//! A formatter is selected by a (type name, location) pair taken from the
//! target configuration. The registry maps each pair to a factory taking no
//! arguments; the target calls it once, on the first dispatch, and shares the
//! resulting instance for the rest of its life.

pub mod adaptive_card;
pub mod message_card;

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

pub use adaptive_card::AdaptiveCard;
pub use message_card::DefaultCard;

use crate::error::{Result, TargetError};
use crate::event::{value_text, LogEvent, LogLevel};

/// Location under which the built-in formatters are registered.
pub const BUILTIN_LOCATION: &str = "teams-target";
/// Type name of the legacy connector `MessageCard` formatter (the default).
pub const DEFAULT_CARD: &str = "DefaultCard";
/// Type name of the Adaptive Card formatter.
pub const ADAPTIVE_CARD: &str = "AdaptiveCard";

/// Turns one log event into the wire payload posted to the webhook.
///
/// Implementations are shared by every dispatch of a target and may be called
/// concurrently, so they must not rely on per-call mutable state.
pub trait PayloadFormatter: Send + Sync {
    fn create_message(&self, event: &LogEvent, application_name: &str, environment: &str)
        -> String;
}

pub type FormatterFactory =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn PayloadFormatter>, String> + Send + Sync>;

/// Maps (type name, location) pairs to formatter factories.
#[derive(Clone)]
pub struct FormatterRegistry {
    factories: HashMap<(String, String), FormatterFactory>,
}

impl FormatterRegistry {
    /// A registry holding only the built-in formatters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_default::<DefaultCard>(DEFAULT_CARD, BUILTIN_LOCATION);
        registry.register_default::<AdaptiveCard>(ADAPTIVE_CARD, BUILTIN_LOCATION);
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory, replacing any previous one for the same pair.
    pub fn register<F>(&mut self, type_name: impl Into<String>, location: impl Into<String>, factory: F)
    where
        F: Fn() -> std::result::Result<Arc<dyn PayloadFormatter>, String> + Send + Sync + 'static,
    {
        self.factories
            .insert((type_name.into(), location.into()), Arc::new(factory));
    }

    /// Registers a formatter constructed through its `Default` implementation.
    pub fn register_default<T>(&mut self, type_name: impl Into<String>, location: impl Into<String>)
    where
        T: PayloadFormatter + Default + 'static,
    {
        self.register(type_name, location, || {
            Ok(Arc::new(T::default()) as Arc<dyn PayloadFormatter>)
        });
    }

    pub fn contains(&self, type_name: &str, location: &str) -> bool {
        self.factories
            .contains_key(&(type_name.to_string(), location.to_string()))
    }

    /// Instantiates the formatter registered for the pair.
    pub fn create(&self, type_name: &str, location: &str) -> Result<Arc<dyn PayloadFormatter>> {
        let factory = self
            .factories
            .get(&(type_name.to_string(), location.to_string()))
            .ok_or_else(|| {
                TargetError::configuration(format!(
                    "no payload formatter registered as '{type_name}' in '{location}'"
                ))
            })?;

        factory().map_err(|e| {
            TargetError::configuration(format!(
                "failed to create payload formatter '{type_name}' from '{location}': {e}"
            ))
        })
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .factories
            .keys()
            .map(|(type_name, location)| format!("{type_name}, {location}"))
            .collect();
        keys.sort();
        f.debug_struct("FormatterRegistry")
            .field("formatters", &keys)
            .finish()
    }
}

/// Hex colour used to tint cards by severity.
pub fn theme_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "CCCCCC",
        LogLevel::Debug => "808080",
        LogLevel::Info => "0078D7",
        LogLevel::Warn => "FFA500",
        LogLevel::Error => "D13438",
        LogLevel::Critical => "8B0000",
    }
}

/// Name/value pairs shown under the message by the built-in cards.
pub(crate) fn facts(event: &LogEvent, environment: &str) -> Vec<(String, String)> {
    let mut facts = vec![
        ("Level".to_string(), event.level.to_string()),
        ("Environment".to_string(), environment.to_string()),
        ("Logger".to_string(), event.logger_name.clone()),
    ];
    if let Some(exception) = &event.exception {
        facts.push(("Exception".to_string(), exception.clone()));
    }
    facts.extend(
        event
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value_text(value))),
    );
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Plain;

    impl PayloadFormatter for Plain {
        fn create_message(&self, event: &LogEvent, application_name: &str, _: &str) -> String {
            format!("{application_name}: {}", event.message)
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FormatterRegistry::new();
        assert!(registry.contains(DEFAULT_CARD, BUILTIN_LOCATION));
        assert!(registry.contains(ADAPTIVE_CARD, BUILTIN_LOCATION));
        assert!(!registry.contains(DEFAULT_CARD, "elsewhere"));
        assert!(!FormatterRegistry::empty().contains(DEFAULT_CARD, BUILTIN_LOCATION));
    }

    #[test]
    fn test_create_unknown_formatter_is_configuration_error() {
        let registry = FormatterRegistry::new();
        let err = registry.create("Missing", "nowhere").err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'Missing' in 'nowhere'"));
    }

    #[test]
    fn test_failing_factory_is_configuration_error() {
        let mut registry = FormatterRegistry::empty();
        registry.register("Broken", "plugins", || Err("missing template".to_string()));
        let err = registry.create("Broken", "plugins").err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("missing template"));
    }

    #[test]
    fn test_custom_factory_called_per_create() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = FormatterRegistry::empty();
        registry.register("Plain", "plugins", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Plain) as Arc<dyn PayloadFormatter>)
        });

        let formatter = registry.create("Plain", "plugins").unwrap();
        let event = LogEvent::new(LogLevel::Info, "tests", "hello");
        assert_eq!(formatter.create_message(&event, "Billing", "prod"), "Billing: hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_facts_order() {
        let event = LogEvent::new(LogLevel::Error, "billing", "disk full")
            .with_exception("io error")
            .with_property("b", 2)
            .with_property("a", "one");
        let names: Vec<String> = facts(&event, "prod").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Level", "Environment", "Logger", "Exception", "a", "b"]);
    }

    #[test]
    fn test_registry_debug_lists_formatters() {
        let debug_str = format!("{:?}", FormatterRegistry::new());
        assert!(debug_str.contains("AdaptiveCard, teams-target"));
        assert!(debug_str.contains("DefaultCard, teams-target"));
    }
}
