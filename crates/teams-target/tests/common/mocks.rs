// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock payload formatters

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use teams_target::{DefaultCard, FormatterRegistry, LogEvent, PayloadFormatter};

pub const RECORDING_CARD: &str = "RecordingCard";
pub const TEST_LOCATION: &str = "integration-tests";

/// Default card that keeps a copy of every payload it produced.
pub struct RecordingCard {
    payloads: Arc<Mutex<Vec<String>>>,
}

impl PayloadFormatter for RecordingCard {
    fn create_message(
        &self,
        event: &LogEvent,
        application_name: &str,
        environment: &str,
    ) -> String {
        let message = DefaultCard.create_message(event, application_name, environment);
        self.payloads.lock().unwrap().push(message.clone());
        message
    }
}

/// Registry with the built-ins plus a [`RecordingCard`] factory, and the
/// counters observing it.
pub struct RecordingRegistry {
    pub registry: Arc<FormatterRegistry>,
    pub instances: Arc<AtomicUsize>,
    pub payloads: Arc<Mutex<Vec<String>>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        let instances = Arc::new(AtomicUsize::new(0));
        let payloads = Arc::new(Mutex::new(Vec::new()));

        let mut registry = FormatterRegistry::new();
        let created = Arc::clone(&instances);
        let sink = Arc::clone(&payloads);
        registry.register(RECORDING_CARD, TEST_LOCATION, move || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(RecordingCard {
                payloads: Arc::clone(&sink),
            }) as Arc<dyn PayloadFormatter>)
        });

        Self {
            registry: Arc::new(registry),
            instances,
            payloads,
        }
    }

    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> serde_json::Value {
        let payloads = self.payloads.lock().unwrap();
        let last = payloads.last().expect("no payload recorded");
        serde_json::from_str(last).expect("payload is not JSON")
    }
}
