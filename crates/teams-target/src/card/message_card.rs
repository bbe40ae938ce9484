// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Office 365 connector `MessageCard`, the payload understood by classic Teams
//! incoming webhooks.

use chrono::SecondsFormat;
use serde_json::json;

use super::{facts, theme_color, PayloadFormatter};
use crate::event::LogEvent;

/// The default formatter.
///
/// Payload format:
/// {
///     "@type": "MessageCard",
///     "@context": "https://schema.org/extensions",
///     "themeColor": "D13438",
///     "summary": "Error: Billing",
///     "sections": [{
///         "activityTitle": "Billing",
///         "activitySubtitle": "prod | 2024-05-01T12:30:00.000Z",
///         "text": "disk full",
///         "facts": [{ "name": "Level", "value": "Error" }, ...]
///     }]
/// }
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCard;

impl PayloadFormatter for DefaultCard {
    fn create_message(
        &self,
        event: &LogEvent,
        application_name: &str,
        environment: &str,
    ) -> String {
        let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let facts: Vec<serde_json::Value> = facts(event, environment)
            .into_iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();

        json!({
            "@type": "MessageCard",
            "@context": "https://schema.org/extensions",
            "themeColor": theme_color(event.level),
            "summary": format!("{}: {}", event.level, application_name),
            "sections": [{
                "activityTitle": application_name,
                "activitySubtitle": format!("{environment} | {timestamp}"),
                "text": event.message,
                "facts": facts,
            }],
        })
        .to_string()
    }
}
