// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Adaptive Card payload for Teams Workflows webhooks.

use chrono::SecondsFormat;
use serde_json::json;

use super::{facts, PayloadFormatter};
use crate::event::{LogEvent, LogLevel};

const CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const VERSION: &str = "1.4";

/// Formats events as a `message` carrying a single Adaptive Card attachment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveCard;

/// Adaptive Cards only know a handful of named text colours.
fn text_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace | LogLevel::Debug => "Default",
        LogLevel::Info => "Accent",
        LogLevel::Warn => "Warning",
        LogLevel::Error | LogLevel::Critical => "Attention",
    }
}

impl PayloadFormatter for AdaptiveCard {
    fn create_message(
        &self,
        event: &LogEvent,
        application_name: &str,
        environment: &str,
    ) -> String {
        let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let facts: Vec<serde_json::Value> = facts(event, environment)
            .into_iter()
            .map(|(title, value)| json!({ "title": title, "value": value }))
            .collect();

        json!({
            "type": "message",
            "attachments": [{
                "contentType": CONTENT_TYPE,
                "contentUrl": null,
                "content": {
                    "$schema": SCHEMA,
                    "type": "AdaptiveCard",
                    "version": VERSION,
                    "body": [
                        {
                            "type": "TextBlock",
                            "text": application_name,
                            "size": "Large",
                            "weight": "Bolder",
                            "color": text_color(event.level),
                        },
                        {
                            "type": "TextBlock",
                            "text": format!("{environment} | {timestamp}"),
                            "isSubtle": true,
                            "spacing": "None",
                        },
                        {
                            "type": "TextBlock",
                            "text": event.message,
                            "wrap": true,
                        },
                        {
                            "type": "FactSet",
                            "facts": facts,
                        },
                    ],
                },
            }],
        })
        .to_string()
    }
}
