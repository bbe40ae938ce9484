// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Renderable templates registered in the variable table.
//!
//! A [`Layout`] is parsed once and rendered for every event. Supported tokens:
//!
//! * `${level}`, `${message}`, `${logger}`, `${exception}`
//! * `${longdate}`: event timestamp, RFC 3339 in UTC
//! * `${event-properties:item=NAME}` or `${event-properties:NAME}`
//! * `${environment:variable=NAME}` or `${environment:NAME}`: process
//!   environment variable, read at render time
//!
//! Anything else, unknown tokens included, is copied to the output verbatim.

use std::env;
use std::fmt;
use std::sync::OnceLock;

use chrono::SecondsFormat;
use regex::Regex;

use crate::event::LogEvent;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    TOKEN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z][A-Za-z0-9_-]*)(?::([^}]*))?\}").expect("valid layout token regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LayoutPart {
    Literal(String),
    Level,
    Message,
    Logger,
    LongDate,
    Exception,
    EventProperty(String),
    Environment(String),
}

/// A parsed template of literal text and per-event renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    source: String,
    parts: Vec<LayoutPart>,
}

impl Layout {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let parts = parse(&source);
        Self { source, parts }
    }

    /// The template text this layout was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when rendering does not depend on the event or the process environment.
    pub fn is_static(&self) -> bool {
        self.parts
            .iter()
            .all(|part| matches!(part, LayoutPart::Literal(_)))
    }

    pub fn render(&self, event: &LogEvent) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                LayoutPart::Literal(text) => out.push_str(text),
                LayoutPart::Level => out.push_str(event.level.as_str()),
                LayoutPart::Message => out.push_str(&event.message),
                LayoutPart::Logger => out.push_str(&event.logger_name),
                LayoutPart::LongDate => out.push_str(
                    &event
                        .timestamp
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
                LayoutPart::Exception => {
                    if let Some(exception) = &event.exception {
                        out.push_str(exception);
                    }
                }
                LayoutPart::EventProperty(name) => {
                    if let Some(value) = event.property_text(name) {
                        out.push_str(&value);
                    }
                }
                LayoutPart::Environment(name) => {
                    if let Ok(value) = env::var(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl From<&str> for Layout {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Layout {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse(source: &str) -> Vec<LayoutPart> {
    let mut parts = Vec::new();
    let mut last = 0;

    for captures in token_regex().captures_iter(source) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let name = captures.get(1).map_or("", |m| m.as_str());
        let arg = captures.get(2).map(|m| m.as_str());

        let part = match (name.to_ascii_lowercase().as_str(), arg) {
            ("level", None) => LayoutPart::Level,
            ("message", None) => LayoutPart::Message,
            ("logger", None) => LayoutPart::Logger,
            ("longdate", None) => LayoutPart::LongDate,
            ("exception", None) => LayoutPart::Exception,
            ("event-properties", Some(arg)) => {
                LayoutPart::EventProperty(named_arg(arg, "item").to_string())
            }
            ("environment", Some(arg)) => {
                LayoutPart::Environment(named_arg(arg, "variable").to_string())
            }
            _ => LayoutPart::Literal(whole.as_str().to_string()),
        };

        push_literal(&mut parts, &source[last..whole.start()]);
        match part {
            LayoutPart::Literal(text) => push_literal(&mut parts, &text),
            other => parts.push(other),
        }
        last = whole.end();
    }
    push_literal(&mut parts, &source[last..]);

    parts
}

/// Accepts both `key=value` and bare `value` argument spellings.
fn named_arg<'a>(arg: &'a str, key: &str) -> &'a str {
    let arg = arg.trim();
    arg.strip_prefix(key)
        .and_then(|rest| rest.trim_start().strip_prefix('='))
        .map_or(arg, str::trim)
}

fn push_literal(parts: &mut Vec<LayoutPart>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(LayoutPart::Literal(previous)) = parts.last_mut() {
        previous.push_str(text);
    } else {
        parts.push(LayoutPart::Literal(text.to_string()));
    }
}
