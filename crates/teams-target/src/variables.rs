// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Variable table lookup and `${var:NAME}` resolution.
//!
//! Configuration values are resolved once, when the target is initialized,
//! against a snapshot of the variable table. The result is frozen: changes to
//! the table made afterwards are never observed by that target.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::event::LogEvent;
use crate::layout::Layout;

/// Read-only access to the pipeline's named configuration variables.
pub trait VariableSource {
    fn lookup(&self, name: &str) -> Option<Layout>;
}

impl VariableSource for HashMap<String, Layout> {
    fn lookup(&self, name: &str) -> Option<Layout> {
        self.get(name).cloned()
    }
}

/// A variable table owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    entries: HashMap<String, Layout>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `layout` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, layout: impl Into<Layout>) {
        self.entries.insert(name.into(), layout.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VariableSource for Variables {
    fn lookup(&self, name: &str) -> Option<Layout> {
        self.entries.get(name).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
    K: Into<String>,
    V: Into<Layout>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A configuration value fixed at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedField {
    /// Configured text without a `${var:NAME}` reference, used as-is.
    Literal(String),
    /// A value referencing `${var:NAME}`, bound to the layout registered
    /// under `name`. The whole field renders as that layout.
    Bound { name: String, layout: Layout },
    /// A value referencing a variable that did not exist when the target was
    /// initialized. Renders empty.
    Unresolved { name: String },
}

impl ResolvedField {
    pub fn render(&self, event: &LogEvent) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Bound { layout, .. } => layout.render(event),
            Self::Unresolved { .. } => String::new(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }
}

fn var_regex() -> &'static Regex {
    static VAR: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    VAR.get_or_init(|| Regex::new(r"\$\{var:([^}]+)\}").expect("valid variable reference regex"))
}

/// Returns the name of the first `${var:NAME}` reference found in `raw`.
pub fn variable_reference(raw: &str) -> Option<&str> {
    var_regex()
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Resolves a configuration value against the variable table.
///
/// A value containing a reference anywhere is replaced by the referenced
/// variable as a whole; text around the reference is not kept.
pub fn resolve(raw: &str, variables: &dyn VariableSource) -> ResolvedField {
    match variable_reference(raw) {
        None => ResolvedField::Literal(raw.to_string()),
        Some(name) => match variables.lookup(name) {
            Some(layout) => ResolvedField::Bound {
                name: name.to_string(),
                layout,
            },
            None => ResolvedField::Unresolved {
                name: name.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogLevel;
    use proptest::prelude::*;

    fn event(message: &str) -> LogEvent {
        LogEvent::new(LogLevel::Warn, "tests", message).with_property("region", "eu-west-1")
    }

    #[test]
    fn test_variable_reference_found_anywhere() {
        assert_eq!(variable_reference("${var:app}"), Some("app"));
        assert_eq!(variable_reference("${var:my app}"), Some("my app"));
        assert_eq!(variable_reference("prefix ${var:app}"), Some("app"));
        assert_eq!(variable_reference("${var:app} "), Some("app"));
        assert_eq!(variable_reference("${var:app}-${var:env}"), Some("app"));
        assert_eq!(variable_reference("Billing"), None);
        assert_eq!(variable_reference("${var:}"), None);
        assert_eq!(variable_reference("${event-properties:app}"), None);
    }

    #[test]
    fn test_embedded_reference_binds_whole_field() {
        let variables: Variables = [("app", "Billing")].into_iter().collect();
        let field = resolve("Team ${var:app}", &variables);
        assert!(matches!(&field, ResolvedField::Bound { name, .. } if name == "app"));
        assert_eq!(field.render(&event("x")), "Billing");
    }

    #[test]
    fn test_embedded_missing_reference_renders_empty() {
        let field = resolve("Team ${var:app} (eu)", &Variables::new());
        assert_eq!(field, ResolvedField::Unresolved { name: "app".to_string() });
        assert_eq!(field.render(&event("x")), "");
    }

    #[test]
    fn test_literal_passthrough() {
        let field = resolve("prod", &Variables::new());
        assert_eq!(field, ResolvedField::Literal("prod".to_string()));
        assert_eq!(field.render(&event("x")), "prod");
    }

    #[test]
    fn test_bound_static_variable() {
        let variables: Variables = [("app", "Billing")].into_iter().collect();
        let field = resolve("${var:app}", &variables);
        assert_eq!(field.render(&event("x")), "Billing");
    }

    #[test]
    fn test_bound_variable_renders_per_event() {
        let variables: Variables = [("app", "Billing (${event-properties:region}) ${message}")]
            .into_iter()
            .collect();
        let field = resolve("${var:app}", &variables);
        assert_eq!(field.render(&event("one")), "Billing (eu-west-1) one");
        assert_eq!(field.render(&event("two")), "Billing (eu-west-1) two");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let field = resolve("${var:app}", &Variables::new());
        assert!(field.is_unresolved());
        assert_eq!(field.render(&event("x")), "");
    }

    #[test]
    fn test_resolution_is_frozen() {
        let mut variables = Variables::new();
        variables.insert("env", "staging");
        let bound = resolve("${var:env}", &variables);
        let missing = resolve("${var:app}", &variables);

        variables.insert("env", "production");
        variables.insert("app", "Billing");

        assert_eq!(bound.render(&event("x")), "staging");
        assert_eq!(missing.render(&event("x")), "");
    }

    #[test]
    fn test_hashmap_source() {
        let mut map = HashMap::new();
        map.insert("app".to_string(), Layout::new("Billing"));
        assert_eq!(resolve("${var:app}", &map).render(&event("x")), "Billing");
    }

    proptest! {
        #[test]
        fn prop_non_references_render_literally(raw in "[^$]*", message in ".*") {
            let field = resolve(&raw, &Variables::new());
            prop_assert_eq!(field.render(&event(&message)), raw);
        }

        #[test]
        fn prop_absent_references_stay_empty(name in "[a-z][a-z0-9_]{0,12}", message in ".*") {
            let mut variables = Variables::new();
            let field = resolve(&format!("${{var:{name}}}"), &variables);
            variables.insert(name.clone(), "late");
            prop_assert_eq!(field.render(&event(&message)), "");
        }
    }
}
