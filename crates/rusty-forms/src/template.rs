// File: src/template.rs
// Purpose: {{placeholder}} interpolation for validator error messages

use crate::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("placeholder regex"));

/// Named values substituted into a message template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageParams {
    values: HashMap<String, String>,
}

impl MessageParams {
    /// Params holding only the field label
    pub fn labelled(label: &str) -> Self {
        Self::default().with("label", label)
    }

    /// Add (or replace) a parameter
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Layer extra context underneath: existing keys win
    pub fn with_context(mut self, context: &HashMap<String, Value>) -> Self {
        for (key, value) in context {
            self.values
                .entry(key.clone())
                .or_insert_with(|| value.to_string());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Render `template`, replacing `{{name}}` with the matching param.
///
/// Placeholders without a matching param are left untouched.
pub fn render(template: &str, params: &MessageParams) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
