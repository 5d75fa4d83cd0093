// File: src/store.rs
// Purpose: Observable attribute storage with dirty tracking against a snapshot

use crate::value::Value;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Field name → value
pub type Attributes = HashMap<String, Value>;

/// Options accepted by `set`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Suppress the `change` event
    pub silent: bool,
    /// Delete the attribute instead of writing it
    pub unset: bool,
}

impl SetOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            unset: false,
        }
    }

    pub fn unset() -> Self {
        Self {
            silent: false,
            unset: true,
        }
    }
}

/// Current attributes, the snapshot taken at the last `reset`, and the set of
/// attributes that differ from that snapshot.
///
/// "Changed" is always relative to the snapshot, so writing a field back to
/// its snapshot value removes it from the changed set again.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    current: Attributes,
    previous: Attributes,
    changed: Attributes,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single attribute.
    ///
    /// Returns true when the *current* value actually changed, which is the
    /// condition for emitting a `change` event. An empty key is a no-op.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>, options: SetOptions) -> bool {
        let key = key.into();
        if key.is_empty() {
            return false;
        }
        self.apply(key, value.into(), options)
    }

    /// Set a bag of attributes; returns true if any current value changed
    pub fn set_many<K, V, I>(&mut self, attrs: I, options: SetOptions) -> bool
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut has_changed = false;
        for (key, value) in attrs {
            let key = key.into();
            if key.is_empty() {
                continue;
            }
            has_changed |= self.apply(key, value.into(), options);
        }
        has_changed
    }

    fn apply(&mut self, key: String, value: Value, options: SetOptions) -> bool {
        let has_changed = self.current.get(&key) != Some(&value);

        if self.previous.get(&key) != Some(&value) {
            self.changed.insert(key.clone(), value.clone());
        } else {
            self.changed.remove(&key);
        }

        if options.unset {
            self.current.remove(&key);
        } else {
            self.current.insert(key, value);
        }

        has_changed
    }

    /// Current value of an attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    /// True if the attribute is present and not null
    pub fn has(&self, key: &str) -> bool {
        self.current.get(key).is_some_and(|v| !v.is_null())
    }

    /// All current attributes
    pub fn attributes(&self) -> &Attributes {
        &self.current
    }

    /// Attributes that differ from the snapshot, with their new values
    pub fn changed_attributes(&self) -> &Attributes {
        &self.changed
    }

    /// Whether `key` (or, with `None`, anything) differs from the snapshot
    pub fn has_changed(&self, key: Option<&str>) -> bool {
        match key {
            Some(key) => self.changed.contains_key(key),
            None => !self.changed.is_empty(),
        }
    }

    /// Snapshot value of an attribute
    pub fn previous(&self, key: &str) -> Option<&Value> {
        self.previous.get(key)
    }

    pub fn previous_attributes(&self) -> &Attributes {
        &self.previous
    }

    /// Take a new snapshot and clear the changed set
    pub fn reset(&mut self) {
        self.previous = self.current.clone();
        self.changed.clear();
    }

    /// Current attributes as a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.current
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}
