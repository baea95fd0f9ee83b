//! Per-binder record of modified fields.

use std::collections::BTreeMap;

use crate::value::Value;

/// Values of a field before and after its most recent tracked set.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Value before the set
    pub old: Value,
    /// Value after the set
    pub new: Value,
}

/// Field name to change. A field present here is dirty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: BTreeMap<&'static str, Change>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change, replacing any earlier entry for the field.
    pub fn record(&mut self, field: &'static str, old: Value, new: Value) {
        self.entries.insert(field, Change { old, new });
    }

    /// The change recorded for a field.
    pub fn get(&self, field: &str) -> Option<&Change> {
        self.entries.get(field)
    }

    /// True if the field has a recorded change.
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Drop the entry for a field.
    pub fn remove(&mut self, field: &str) -> Option<Change> {
        self.entries.remove(field)
    }

    /// True if no field is dirty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of dirty fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Dirty field names, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate over `(field, change)` pairs, sorted by field name.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Change)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_change_overwrites() {
        let mut changes = ChangeSet::new();
        changes.record("email", Value::from(""), Value::from("a@x"));
        changes.record("email", Value::from("a@x"), Value::from("b@x"));
        assert_eq!(changes.len(), 1);
        let change = changes.get("email").unwrap();
        assert_eq!(change.old, Value::from("a@x"));
        assert_eq!(change.new, Value::from("b@x"));
    }

    #[test]
    fn test_remove_clears_dirty() {
        let mut changes = ChangeSet::new();
        changes.record("age", Value::Int(0), Value::Int(5));
        assert!(changes.contains("age"));
        changes.remove("age");
        assert!(changes.is_empty());
    }
}
