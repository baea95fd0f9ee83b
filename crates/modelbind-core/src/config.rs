//! Binder configuration.

use serde::{Deserialize, Serialize};

/// Settings that apply to every binder created with them.
///
/// Deserializable so applications can embed it in their own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Log the full document sent to the persistence layer on save.
    pub debug_mutation: bool,
    /// Set creation and update timestamps on save.
    pub auto_timestamps: bool,
    /// Field name stamped on create.
    pub created_at_field: String,
    /// Field name stamped on every save.
    pub updated_at_field: String,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            debug_mutation: true,
            auto_timestamps: true,
            created_at_field: "created_at".to_string(),
            updated_at_field: "updated_at".to_string(),
        }
    }
}

impl BinderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable logging of persisted documents.
    pub fn debug_mutation(mut self, value: bool) -> Self {
        self.debug_mutation = value;
        self
    }

    /// Enable or disable automatic timestamps.
    pub fn auto_timestamps(mut self, value: bool) -> Self {
        self.auto_timestamps = value;
        self
    }

    /// Set the creation timestamp field name.
    pub fn created_at_field(mut self, name: impl Into<String>) -> Self {
        self.created_at_field = name.into();
        self
    }

    /// Set the update timestamp field name.
    pub fn updated_at_field(mut self, name: impl Into<String>) -> Self {
        self.updated_at_field = name.into();
        self
    }
}
