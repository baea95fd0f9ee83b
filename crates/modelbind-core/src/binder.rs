//! The model binder: typed field access, coercion and change tracking for
//! one record during one logical operation.
//!
//! A `Binder` borrows the record mutably and is discarded after use. All
//! tracked writes go through [`Binder::set`], which coerces the input,
//! stores it and records `(old, new)` when the value actually changed.
//!
//! Argument binding lives in [`crate::args`] and relation updates in
//! [`crate::relations`]; both extend this type.

use std::collections::BTreeMap;

use asupersync::Cx;
use chrono::Utc;
use tracing::{debug, info};

use crate::changes::ChangeSet;
use crate::coerce::coerce;
use crate::config::BinderConfig;
use crate::equality::deep_equal;
use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::model::{ModelEvents, SaveAction, for_each_field};
use crate::transaction::{Row, Transaction};
use crate::value::Value;

/// Binds untyped input into a model and tracks what changed.
pub struct Binder<'a, M: ModelEvents> {
    model: &'a mut M,
    changes: ChangeSet,
    is_new: bool,
    cx: &'a Cx,
    config: BinderConfig,
}

impl<'a, M: ModelEvents> Binder<'a, M> {
    /// Create a binder with the default configuration.
    pub fn new(cx: &'a Cx, model: &'a mut M) -> Self {
        Self::with_config(cx, model, BinderConfig::default())
    }

    /// Create a binder. Runs `on_binder_init` when the record is new.
    ///
    /// Whether the record is new is decided here, from the identifier, and
    /// holds for the life of the binder.
    pub fn with_config(cx: &'a Cx, model: &'a mut M, config: BinderConfig) -> Self {
        let is_new = model.primary_key_value().is_none();
        let mut binder = Self {
            model,
            changes: ChangeSet::new(),
            is_new,
            cx,
            config,
        };
        if is_new {
            M::on_binder_init(&mut binder);
        }
        binder
    }

    /// Create a binder and bind `values` by external key, tracked.
    ///
    /// `on_binder_init` runs first, so the given values win over defaults it
    /// sets.
    pub fn with_values(
        cx: &'a Cx,
        model: &'a mut M,
        values: &BTreeMap<String, Value>,
    ) -> Result<Self> {
        let mut binder = Self::new(cx, model);
        binder.bind(values, true)?;
        Ok(binder)
    }

    /// The bound record.
    pub fn model(&self) -> &M {
        self.model
    }

    /// Mutable access to the bound record. Writes made here are not tracked.
    pub fn model_mut(&mut self) -> &mut M {
        self.model
    }

    /// The operation context.
    pub fn cx(&self) -> &'a Cx {
        self.cx
    }

    /// The binder configuration.
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Descriptor of a field by Rust name.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn field_info(&self, name: &str) -> &'static FieldInfo {
        let info = M::model_info();
        info.field(name)
            .unwrap_or_else(|| panic!("unknown field {}:{}", info.type_name, name))
    }

    /// Current value of a field by Rust name.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn get(&self, name: &str) -> Value {
        let field = self.field_info(name);
        self.read(field)
    }

    fn read(&self, field: &FieldInfo) -> Value {
        self.model
            .get_field(field.name)
            .unwrap_or_else(|| field.zero_value())
    }

    /// Coerce `value` into the field and store it. With `mark_changed` the
    /// change is recorded when old and new differ.
    ///
    /// The identifier is assigned only by hydration and save; setting it
    /// here is ignored.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>, mark_changed: bool) -> Result<()> {
        let field = self.field_info(name);
        if field.primary_key {
            debug!(model = M::TABLE_NAME, field = name, "identifier is not settable");
            return Ok(());
        }
        self.apply(field, &value.into(), mark_changed)
    }

    /// Set several fields by Rust name.
    pub fn set_many<K, I>(&mut self, values: I, mark_changed: bool) -> Result<()>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value, mark_changed)?;
        }
        Ok(())
    }

    pub(crate) fn apply(
        &mut self,
        field: &'static FieldInfo,
        source: &Value,
        mark_changed: bool,
    ) -> Result<()> {
        let old = self.read(field);
        let coerced = coerce(field, &old, source)?;
        self.model.set_field(field.name, coerced)?;
        if !mark_changed {
            return Ok(());
        }

        let new = self.read(field);
        // nil to nil and equal present values compare equal here
        if !deep_equal(&old, &new) {
            self.changes.record(field.name, old, new);
        }
        Ok(())
    }

    /// Bind a map keyed by external key.
    ///
    /// Unknown keys are skipped. The identifier is assigned directly when
    /// hydrating (`mark_changed == false`) and skipped otherwise.
    pub fn bind(&mut self, values: &BTreeMap<String, Value>, mark_changed: bool) -> Result<()> {
        let info = M::model_info();
        for (key, value) in values {
            let Some(field) = info.resolve(key) else {
                debug!(model = info.type_name, key = %key, "ignoring unknown key");
                continue;
            };
            if field.primary_key {
                if mark_changed {
                    debug!(model = info.type_name, key = %key, "identifier is not bindable");
                } else {
                    self.assign_identifier(value)?;
                }
                continue;
            }
            self.apply(field, value, mark_changed)?;
        }
        Ok(())
    }

    /// Bind a JSON object keyed by external key.
    pub fn bind_json(&mut self, values: &serde_json::Value, mark_changed: bool) -> Result<()> {
        match Value::from(values.clone()) {
            Value::Map(map) => self.bind(&map, mark_changed),
            other => Err(Error::type_mismatch(
                M::model_info().type_name,
                other.type_name(),
                "map",
            )),
        }
    }

    pub(crate) fn assign_identifier(&mut self, id: &Value) -> Result<()> {
        let info = M::model_info();
        let pk = info
            .primary_key()
            .ok_or_else(|| Error::Config(format!("{} has no identifier field", info.type_name)))?;
        let value = coerce(pk, &self.read(pk), id)?;
        self.model.set_field(pk.name, value)
    }

    /// Replace the record with a stored row, then re-apply the tracked
    /// changes on top of it. The binder no longer treats the record as new.
    pub(crate) fn reload(&mut self, row: &Row) -> Result<()> {
        let pending: Vec<(&'static str, Value)> = self
            .changes
            .iter()
            .map(|(name, change)| (name, change.new.clone()))
            .collect();

        *self.model = M::default();
        self.changes = ChangeSet::new();
        self.bind(row, false)?;
        for (name, value) in pending {
            let field = self.field_info(name);
            self.apply(field, &value, true)?;
        }
        self.is_new = false;
        Ok(())
    }

    /// True if the field has a recorded change.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn changed(&self, name: &str) -> bool {
        let field = self.field_info(name);
        self.changes.contains(field.name)
    }

    /// True if any field has a recorded change.
    pub fn dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Forget the recorded change of a field.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn reset_change(&mut self, name: &str) {
        let field = self.field_info(name);
        self.changes.remove(field.name);
    }

    /// Value before the most recent tracked change, or the field's zero
    /// value when unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the model has no such field.
    pub fn old_value(&self, name: &str) -> Value {
        let field = self.field_info(name);
        self.changes
            .get(field.name)
            .map_or_else(|| field.zero_value(), |change| change.old.clone())
    }

    /// All recorded changes.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// True if the record had no identifier when the binder was created.
    ///
    /// Stays true after a save assigns one.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The record identifier, if set.
    pub fn identifier(&self) -> Option<String> {
        self.model.primary_key_value()
    }

    /// Zero every relation field and drop its recorded change.
    pub fn reset_relations(&mut self) -> Result<()> {
        for field in M::fields().iter().filter(|f| f.is_nested()) {
            self.model.set_field(field.name, field.zero_value())?;
            self.changes.remove(field.name);
        }
        Ok(())
    }

    /// Persist the scalar fields of the record.
    ///
    /// Stamps timestamps, runs `pre_validate` and `validate`, saves the
    /// document and assigns the new identifier on create, then runs
    /// `after_save`.
    #[tracing::instrument(level = "debug", skip(self, tx), fields(model = M::TABLE_NAME))]
    pub fn save(&mut self, tx: &mut dyn Transaction) -> Result<SaveAction> {
        let action = if self.identifier().is_some() {
            SaveAction::Update
        } else {
            SaveAction::Create
        };

        if self.config.auto_timestamps {
            self.stamp_timestamps(action)?;
        }

        M::pre_validate(self, tx, action)?;
        M::validate(self, tx, action)?.into_result()?;

        let document = self.persisted_document()?;
        if self.config.debug_mutation {
            debug!(document = %crate::value::Value::Map(document.clone()).to_json(), "saving document");
        }

        let assigned = tx.save(self.cx, &document)?;
        if action == SaveAction::Create {
            let id = assigned.new_node().ok_or_else(|| {
                Error::Transaction(format!("save of {} assigned no identifier", M::TABLE_NAME))
            })?;
            self.assign_identifier(&Value::Text(id.to_string()))?;
        }

        info!(
            model = M::TABLE_NAME,
            action = action.as_str(),
            id = ?self.identifier(),
            "saved record"
        );

        M::after_save(self, tx, action)?;
        Ok(action)
    }

    fn stamp_timestamps(&mut self, action: SaveAction) -> Result<()> {
        let info = M::model_info();
        let now = Value::Timestamp(Utc::now());
        if let Some(field) = info.field(&self.config.updated_at_field) {
            self.apply(field, &now, true)?;
        }
        if action == SaveAction::Create {
            if let Some(field) = info.field(&self.config.created_at_field) {
                self.apply(field, &now, true)?;
            }
        }
        Ok(())
    }

    /// Document of scalar fields by external key, plus `_type` and, for
    /// persisted records, the identifier.
    fn persisted_document(&self) -> Result<Row> {
        let info = M::model_info();
        let mut document = Row::new();
        for (_, value, field) in for_each_field(&*self.model) {
            if field.primary_key || field.is_nested() {
                continue;
            }
            let key = field.key.ok_or_else(|| {
                Error::Config(format!(
                    "field `{}` of {} has no external key",
                    field.name, info.type_name
                ))
            })?;
            document.insert(key.to_string(), value);
        }
        if document.is_empty() {
            return Err(Error::Config(format!("nothing to save for {}", info.type_name)));
        }

        document.insert("_type".to_string(), Value::from(M::TABLE_NAME));
        if let Some(id) = self.identifier() {
            let key = info.identifier_key().ok_or_else(|| {
                Error::Config(format!("identifier of {} has no external key", info.type_name))
            })?;
            document.insert(key.to_string(), Value::Text(id));
        }
        Ok(document)
    }

    /// Delete the record through the collaborator, running the destroy
    /// hooks around it.
    #[tracing::instrument(level = "debug", skip(self, tx), fields(model = M::TABLE_NAME))]
    pub fn destroy(&mut self, tx: &mut dyn Transaction) -> Result<()> {
        let id = self
            .identifier()
            .ok_or_else(|| Error::NotFound(format!("{} without identifier", M::TABLE_NAME)))?;
        M::before_destroy(self, tx)?;
        tx.destroy(self.cx, &id)?;
        info!(model = M::TABLE_NAME, id = %id, "destroyed record");
        M::after_destroy(self, tx)?;
        Ok(())
    }
}

impl<M: ModelEvents + std::fmt::Debug> std::fmt::Debug for Binder<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("model", &self.model)
            .field("changes", &self.changes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
