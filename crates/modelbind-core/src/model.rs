//! Model trait and lifecycle hooks.
//!
//! The `Model` trait is implemented by `#[derive(Model)]` and gives the
//! binder typed access to fields by name through the descriptor table.

use crate::binder::Binder;
use crate::error::{Result, ValidationErrors};
use crate::field::{FieldInfo, ModelInfo};
use crate::transaction::Transaction;
use crate::value::{Record, Value};

/// A typed record that can be bound from untyped input.
pub trait Model: Default + Sized + 'static {
    /// Persisted type name.
    const TABLE_NAME: &'static str;

    /// Descriptor table for this model.
    fn model_info() -> &'static ModelInfo;

    /// Field descriptors in declaration order.
    fn fields() -> &'static [FieldInfo] {
        Self::model_info().fields
    }

    /// Read a field by Rust name. `None` if no such field.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Write a field by Rust name.
    ///
    /// The value must already have the field's exact shape (see
    /// [`coerce`](crate::coerce::coerce)); anything else is a type mismatch.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// All field values as a record.
    fn to_record(&self) -> Record {
        let mut record = Record::with_capacity(Self::fields().len());
        for field in Self::fields() {
            if let Some(value) = self.get_field(field.name) {
                record.push(field.name, value);
            }
        }
        record
    }

    /// Build an instance from a record, starting from `Default`.
    fn from_record(record: Record) -> Option<Self> {
        let mut model = Self::default();
        for (name, value) in record {
            model.set_field(name, value).ok()?;
        }
        Some(model)
    }

    /// The identifier, if set.
    fn primary_key_value(&self) -> Option<String> {
        let pk = Self::model_info().primary_key()?;
        match self.get_field(pk.name)? {
            Value::Text(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}

/// Whether a save creates a new record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// The record had no identifier.
    Create,
    /// The record already had an identifier.
    Update,
}

impl SaveAction {
    /// Lowercase name, for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            SaveAction::Create => "create",
            SaveAction::Update => "update",
        }
    }
}

/// Lifecycle hooks invoked by the binder. All default to no-ops.
///
/// `#[derive(Model)]` emits an empty impl unless `#[binder(events)]` is given,
/// in which case the model implements this trait by hand.
#[allow(unused_variables)]
pub trait ModelEvents: Model {
    /// Called when a binder is created for a new record.
    fn on_binder_init(binder: &mut Binder<'_, Self>) {}

    /// Called before validation on save.
    fn pre_validate(
        binder: &mut Binder<'_, Self>,
        tx: &mut dyn Transaction,
        action: SaveAction,
    ) -> Result<()> {
        Ok(())
    }

    /// Collect validation problems. A non-empty result aborts the save.
    fn validate(
        binder: &mut Binder<'_, Self>,
        tx: &mut dyn Transaction,
        action: SaveAction,
    ) -> Result<ValidationErrors> {
        Ok(ValidationErrors::new())
    }

    /// Called after the record was persisted.
    fn after_save(
        binder: &mut Binder<'_, Self>,
        tx: &mut dyn Transaction,
        action: SaveAction,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after relation updates with the names of updated fields.
    fn after_save_relation(
        binder: &mut Binder<'_, Self>,
        tx: &mut dyn Transaction,
        updated: &[&'static str],
    ) -> Result<()> {
        Ok(())
    }

    /// Called before the record is deleted.
    fn before_destroy(binder: &mut Binder<'_, Self>, tx: &mut dyn Transaction) -> Result<()> {
        Ok(())
    }

    /// Called after the record was deleted.
    fn after_destroy(binder: &mut Binder<'_, Self>, tx: &mut dyn Transaction) -> Result<()> {
        Ok(())
    }
}

/// Record of a `Default` instance of `M`.
pub fn default_record<M: Model>() -> Record {
    M::default().to_record()
}

/// Iterate `(index, value, descriptor)` for every field of `model`.
pub fn for_each_field<M: Model>(
    model: &M,
) -> impl Iterator<Item = (usize, Value, &'static FieldInfo)> + '_ {
    M::fields()
        .iter()
        .enumerate()
        .filter_map(move |(i, field)| model.get_field(field.name).map(|v| (i, v, field)))
}

/// Find the field of `M` whose external key is `key`.
pub fn resolve<M: Model>(key: &str) -> Option<&'static FieldInfo> {
    M::model_info().resolve(key)
}
