//! Field descriptors and per-model descriptor tables.

use std::collections::BTreeMap;

use asupersync::Cx;

use crate::config::BinderConfig;
use crate::error::Result;
use crate::transaction::Transaction;
use crate::types::FieldType;
use crate::value::{Record, Value};

/// How a field relates to other models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedKind {
    /// Plain value.
    Scalar,
    /// One nested model (to-one relation).
    NestedRecord,
    /// A sequence of nested models (to-many relation).
    NestedRecordList,
}

/// Metadata about one model field.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// External key used by input documents and persistence.
    /// A field without a key never resolves from input.
    pub key: Option<&'static str>,
    /// Declared semantic type (of the inner type for optional fields)
    pub field_type: FieldType,
    /// Whether the field is `Option<T>`
    pub optional: bool,
    /// Whether this is the record identifier
    pub primary_key: bool,
    /// Descriptor table of the nested model, for relation fields
    pub nested: Option<fn() -> &'static ModelInfo>,
}

impl FieldInfo {
    /// Create a non-optional scalar field with no external key.
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            key: None,
            field_type,
            optional: false,
            primary_key: false,
            nested: None,
        }
    }

    /// Set the external key.
    pub const fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the optional flag.
    pub const fn optional(mut self, value: bool) -> Self {
        self.optional = value;
        self
    }

    /// Set the primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set the nested descriptor table from an optional.
    pub const fn nested_opt(mut self, nested: Option<fn() -> &'static ModelInfo>) -> Self {
        self.nested = nested;
        self
    }

    /// Classify the field as scalar or relation.
    pub fn nested_kind(&self) -> NestedKind {
        match (self.field_type, self.nested) {
            (FieldType::Record, Some(_)) => NestedKind::NestedRecord,
            (FieldType::RecordList, Some(_)) => NestedKind::NestedRecordList,
            _ => NestedKind::Scalar,
        }
    }

    /// True for to-one and to-many relation fields.
    pub fn is_nested(&self) -> bool {
        self.nested_kind() != NestedKind::Scalar
    }

    /// The nested model's descriptor table.
    pub fn nested_info(&self) -> Option<&'static ModelInfo> {
        self.nested.map(|f| f())
    }

    /// Zero value of the field: `Null` when optional, otherwise the zero of
    /// the declared type.
    pub fn zero_value(&self) -> Value {
        if self.optional {
            Value::Null
        } else {
            self.underlying_zero()
        }
    }

    /// Zero value of the declared type, ignoring optionality.
    pub fn underlying_zero(&self) -> Value {
        match self.field_type {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::BigInt => Value::BigInt(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Text => Value::Text(String::new()),
            FieldType::Uuid => Value::Uuid(uuid::Uuid::nil()),
            FieldType::Timestamp => Value::Timestamp(crate::time::zero_timestamp()),
            FieldType::TextList | FieldType::RecordList | FieldType::List => {
                Value::Array(Vec::new())
            }
            FieldType::Record => Value::Record(
                self.nested_info()
                    .map_or_else(Record::new, |info| (info.default_record)()),
            ),
        }
    }
}

/// Binds `values` into a fresh child of this model with every key permitted,
/// saves it and returns the assigned identifier.
pub type SaveChildFn =
    fn(&Cx, &mut dyn Transaction, &BinderConfig, &BTreeMap<String, Value>) -> Result<String>;

/// Hydrates a child of this model from a stored row and destroys it.
pub type DestroyChildFn =
    fn(&Cx, &mut dyn Transaction, &BinderConfig, &BTreeMap<String, Value>) -> Result<()>;

/// Descriptor table of one model type, generated once by `#[derive(Model)]`.
pub struct ModelInfo {
    /// Rust type name
    pub type_name: &'static str,
    /// Persisted type name, written as `_type` on save
    pub table_name: &'static str,
    /// Fields in declaration order
    pub fields: &'static [FieldInfo],
    /// Builds the record of a `Default` instance
    pub default_record: fn() -> Record,
    /// Creates an owned child of this model
    pub save_child: SaveChildFn,
    /// Destroys an owned child of this model
    pub destroy_child: DestroyChildFn,
}

impl ModelInfo {
    /// Find the field whose external key is `key`.
    pub fn resolve(&self, key: &str) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|f| f.key == Some(key))
    }

    /// Find a field by its Rust name.
    pub fn field(&self, name: &str) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The identifier field, if one is declared.
    pub fn primary_key(&self) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// External key of the identifier field.
    pub fn identifier_key(&self) -> Option<&'static str> {
        self.primary_key().and_then(|f| f.key)
    }
}

impl std::fmt::Debug for ModelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInfo")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
