//! Declared field types and the conversions between Rust field types and `Value`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::field::ModelInfo;
use crate::value::Value;

/// Semantic type of a model field, as declared by its Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `bool`
    Bool,
    /// `i32`
    Int,
    /// `i64`
    BigInt,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `String`
    Text,
    /// `uuid::Uuid`
    Uuid,
    /// `chrono::DateTime<Utc>`
    Timestamp,
    /// `Vec<String>`
    TextList,
    /// A nested model.
    Record,
    /// `Vec<M>` where `M` is a nested model.
    RecordList,
    /// Any other sequence.
    List,
}

impl FieldType {
    /// The sequence type whose elements have type `element`.
    pub const fn list_of(element: FieldType) -> FieldType {
        match element {
            FieldType::Text => FieldType::TextList,
            FieldType::Record => FieldType::RecordList,
            _ => FieldType::List,
        }
    }

    /// Human readable name used in mismatch errors.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Text => "text",
            FieldType::Uuid => "uuid",
            FieldType::Timestamp => "timestamp",
            FieldType::TextList => "text list",
            FieldType::Record => "record",
            FieldType::RecordList => "record list",
            FieldType::List => "list",
        }
    }

    /// True if numeric.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::BigInt | FieldType::Float | FieldType::Double
        )
    }

    /// True if a value of this exact shape can be stored without conversion.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Bool, Value::Bool(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::BigInt, Value::BigInt(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Double, Value::Double(_))
            | (FieldType::Text, Value::Text(_))
            | (FieldType::Uuid, Value::Uuid(_))
            | (FieldType::Timestamp, Value::Timestamp(_))
            | (FieldType::Record, Value::Record(_))
            | (FieldType::List, Value::Array(_)) => true,
            (FieldType::TextList, Value::Array(items)) => {
                items.iter().all(|v| matches!(v, Value::Text(_)))
            }
            (FieldType::RecordList, Value::Array(items)) => {
                items.iter().all(|v| matches!(v, Value::Record(_)))
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Conversion of a field's Rust value into a `Value`.
pub trait ToValue {
    /// Produce the dynamic value.
    fn to_value(&self) -> Value;
}

/// A Rust type usable as a model field.
///
/// Implemented for the supported scalars, `Option<T>`, `Box<T>`, `Vec<T>` and
/// (through `#[derive(Model)]`) for every model so it can nest in another.
pub trait FieldValue: ToValue + Sized {
    /// Declared semantic type.
    const FIELD_TYPE: FieldType;
    /// True for `Option<T>`.
    const OPTIONAL: bool = false;
    /// Descriptor table of the nested model, for record and record-list fields.
    const NESTED: Option<fn() -> &'static ModelInfo> = None;

    /// Extract a typed value. `None` when the shape does not match.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_scalar_field {
    ($($ty:ty => $variant:ident / $ft:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }
            }

            impl FieldValue for $ty {
                const FIELD_TYPE: FieldType = FieldType::$ft;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar_field! {
    bool => Bool / Bool,
    i32 => Int / Int,
    i64 => BigInt / BigInt,
    f32 => Float / Float,
    f64 => Double / Double,
    String => Text / Text,
    Uuid => Uuid / Uuid,
    DateTime<Utc> => Timestamp / Timestamp,
}

impl<T: FieldValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const OPTIONAL: bool = true;
    const NESTED: Option<fn() -> &'static ModelInfo> = T::NESTED;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NESTED: Option<fn() -> &'static ModelInfo> = T::NESTED;

    fn from_value(value: Value) -> Option<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: FieldValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const FIELD_TYPE: FieldType = FieldType::list_of(T::FIELD_TYPE);
    const NESTED: Option<fn() -> &'static ModelInfo> = T::NESTED;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Extract a typed field value, reporting a mismatch against `field`.
///
/// Used by generated `Model::set_field` implementations.
pub fn field_from_value<T: FieldValue>(field: &str, value: Value) -> Result<T> {
    let source_type = value.type_name();
    T::from_value(value)
        .ok_or_else(|| Error::type_mismatch(field, source_type, T::FIELD_TYPE.name()))
}

/// A timestamp as delivered by a transport layer (for example a GraphQL
/// `Time` scalar). Unwrapped to `Value::Timestamp` on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransportTime(pub DateTime<Utc>);

impl TransportTime {
    /// The wrapped timestamp.
    pub const fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<TransportTime> for Value {
    fn from(t: TransportTime) -> Self {
        Value::Timestamp(t.0)
    }
}

impl ToValue for TransportTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.0)
    }
}
