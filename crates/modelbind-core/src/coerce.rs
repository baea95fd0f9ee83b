//! Conversion of untyped input into the exact type a field requires.
//!
//! [`coerce`] is a pure function of (descriptor, current value, source). It
//! returns the value to store, which is the current value when the input
//! could not be parsed. Such parse failures are logged, never returned.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::field::{FieldInfo, ModelInfo};
use crate::time::{parse_timestamp, zero_timestamp};
use crate::types::FieldType;
use crate::value::{Record, Value};

/// Input that could not be parsed into the destination type.
///
/// The destination keeps its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// Destination field name
    pub field: &'static str,
    /// Declared type of the destination
    pub dest_type: FieldType,
    /// The offending input, rendered as text
    pub input: String,
    /// Short reason
    pub reason: &'static str,
}

impl ParseFailure {
    fn new(field: &FieldInfo, input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            field: field.name,
            dest_type: field.field_type,
            input: input.into(),
            reason,
        }
    }

    fn log(&self) {
        warn!(
            field = self.field,
            dest_type = %self.dest_type,
            input = %self.input,
            reason = self.reason,
            "unable to convert input, field left unchanged"
        );
    }
}

enum Coerced {
    Set(Value),
    Keep(ParseFailure),
}

/// Convert `source` into the value `field` should hold.
///
/// The identifier field only accepts its exact type. Null yields the zero
/// value (`Null` for optional fields). Otherwise identical types are
/// assigned as is and the cross-type table applies; optional fields coerce
/// as their inner type.
pub fn coerce(field: &FieldInfo, current: &Value, source: &Value) -> Result<Value> {
    if field.primary_key {
        return assign_identifier(field, source);
    }

    if source.is_null() {
        return Ok(field.zero_value());
    }

    match coerce_present(field, source)? {
        Coerced::Set(value) => Ok(value),
        Coerced::Keep(failure) => {
            failure.log();
            Ok(current.clone())
        }
    }
}

fn assign_identifier(field: &FieldInfo, source: &Value) -> Result<Value> {
    if source.is_null() {
        return Ok(field.zero_value());
    }
    if field.field_type.accepts(source) {
        Ok(source.clone())
    } else {
        Err(mismatch(field, source))
    }
}

fn mismatch(field: &FieldInfo, source: &Value) -> Error {
    Error::type_mismatch(field.name, source.type_name(), field.field_type.name())
}

fn coerce_present(field: &FieldInfo, source: &Value) -> Result<Coerced> {
    let dest = field.field_type;
    if dest.accepts(source) {
        return Ok(Coerced::Set(source.clone()));
    }

    let coerced = match (dest, source) {
        (FieldType::Uuid, Value::Text(s)) => text_to_uuid(field, s),
        (FieldType::Text, Value::Uuid(u)) => Coerced::Set(Value::Text(u.to_string())),
        (FieldType::Timestamp, Value::Text(s)) => text_to_timestamp(field, s),
        (_, Value::Int(_) | Value::BigInt(_) | Value::Float(_) | Value::Double(_))
            if dest.is_numeric() =>
        {
            convert_number(field, source)
        }
        (FieldType::Text, Value::Array(items))
            if items.iter().all(|v| matches!(v, Value::Text(_))) =>
        {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            Coerced::Set(Value::Text(format!("{{{}}}", parts.join(","))))
        }
        (FieldType::Text, Value::Array(_) | Value::Map(_) | Value::Record(_)) => {
            Coerced::Set(Value::Text(source.to_json().to_string()))
        }
        (_, Value::Text(s)) if dest.is_numeric() => text_to_number(field, s),
        (FieldType::Bool, Value::Text(s)) => text_to_bool(field, s),
        (FieldType::RecordList, Value::Array(items)) => {
            let info = field.nested_info().ok_or_else(|| mismatch(field, source))?;
            Coerced::Set(bind_record_list(field, info, items)?)
        }
        (FieldType::Record, Value::Array(items)) => {
            let info = field.nested_info().ok_or_else(|| mismatch(field, source))?;
            Coerced::Set(bind_first_record(field, info, items)?)
        }
        _ => return Err(mismatch(field, source)),
    };
    Ok(coerced)
}

fn text_to_uuid(field: &FieldInfo, s: &str) -> Coerced {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Coerced::Set(Value::Uuid(Uuid::nil()));
    }
    match Uuid::parse_str(trimmed) {
        Ok(u) => Coerced::Set(Value::Uuid(u)),
        Err(_) => Coerced::Keep(ParseFailure::new(field, s, "invalid uuid")),
    }
}

fn text_to_timestamp(field: &FieldInfo, s: &str) -> Coerced {
    if s.trim().is_empty() {
        return Coerced::Set(Value::Timestamp(zero_timestamp()));
    }
    match parse_timestamp(s) {
        Some(ts) => Coerced::Set(Value::Timestamp(ts)),
        None => Coerced::Keep(ParseFailure::new(field, s, "unrecognized timestamp")),
    }
}

fn text_to_number(field: &FieldInfo, s: &str) -> Coerced {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Coerced::Set(field.underlying_zero());
    }
    let parsed = match field.field_type {
        FieldType::Int => trimmed.parse::<i32>().ok().map(Value::Int),
        FieldType::BigInt => trimmed.parse::<i64>().ok().map(Value::BigInt),
        FieldType::Float => trimmed.parse::<f32>().ok().map(Value::Float),
        FieldType::Double => trimmed.parse::<f64>().ok().map(Value::Double),
        _ => None,
    };
    match parsed {
        Some(value) => Coerced::Set(value),
        None => Coerced::Keep(ParseFailure::new(field, s, "not a number")),
    }
}

fn text_to_bool(field: &FieldInfo, s: &str) -> Coerced {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Coerced::Set(Value::Bool(true)),
        "0" | "false" => Coerced::Set(Value::Bool(false)),
        _ => Coerced::Keep(ParseFailure::new(field, s, "not a boolean")),
    }
}

// Transport layers deliver integers as wide floats, so float to integer
// truncates toward zero. Out-of-range values are parse failures.
#[allow(clippy::cast_possible_truncation)]
fn convert_number(field: &FieldInfo, source: &Value) -> Coerced {
    let converted = match (field.field_type, source) {
        (FieldType::BigInt, Value::Int(v)) => Some(Value::BigInt(i64::from(*v))),
        (FieldType::Int, Value::BigInt(v)) => i32::try_from(*v).ok().map(Value::Int),
        (FieldType::Int, Value::Float(v)) => float_to_i64(f64::from(*v))
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int),
        (FieldType::Int, Value::Double(v)) => float_to_i64(*v)
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int),
        (FieldType::BigInt, Value::Float(v)) => float_to_i64(f64::from(*v)).map(Value::BigInt),
        (FieldType::BigInt, Value::Double(v)) => float_to_i64(*v).map(Value::BigInt),
        (FieldType::Double, Value::Float(v)) => Some(Value::Double(f64::from(*v))),
        (FieldType::Double, Value::Int(v)) => Some(Value::Double(f64::from(*v))),
        (FieldType::Double, Value::BigInt(v)) => Some(Value::Double(*v as f64)),
        (FieldType::Float, Value::Double(v)) => {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                None
            } else {
                Some(Value::Float(*v as f32))
            }
        }
        (FieldType::Float, Value::Int(v)) => Some(Value::Float(*v as f32)),
        (FieldType::Float, Value::BigInt(v)) => Some(Value::Float(*v as f32)),
        _ => None,
    };
    match converted {
        Some(value) => Coerced::Set(value),
        None => Coerced::Keep(ParseFailure::new(
            field,
            source.to_json().to_string(),
            "numeric value out of range",
        )),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(v: f64) -> Option<i64> {
    const LOWER: f64 = i64::MIN as f64;
    const UPPER: f64 = i64::MAX as f64;
    if !v.is_finite() {
        return None;
    }
    let t = v.trunc();
    if t < LOWER || t >= UPPER {
        return None;
    }
    Some(t as i64)
}

fn bind_record_list(field: &FieldInfo, info: &ModelInfo, items: &[Value]) -> Result<Value> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Map(entries) => records.push(Value::Record(bind_nested(info, entries)?)),
            Value::Record(record) => records.push(Value::Record(record.clone())),
            other => {
                return Err(Error::type_mismatch(field.name, other.type_name(), "map"));
            }
        }
    }
    Ok(Value::Array(records))
}

fn bind_first_record(field: &FieldInfo, info: &ModelInfo, items: &[Value]) -> Result<Value> {
    match items.first() {
        None => Ok(Value::Record((info.default_record)())),
        Some(Value::Map(entries)) => Ok(Value::Record(bind_nested(info, entries)?)),
        Some(Value::Record(record)) => Ok(Value::Record(record.clone())),
        Some(other) => Err(Error::type_mismatch(field.name, other.type_name(), "map")),
    }
}

/// Bind a keyed map into a fresh default record of the nested model.
fn bind_nested(info: &ModelInfo, entries: &BTreeMap<String, Value>) -> Result<Record> {
    let mut record = (info.default_record)();
    for (key, value) in entries {
        let Some(nested) = info.resolve(key) else {
            debug!(model = info.type_name, key = %key, "skipping unknown key in nested input");
            continue;
        };
        let current = record
            .get(nested.name)
            .cloned()
            .unwrap_or_else(|| nested.zero_value());
        let updated = coerce(nested, &current, value)?;
        record.set(nested.name, updated);
    }
    Ok(record)
}
