//! Deep equality used by change tracking.

use crate::value::Value;

/// Compare two values structurally.
///
/// Sequences compare element-wise, records field-by-field by name (a name
/// present on only one side makes them unequal), maps key-by-key. Everything
/// else, timestamps included, compares by value.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Record(x), Value::Record(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(name, xv)| y.get(name).is_some_and(|yv| deep_equal(xv, yv)))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, xv)| y.get(k).is_some_and(|yv| deep_equal(xv, yv)))
        }
        _ => a == b,
    }
}
