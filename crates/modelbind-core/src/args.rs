//! Permission-filtered binding from argument objects.
//!
//! Argument objects (GraphQL inputs and the like) name their fields in the
//! caller's convention. Each provided field is mapped to an external key,
//! checked against a permission list and then bound through the model
//! binder. Everything that does not line up is skipped with a debug log.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::debug;

use crate::binder::Binder;
use crate::error::Result;
use crate::model::ModelEvents;
use crate::value::Value;

/// External key assumed for the identifier when a model declares none.
pub const DEFAULT_IDENTIFIER_KEY: &str = "uid";

const NESTED_SUFFIX: &str = ":nested";
const WILDCARD: &str = "*";

/// An argument object: named fields in declaration order, `None` for
/// fields the caller did not provide.
pub trait ArgumentSet {
    /// The argument fields.
    fn arguments(&self) -> Vec<(Cow<'_, str>, Option<Value>)>;
}

impl ArgumentSet for BTreeMap<String, Value> {
    fn arguments(&self) -> Vec<(Cow<'_, str>, Option<Value>)> {
        self.iter()
            .map(|(k, v)| (Cow::Borrowed(k.as_str()), Some(v.clone())))
            .collect()
    }
}

/// A dynamically built argument object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Option<Value>)>,
}

impl Arguments {
    /// Create an empty argument object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provided field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), Some(value.into())));
        self
    }

    /// Add a field the caller left out.
    pub fn without(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), None));
        self
    }
}

impl ArgumentSet for Arguments {
    fn arguments(&self) -> Vec<(Cow<'_, str>, Option<Value>)> {
        self.entries
            .iter()
            .map(|(k, v)| (Cow::Borrowed(k.as_str()), v.clone()))
            .collect()
    }
}

/// Derive the external key for an argument field name.
///
/// The first character is lower-cased, `id` in any case maps to the
/// identifier's key and a trailing `_id` is stripped (`role_id` binds `role`).
pub fn external_key(name: &str, identifier_key: &str) -> String {
    let mut chars = name.chars();
    let lowered: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };

    if lowered.eq_ignore_ascii_case("id") {
        return identifier_key.to_string();
    }
    match lowered.strip_suffix("_id") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lowered,
    }
}

/// One permission entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    /// External key, or `*`
    pub key: String,
    /// Children of this relation are owned: created and destroyed with it
    pub nested: bool,
}

impl Permit {
    /// Parse `key` or `key:nested`.
    pub fn parse(entry: &str) -> Self {
        match entry.strip_suffix(NESTED_SUFFIX) {
            Some(key) => Self {
                key: key.to_string(),
                nested: true,
            },
            None => Self {
                key: entry.to_string(),
                nested: false,
            },
        }
    }

    /// True for the wildcard entry.
    pub fn is_wildcard(&self) -> bool {
        self.key == WILDCARD
    }
}

/// Ordered allow-list of external keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitList {
    entries: Vec<Permit>,
}

impl PermitList {
    /// Parse a list of entries such as `["name", "roles:nested"]`.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| Permit::parse(e.as_ref()))
                .collect(),
        }
    }

    /// Permit everything.
    pub fn all() -> Self {
        Self::parse([WILDCARD])
    }

    /// The entry that admits `key`. An exact entry wins over the wildcard.
    pub fn find(&self, key: &str) -> Option<&Permit> {
        self.entries
            .iter()
            .find(|p| p.key == key)
            .or_else(|| self.entries.iter().find(|p| p.is_wildcard()))
    }

    /// True if `key` is admitted.
    pub fn permits(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// True if `key` is admitted as an owned relation.
    pub fn is_nested(&self, key: &str) -> bool {
        self.find(key).is_some_and(|p| p.nested)
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &Permit> {
        self.entries.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PermitList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::parse(iter)
    }
}

impl<M: ModelEvents> Binder<'_, M> {
    /// Bind the provided, permitted fields of an argument object.
    ///
    /// Identifier arguments, and identifier strings or single child objects
    /// aimed at relation fields, are left to
    /// [`update_relations`](Binder::update_relations).
    pub fn bind_from_args<A: ArgumentSet + ?Sized>(
        &mut self,
        args: &A,
        permitted: &PermitList,
        mark_changed: bool,
    ) -> Result<()> {
        let info = M::model_info();
        let identifier_key = info.identifier_key().unwrap_or(DEFAULT_IDENTIFIER_KEY);

        for (name, value) in args.arguments() {
            let Some(value) = value else {
                continue;
            };
            let key = external_key(&name, identifier_key);
            if !permitted.permits(&key) {
                debug!(model = info.type_name, key = %key, "argument not permitted");
                continue;
            }
            let Some(field) = info.resolve(&key) else {
                debug!(model = info.type_name, key = %key, "no field for argument");
                continue;
            };
            if field.primary_key {
                debug!(model = info.type_name, key = %key, "identifier is not bindable");
                continue;
            }
            if field.is_nested() && matches!(value, Value::Text(_) | Value::Map(_)) {
                debug!(model = info.type_name, key = %key, "relation input left to relation update");
                continue;
            }
            self.apply(field, &value, mark_changed)?;
        }
        Ok(())
    }
}
