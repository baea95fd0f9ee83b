//! Relation updates: to-one and to-many links between persisted records.
//!
//! For every permitted relation field present in the input, in input order:
//!
//! 1. inspect the input shape (single or list, linked or owned);
//! 2. for owned (`:nested`) relations, destroy the current children;
//! 3. clear the existing edges with a wildcard delete;
//! 4. rebuild: link by identifier, or create a child and link to it.
//!
//! The record must already be persisted. Any error aborts the update.

use std::collections::BTreeMap;

use asupersync::Cx;
use tracing::debug;

use crate::args::{ArgumentSet, DEFAULT_IDENTIFIER_KEY, PermitList, external_key};
use crate::binder::Binder;
use crate::config::BinderConfig;
use crate::error::{Error, Result};
use crate::field::{FieldInfo, ModelInfo, NestedKind};
use crate::model::ModelEvents;
use crate::transaction::{Edge, Query, Row, Transaction};
use crate::value::Value;

/// Argument field that, set to `true` on a nested single child, drops the
/// relation instead of creating a child.
pub const DELETE_MARKER: &str = "delete_";

/// Shape of one relation input after inspection.
enum Plan<'v> {
    /// Link to this identifier; empty leaves the relation unlinked.
    LinkOne(&'v str),
    /// Create an owned child from these values and link to it.
    CreateOne(&'v BTreeMap<String, Value>),
    /// Owned child marked for deletion: clear only.
    SkipDeleted,
    /// One entry per list element.
    Many(Vec<Element<'v>>),
}

enum Element<'v> {
    Link(&'v str),
    Create(&'v BTreeMap<String, Value>),
}

impl<M: ModelEvents> Binder<'_, M> {
    /// Rebuild the permitted relation fields present in `args`.
    ///
    /// Returns the names of the updated fields, which are also passed to
    /// `after_save_relation`. With `mark_changed`, the relation field of the
    /// bound record is updated to the linked identifiers and tracked.
    ///
    /// Afterwards each updated relation field holds identifier-only
    /// children: other child values bound from `args` are saved but not
    /// kept in memory. Re-query to read them back.
    #[tracing::instrument(level = "debug", skip_all, fields(model = M::TABLE_NAME))]
    pub fn update_relations<A: ArgumentSet + ?Sized>(
        &mut self,
        tx: &mut dyn Transaction,
        args: &A,
        permitted: &PermitList,
        mark_changed: bool,
    ) -> Result<Vec<&'static str>> {
        let info = M::model_info();
        let id = self.identifier().ok_or_else(|| {
            Error::RelationIntegrity(format!(
                "{} must be saved before updating relations",
                info.type_name
            ))
        })?;
        let identifier_key = info.identifier_key().unwrap_or(DEFAULT_IDENTIFIER_KEY);

        let mut updated = Vec::new();
        for (name, value) in args.arguments() {
            let Some(value) = value else {
                continue;
            };
            let key = external_key(&name, identifier_key);
            let Some(permit) = permitted.find(&key) else {
                continue;
            };
            let Some(field) = info.resolve(&key) else {
                debug!(model = info.type_name, key = %key, "ignoring missing relation");
                continue;
            };
            let Some(child) = field.nested_info() else {
                continue;
            };
            if field.nested_kind() == NestedKind::Scalar {
                continue;
            }

            debug!(model = info.type_name, id = %id, key = %key, nested = permit.nested, "updating relation");
            let plan = inspect(field, child, &value, permit.nested)?;
            let linked = self.rebuild(tx, &id, field, child, &plan, permit.nested)?;
            self.reflect_links(field, child, linked, mark_changed)?;
            updated.push(field.name);
        }

        if !updated.is_empty() {
            M::after_save_relation(self, tx, &updated)?;
        }
        Ok(updated)
    }

    fn rebuild(
        &self,
        tx: &mut dyn Transaction,
        id: &str,
        field: &FieldInfo,
        child: &'static ModelInfo,
        plan: &Plan<'_>,
        owned: bool,
    ) -> Result<Vec<String>> {
        let key = field.key.ok_or_else(|| {
            Error::Config(format!("relation `{}` has no external key", field.name))
        })?;
        let cx = self.cx();

        if owned {
            cascade_delete_owned(cx, tx, self.config(), id, key, child)?;
        }
        debug!(id = %id, key = %key, "clearing relation");
        tx.mutate_delete_field(cx, id, key, None)?;

        let mut linked = Vec::new();
        match plan {
            Plan::LinkOne(target) => {
                if !target.is_empty() {
                    linked.push((*target).to_string());
                }
            }
            Plan::SkipDeleted => {
                debug!(id = %id, key = %key, "child marked deleted, not inserting");
            }
            Plan::CreateOne(values) => {
                linked.push((child.save_child)(cx, tx, self.config(), values)?);
            }
            Plan::Many(elements) => {
                for element in elements {
                    match element {
                        Element::Link(target) => linked.push((*target).to_string()),
                        Element::Create(values) => {
                            linked.push((child.save_child)(cx, tx, self.config(), values)?);
                        }
                    }
                }
            }
        }

        if !linked.is_empty() {
            let edges: Vec<Edge> = linked
                .iter()
                .map(|object| Edge::new(id, key, object.as_str()))
                .collect();
            debug!(id = %id, key = %key, count = edges.len(), "linking relation");
            tx.mutate_set(cx, &edges)?;
        }
        Ok(linked)
    }

    /// Store the linked identifiers in the relation field.
    fn reflect_links(
        &mut self,
        field: &'static FieldInfo,
        child: &ModelInfo,
        linked: Vec<String>,
        mark_changed: bool,
    ) -> Result<()> {
        let child_key = child.identifier_key().unwrap_or(DEFAULT_IDENTIFIER_KEY);
        let stubs: Vec<Value> = linked
            .into_iter()
            .map(|id| {
                Value::Map(BTreeMap::from([(child_key.to_string(), Value::Text(id))]))
            })
            .collect();
        let value = if field.nested_kind() == NestedKind::NestedRecord && stubs.is_empty() {
            Value::Null
        } else {
            Value::Array(stubs)
        };
        self.apply(field, &value, mark_changed)
    }
}

fn inspect<'v>(
    field: &FieldInfo,
    child: &ModelInfo,
    value: &'v Value,
    owned: bool,
) -> Result<Plan<'v>> {
    let child_key = child.identifier_key().unwrap_or(DEFAULT_IDENTIFIER_KEY);
    match (field.nested_kind(), owned, value) {
        (NestedKind::NestedRecord, false, Value::Text(target)) => Ok(Plan::LinkOne(target)),
        (NestedKind::NestedRecord, false, other) => Err(Error::RelationIntegrity(format!(
            "`{}` expects an identifier string, received {}",
            field.name,
            other.type_name()
        ))),
        (NestedKind::NestedRecord, true, Value::Map(values)) => {
            if has_delete_marker(values) {
                Ok(Plan::SkipDeleted)
            } else {
                Ok(Plan::CreateOne(values))
            }
        }
        (NestedKind::NestedRecord, true, other) => Err(Error::RelationIntegrity(format!(
            "`{}` expects a child object, received {}",
            field.name,
            other.type_name()
        ))),
        (NestedKind::NestedRecordList, _, Value::Array(items)) => {
            let mut elements = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let Value::Map(values) = item else {
                    return Err(Error::RelationIntegrity(format!(
                        "`{}` element {} is {}, expected an object",
                        field.name,
                        index,
                        item.type_name()
                    )));
                };
                match element_identifier(values, child_key) {
                    Ok(Some(target)) if !target.is_empty() => elements.push(Element::Link(target)),
                    Ok(Some(_)) => elements.push(Element::Create(values)),
                    Ok(None) if owned => elements.push(Element::Create(values)),
                    Ok(None) => {
                        return Err(Error::RelationIntegrity(format!(
                            "`{}` element {} has no identifier",
                            field.name, index
                        )));
                    }
                    Err(type_name) => {
                        return Err(Error::RelationIntegrity(format!(
                            "`{}` element {} identifier is {}, expected a string",
                            field.name, index, type_name
                        )));
                    }
                }
            }
            Ok(Plan::Many(elements))
        }
        (NestedKind::NestedRecordList, _, other) => Err(Error::RelationIntegrity(format!(
            "`{}` expects a list, received {}",
            field.name,
            other.type_name()
        ))),
        (NestedKind::Scalar, _, _) => Err(Error::RelationIntegrity(format!(
            "`{}` is not a relation",
            field.name
        ))),
    }
}

/// The identifier carried by a relation element, under any name that
/// derives to the child's identifier key.
///
/// `Err` holds the type name of a non-text identifier.
fn element_identifier<'v>(
    values: &'v BTreeMap<String, Value>,
    identifier_key: &str,
) -> std::result::Result<Option<&'v str>, &'static str> {
    let found = values
        .iter()
        .find(|(name, _)| external_key(name, identifier_key) == identifier_key);
    match found {
        None | Some((_, Value::Null)) => Ok(None),
        Some((_, Value::Text(id))) => Ok(Some(id)),
        Some((_, other)) => Err(other.type_name()),
    }
}

fn has_delete_marker(values: &BTreeMap<String, Value>) -> bool {
    values
        .iter()
        .any(|(name, value)| name.eq_ignore_ascii_case(DELETE_MARKER) && value.as_bool() == Some(true))
}

/// Destroy the children currently linked through `key`.
fn cascade_delete_owned(
    cx: &Cx,
    tx: &mut dyn Transaction,
    config: &BinderConfig,
    id: &str,
    key: &str,
    child: &ModelInfo,
) -> Result<()> {
    let identifier_key = child.identifier_key().unwrap_or(DEFAULT_IDENTIFIER_KEY);
    let query = Query::by_id(id).select(identifier_key).expand(key);
    let rows = tx.query(cx, &query)?;

    let mut owned: Vec<Row> = Vec::new();
    for row in rows {
        match row.get(key) {
            Some(Value::Array(children)) => {
                owned.extend(children.iter().filter_map(|c| c.as_map().cloned()));
            }
            Some(Value::Map(single)) => owned.push(single.clone()),
            _ => {}
        }
    }

    for row in &owned {
        debug!(id = %id, key = %key, child = ?row.get(identifier_key), "destroying owned child");
        (child.destroy_child)(cx, tx, config, row)?;
    }
    Ok(())
}

/// Create a child `M` from argument values with every key permitted, save
/// it and return its identifier. Used as `ModelInfo::save_child`.
pub fn save_child<M: ModelEvents>(
    cx: &Cx,
    tx: &mut dyn Transaction,
    config: &BinderConfig,
    values: &BTreeMap<String, Value>,
) -> Result<String> {
    let mut model = M::default();
    let mut binder = Binder::with_config(cx, &mut model, config.clone());
    binder.bind_from_args(values, &PermitList::all(), true)?;
    binder.save(tx)?;
    binder.identifier().ok_or_else(|| {
        Error::Transaction(format!("child {} saved without identifier", M::TABLE_NAME))
    })
}

/// Hydrate a child `M` from a stored row and destroy it, running its
/// destroy hooks. Used as `ModelInfo::destroy_child`.
pub fn destroy_child<M: ModelEvents>(
    cx: &Cx,
    tx: &mut dyn Transaction,
    config: &BinderConfig,
    row: &BTreeMap<String, Value>,
) -> Result<()> {
    let mut model = M::default();
    let mut binder = Binder::with_config(cx, &mut model, config.clone());
    binder.bind(row, false)?;
    binder.destroy(tx)
}
