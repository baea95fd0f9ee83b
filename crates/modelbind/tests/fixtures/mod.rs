//! Shared models and an in-memory transaction for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use modelbind::prelude::*;
use modelbind::{Assigned, FIRST_NEW_NODE, Selection};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Role {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Profile {
    pub uid: String,
    pub bio: String,
}

/// Relations held by element pointer and by optional list.
#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Team {
    pub uid: String,
    pub name: String,
    pub size: i32,
    pub members: Vec<Box<Role>>,
    pub owners: Option<Vec<Role>>,
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
#[binder(table = "user", events)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
    pub score: f64,
    pub active: bool,
    pub external_id: Uuid,
    pub tags: Vec<String>,
    pub roles: Vec<Role>,
    pub profile: Option<Profile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[binder(skip)]
    pub hook_log: Vec<String>,
    #[binder(skip)]
    pub new_in_after_save: Option<bool>,
}

impl ModelEvents for User {
    fn on_binder_init(binder: &mut Binder<'_, Self>) {
        binder.model_mut().active = true;
    }

    fn pre_validate(
        binder: &mut Binder<'_, Self>,
        _tx: &mut dyn Transaction,
        action: SaveAction,
    ) -> Result<()> {
        binder
            .model_mut()
            .hook_log
            .push(format!("pre_validate:{}", action.as_str()));
        Ok(())
    }

    fn validate(
        binder: &mut Binder<'_, Self>,
        _tx: &mut dyn Transaction,
        _action: SaveAction,
    ) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if binder.model().name.trim().is_empty() {
            errors.add_required("name");
        }
        if binder.model().age < 0 {
            errors.add("age", "must not be negative");
        }
        Ok(errors)
    }

    fn after_save(
        binder: &mut Binder<'_, Self>,
        _tx: &mut dyn Transaction,
        action: SaveAction,
    ) -> Result<()> {
        let is_new = binder.is_new();
        let model = binder.model_mut();
        model.new_in_after_save = Some(is_new);
        model.hook_log.push(format!("after_save:{}", action.as_str()));
        Ok(())
    }

    fn after_save_relation(
        binder: &mut Binder<'_, Self>,
        _tx: &mut dyn Transaction,
        updated: &[&'static str],
    ) -> Result<()> {
        binder
            .model_mut()
            .hook_log
            .push(format!("after_save_relation:{}", updated.join(",")));
        Ok(())
    }

    fn before_destroy(binder: &mut Binder<'_, Self>, _tx: &mut dyn Transaction) -> Result<()> {
        binder.model_mut().hook_log.push("before_destroy".into());
        Ok(())
    }

    fn after_destroy(binder: &mut Binder<'_, Self>, _tx: &mut dyn Transaction) -> Result<()> {
        binder.model_mut().hook_log.push("after_destroy".into());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Arguments)]
pub struct RoleInput {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Arguments)]
pub struct ProfileInput {
    pub id: Option<String>,
    pub bio: Option<String>,
    pub delete_: Option<bool>,
}

#[derive(Debug, Clone, Default, Arguments)]
pub struct UserInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub active: Option<bool>,
    pub roles: Option<Vec<RoleInput>>,
    pub profile: Option<ProfileInput>,
}

/// One collaborator call, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Query(String),
    Save(Row),
    Set(Vec<Edge>),
    DeleteField(String, String),
    Destroy(String),
    Commit,
    Discard,
}

/// A node store with edges. Identifiers are `0x1`, `0x2`, ...
#[derive(Debug, Default)]
pub struct MemoryTransaction {
    pub nodes: BTreeMap<String, Row>,
    pub edges: Vec<Edge>,
    pub ops: Vec<Op>,
    pub fail_saves: bool,
    next_id: u64,
}

impl MemoryTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stored node directly, bypassing the op log.
    pub fn insert(&mut self, fields: Row) -> String {
        self.next_id += 1;
        let id = format!("0x{:x}", self.next_id);
        self.nodes.insert(id.clone(), fields);
        id
    }

    /// Objects linked from `subject` through `predicate`, in insertion order.
    pub fn linked(&self, subject: &str, predicate: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.subject == subject && e.predicate == predicate)
            .map(|e| e.object.clone())
            .collect()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Destroy(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn saves(&self) -> Vec<Row> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Save(row) => Some(row.clone()),
                _ => None,
            })
            .collect()
    }

    fn node_row(&self, id: &str) -> Option<Row> {
        let mut row = self.nodes.get(id)?.clone();
        row.insert("uid".into(), Value::Text(id.to_string()));
        Some(row)
    }
}

impl Transaction for MemoryTransaction {
    /// Filtered queries match stored fields by equality and ignore the
    /// selection.
    fn query(&mut self, _cx: &Cx, query: &Query) -> Result<Vec<Row>> {
        self.ops.push(Op::Query(query.id.clone()));
        if query.is_filtered() {
            let rows: Vec<Row> = self
                .nodes
                .iter()
                .filter(|(_, node)| {
                    query
                        .conditions
                        .iter()
                        .all(|(key, value)| node.get(key) == Some(value))
                })
                .filter_map(|(id, _)| self.node_row(id))
                .collect();
            if rows.is_empty() {
                return Err(Error::NotFound("no matching record".into()));
            }
            return Ok(rows);
        }

        let node = self
            .node_row(&query.id)
            .ok_or_else(|| Error::NotFound(query.id.clone()))?;
        if query.selection.is_empty() {
            return Ok(vec![node]);
        }

        let mut row = Row::new();
        for Selection { key, expand } in &query.selection {
            if *expand {
                let children: Vec<Value> = self
                    .linked(&query.id, key)
                    .iter()
                    .filter_map(|child| self.node_row(child))
                    .map(Value::Map)
                    .collect();
                if !children.is_empty() {
                    row.insert(key.clone(), Value::Array(children));
                }
            } else if let Some(value) = node.get(key) {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(vec![row])
    }

    fn save(&mut self, _cx: &Cx, document: &Row) -> Result<Assigned> {
        self.ops.push(Op::Save(document.clone()));
        if self.fail_saves {
            return Err(Error::Transaction("save rejected".into()));
        }

        let mut fields = document.clone();
        let mut assigned = Assigned::default();
        match fields.remove("uid") {
            Some(Value::Text(id)) => {
                let node = self
                    .nodes
                    .get_mut(&id)
                    .ok_or_else(|| Error::NotFound(id.clone()))?;
                node.extend(fields);
            }
            _ => {
                let id = self.insert(fields);
                assigned.uids.insert(FIRST_NEW_NODE.to_string(), id);
            }
        }
        Ok(assigned)
    }

    fn mutate_set(&mut self, _cx: &Cx, edges: &[Edge]) -> Result<Assigned> {
        self.ops.push(Op::Set(edges.to_vec()));
        self.edges.extend_from_slice(edges);
        Ok(Assigned::default())
    }

    fn mutate_delete_field(
        &mut self,
        _cx: &Cx,
        id: &str,
        key: &str,
        value: Option<&Value>,
    ) -> Result<()> {
        self.ops.push(Op::DeleteField(id.to_string(), key.to_string()));
        let target = value.and_then(Value::as_str);
        self.edges.retain(|e| {
            !(e.subject == id && e.predicate == key && target.is_none_or(|t| e.object == t))
        });
        Ok(())
    }

    fn destroy(&mut self, _cx: &Cx, id: &str) -> Result<()> {
        self.ops.push(Op::Destroy(id.to_string()));
        self.nodes
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.edges.retain(|e| e.subject != id && e.object != id);
        Ok(())
    }

    fn commit(&mut self, _cx: &Cx) -> Result<()> {
        self.ops.push(Op::Commit);
        Ok(())
    }

    fn discard(&mut self, _cx: &Cx) -> Result<()> {
        self.ops.push(Op::Discard);
        Ok(())
    }
}

/// A persisted user with the given name.
pub fn saved_user(cx: &Cx, tx: &mut MemoryTransaction, name: &str) -> User {
    let mut user = User::default();
    let mut binder = Binder::new(cx, &mut user);
    binder.set("name", name, true).expect("name is text");
    binder.save(tx).expect("save succeeds");
    user
}
