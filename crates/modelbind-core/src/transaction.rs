//! The persistence collaborator consumed by the binder.
//!
//! The binder never talks to a database directly. Saves, relation edges and
//! deletes go through a [`Transaction`], which owns wire formats, commit and
//! retry policy. Every call receives the operation's [`Cx`].

use std::collections::BTreeMap;

use asupersync::Cx;

use crate::error::Result;
use crate::value::Value;

/// A stored record as returned by a query, keyed by external key.
pub type Row = BTreeMap<String, Value>;

/// Key under which the collaborator reports the identifier of the first node
/// created by a save.
pub const FIRST_NEW_NODE: &str = "blank-0";

/// One relation edge `subject --predicate--> object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Identifier of the owning record
    pub subject: String,
    /// External key of the relation field
    pub predicate: String,
    /// Identifier of the related record
    pub object: String,
}

impl Edge {
    /// Create an edge.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Identifiers assigned by a mutation, keyed by blank node name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assigned {
    /// Blank node name to assigned identifier
    pub uids: BTreeMap<String, String>,
}

impl Assigned {
    /// Identifier of the first node created by the mutation.
    pub fn new_node(&self) -> Option<&str> {
        self.uids.get(FIRST_NEW_NODE).map(String::as_str)
    }
}

/// A field to fetch, optionally expanding a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// External key
    pub key: String,
    /// Expand the related records with all their scalar fields
    pub expand: bool,
}

/// Fetch one record by identifier, or the records whose fields equal a set
/// of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Identifier of the record; empty for a filtered query
    pub id: String,
    /// `(external key, value)` pairs every matching record holds
    pub conditions: Vec<(String, Value)>,
    /// Fields to return
    pub selection: Vec<Selection>,
}

impl Query {
    /// Query the record with identifier `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            selection: Vec::new(),
        }
    }

    /// Query the records whose `key` equals `value`.
    pub fn matching(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: String::new(),
            conditions: vec![(key.into(), value.into())],
            selection: Vec::new(),
        }
    }

    /// Add an equality condition.
    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    /// True when the query selects by field values rather than identifier.
    pub fn is_filtered(&self) -> bool {
        self.id.is_empty() && !self.conditions.is_empty()
    }

    /// Add a plain field to the selection.
    pub fn select(mut self, key: impl Into<String>) -> Self {
        self.selection.push(Selection {
            key: key.into(),
            expand: false,
        });
        self
    }

    /// Add a relation to the selection, expanded with all child fields.
    pub fn expand(mut self, key: impl Into<String>) -> Self {
        self.selection.push(Selection {
            key: key.into(),
            expand: true,
        });
        self
    }
}

/// Persistence operations the binder drives.
///
/// Implementations must return [`Error::NotFound`](crate::Error::NotFound)
/// from [`query`](Transaction::query) when the record does not exist so
/// callers can tell "absent" from "failed".
pub trait Transaction {
    /// Run a query and return the matching rows.
    fn query(&mut self, cx: &Cx, query: &Query) -> Result<Vec<Row>>;

    /// Persist a document of external key to value.
    fn save(&mut self, cx: &Cx, document: &Row) -> Result<Assigned>;

    /// Write relation edges.
    fn mutate_set(&mut self, cx: &Cx, edges: &[Edge]) -> Result<Assigned>;

    /// Remove `key` from the record `id`. `None` removes every value
    /// (wildcard). Removing an absent edge is not an error.
    fn mutate_delete_field(
        &mut self,
        cx: &Cx,
        id: &str,
        key: &str,
        value: Option<&Value>,
    ) -> Result<()>;

    /// Delete the record `id`.
    fn destroy(&mut self, cx: &Cx, id: &str) -> Result<()>;

    /// Commit all pending mutations.
    fn commit(&mut self, cx: &Cx) -> Result<()>;

    /// Abandon all pending mutations.
    fn discard(&mut self, cx: &Cx) -> Result<()>;
}
