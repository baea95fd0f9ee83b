//! Hand-written model and transaction for unit tests, shaped like the code
//! `#[derive(Model)]` generates.

use std::collections::BTreeMap;

use asupersync::Cx;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::field::{FieldInfo, ModelInfo};
use crate::model::{Model, ModelEvents, default_record};
use crate::relations::{destroy_child, save_child};
use crate::transaction::{Assigned, Edge, FIRST_NEW_NODE, Query, Row, Transaction};
use crate::types::{FieldValue, ToValue, field_from_value};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Note {
    pub uid: String,
    pub title: String,
    pub summary: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Note {
    const TABLE_NAME: &'static str = "note";

    fn model_info() -> &'static ModelInfo {
        static FIELDS: [FieldInfo; 6] = [
            FieldInfo::new("uid", <String as FieldValue>::FIELD_TYPE)
                .key("uid")
                .primary_key(true),
            FieldInfo::new("title", <String as FieldValue>::FIELD_TYPE).key("title"),
            FieldInfo::new("summary", <Option<String> as FieldValue>::FIELD_TYPE)
                .key("summary")
                .optional(true),
            FieldInfo::new("views", <i64 as FieldValue>::FIELD_TYPE).key("views"),
            FieldInfo::new("created_at", <DateTime<Utc> as FieldValue>::FIELD_TYPE)
                .key("created_at"),
            FieldInfo::new("updated_at", <DateTime<Utc> as FieldValue>::FIELD_TYPE)
                .key("updated_at"),
        ];
        static INFO: ModelInfo = ModelInfo {
            type_name: "Note",
            table_name: "note",
            fields: &FIELDS,
            default_record: default_record::<Note>,
            save_child: save_child::<Note>,
            destroy_child: destroy_child::<Note>,
        };
        &INFO
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "uid" => Some(self.uid.to_value()),
            "title" => Some(self.title.to_value()),
            "summary" => Some(self.summary.to_value()),
            "views" => Some(self.views.to_value()),
            "created_at" => Some(self.created_at.to_value()),
            "updated_at" => Some(self.updated_at.to_value()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "uid" => self.uid = field_from_value(name, value)?,
            "title" => self.title = field_from_value(name, value)?,
            "summary" => self.summary = field_from_value(name, value)?,
            "views" => self.views = field_from_value(name, value)?,
            "created_at" => self.created_at = field_from_value(name, value)?,
            "updated_at" => self.updated_at = field_from_value(name, value)?,
            _ => return Err(Error::unknown_field("Note", name)),
        }
        Ok(())
    }
}

impl ModelEvents for Note {}

/// Records saves and destroys; assigns `0x1`, `0x2`, ... to new nodes.
/// Queries find created nodes by identifier only.
#[derive(Debug, Default)]
pub(crate) struct MemoryTx {
    pub saved: Vec<Row>,
    pub rows: BTreeMap<String, Row>,
    pub destroyed: Vec<String>,
    pub edges: Vec<Edge>,
    next_id: u64,
}

impl Transaction for MemoryTx {
    fn query(&mut self, _cx: &Cx, query: &Query) -> Result<Vec<Row>> {
        self.rows
            .get(&query.id)
            .map(|row| vec![row.clone()])
            .ok_or_else(|| Error::NotFound(query.id.clone()))
    }

    fn save(&mut self, _cx: &Cx, document: &Row) -> Result<Assigned> {
        self.saved.push(document.clone());
        let mut assigned = Assigned::default();
        if !document.contains_key("uid") {
            self.next_id += 1;
            let id = format!("0x{:x}", self.next_id);
            let mut row = document.clone();
            row.insert("uid".to_string(), Value::Text(id.clone()));
            self.rows.insert(id.clone(), row);
            assigned.uids.insert(FIRST_NEW_NODE.to_string(), id);
        }
        Ok(assigned)
    }

    fn mutate_set(&mut self, _cx: &Cx, edges: &[Edge]) -> Result<Assigned> {
        self.edges.extend_from_slice(edges);
        Ok(Assigned::default())
    }

    fn mutate_delete_field(
        &mut self,
        _cx: &Cx,
        id: &str,
        key: &str,
        _value: Option<&Value>,
    ) -> Result<()> {
        self.edges.retain(|e| !(e.subject == id && e.predicate == key));
        Ok(())
    }

    fn destroy(&mut self, _cx: &Cx, id: &str) -> Result<()> {
        self.destroyed.push(id.to_string());
        Ok(())
    }

    fn commit(&mut self, _cx: &Cx) -> Result<()> {
        Ok(())
    }

    fn discard(&mut self, _cx: &Cx) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_set_field_rejects_wrong_shape() {
    let mut note = Note::default();
    let err = note.set_field("views", Value::from("3")).unwrap_err();
    assert_eq!(err, Error::type_mismatch("views", "text", "bigint"));
    assert!(matches!(
        note.set_field("missing", Value::Null),
        Err(Error::UnknownField { .. })
    ));
}

#[test]
fn test_note_record_round_trip() {
    let note = Note {
        uid: "0x1".into(),
        title: "t".into(),
        summary: Some("s".into()),
        ..Note::default()
    };
    let copy = Note::from_record(note.to_record()).unwrap();
    assert_eq!(copy, note);
    assert_eq!(note.primary_key_value().as_deref(), Some("0x1"));
}
