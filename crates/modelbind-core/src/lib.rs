//! Core types and traits for modelbind.
//!
//! `modelbind-core` holds everything the binder needs at runtime: the
//! dynamic [`Value`], per-model descriptor tables, the coercion engine, the
//! change tracker and the persistence [`Transaction`] contract.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Model`/`ModelEvents` are implemented by user models
//!   (normally through `#[derive(Model)]`); `Transaction` is implemented by
//!   persistence backends.
//! - **Binding**: [`Binder`] resolves external keys, coerces input through
//!   [`coerce`], tracks changes and drives saves, find-or-create and
//!   relation updates.
//! - **Structured concurrency**: re-exports `Cx` from asupersync; every
//!   collaborator call receives the operation's context.
//!
//! Most applications should use the `modelbind` facade.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::Cx;

pub mod args;
pub mod binder;
pub mod changes;
pub mod coerce;
pub mod config;
pub mod equality;
pub mod error;
pub mod field;
pub mod find_or_create;
pub mod model;
pub mod relations;
pub mod time;
pub mod transaction;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_support;

pub use args::{
    ArgumentSet, Arguments, DEFAULT_IDENTIFIER_KEY, Permit, PermitList, external_key,
};
pub use binder::Binder;
pub use changes::{Change, ChangeSet};
pub use coerce::{ParseFailure, coerce};
pub use config::BinderConfig;
pub use equality::deep_equal;
pub use error::{Error, FieldError, Result, ValidationErrors};
pub use field::{DestroyChildFn, FieldInfo, ModelInfo, NestedKind, SaveChildFn};
pub use find_or_create::SaveCallbacks;
pub use model::{Model, ModelEvents, SaveAction, default_record, for_each_field, resolve};
pub use relations::{DELETE_MARKER, destroy_child, save_child};
pub use time::{parse_timestamp, zero_timestamp};
pub use transaction::{Assigned, Edge, FIRST_NEW_NODE, Query, Row, Selection, Transaction};
pub use types::{FieldType, FieldValue, ToValue, TransportTime, field_from_value};
pub use value::{Record, Value};
