//! Schema-aware data binding and change tracking for typed models.
//!
//! `modelbind` is the facade crate: it re-exports the runtime from
//! `modelbind-core` and the derives from `modelbind-macros`.
//!
//! # Overview
//!
//! - **Models** declare their fields once with `#[derive(Model)]`; the
//!   derive produces a descriptor table mapping external keys to fields.
//! - **Binding** copies untyped input (maps, JSON objects, transport
//!   argument structs) into a model, converting between compatible shapes
//!   and recording `(old, new)` for every field that actually changed.
//! - **Permissions** restrict which argument fields a caller may write.
//! - **Relations** rebuild to-one and to-many links through a persistence
//!   [`Transaction`], creating or cascading owned children.
//!
//! # Example
//!
//! ```ignore
//! use modelbind::prelude::*;
//!
//! #[derive(Debug, Default, Model)]
//! struct User {
//!     uid: String,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! let cx = Cx::for_testing();
//! let mut user = User::default();
//! let mut binder = Binder::new(&cx, &mut user);
//! binder.bind_json(&serde_json::json!({"name": "Ada"}), true)?;
//! assert!(binder.changed("name"));
//! ```

pub use modelbind_core::*;
pub use modelbind_macros::{Arguments, Model};

/// Everything needed to declare and bind models.
pub mod prelude {
    pub use modelbind_core::{
        ArgumentSet, Arguments as ArgumentMap, Binder, BinderConfig, Change, ChangeSet, Cx, Edge,
        Error, FieldInfo, FieldType, FieldValue, Model, ModelEvents, ModelInfo, PermitList,
        Query, Record, Result, Row, SaveAction, SaveCallbacks, ToValue, Transaction,
        ValidationErrors, Value,
    };
    pub use modelbind_macros::{Arguments, Model};
}
