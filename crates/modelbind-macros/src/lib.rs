//! Procedural macros for modelbind.
//!
//! - `#[derive(Model)]` builds the per-type descriptor table and typed
//!   field accessors the binder works through.
//! - `#[derive(Arguments)]` turns a transport input struct into an
//!   `ArgumentSet`.
//!
//! Generated code refers to `modelbind_core`, so the deriving crate must
//! depend on it (the `modelbind` facade does).

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod arguments_derive;
mod model_derive;

/// Derive the `Model` trait for a struct.
///
/// # Attributes
///
/// Struct level, `#[binder(...)]`:
/// - `table = "name"`: persisted type name (default: snake_case type name)
/// - `events`: the type provides its own `ModelEvents` impl
///
/// Field level, `#[binder(...)]`:
/// - `key = "externalKey"`: external key (default: the field name)
/// - `no_key`: bindable by name only
/// - `primary_key`: the identifier field (default: a field named `uid`)
/// - `skip`: not bound at all
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Model)]
/// #[binder(table = "user", events)]
/// struct User {
///     uid: String,
///     #[binder(key = "userName")]
///     name: String,
///     email: Option<String>,
///     roles: Vec<Role>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(binder))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let def = match model_derive::parse_model(&input) {
        Ok(def) => def,
        Err(e) => return e.to_compile_error().into(),
    };

    model_derive::generate_model_impl(&def).into()
}

/// Derive `ArgumentSet` for a transport input struct.
///
/// `Option<T>` fields set to `None` are treated as not provided. Field
/// level `#[binder(rename = "name")]` and `#[binder(skip)]` are supported;
/// structs with skipped fields must implement `Default`.
#[proc_macro_derive(Arguments, attributes(binder))]
pub fn derive_arguments(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let def = match arguments_derive::parse_arguments(&input) {
        Ok(def) => def,
        Err(e) => return e.to_compile_error().into(),
    };

    arguments_derive::generate_arguments_impl(&def).into()
}
