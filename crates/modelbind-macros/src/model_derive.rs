//! Implementation of the Model derive macro.
//!
//! Generates the descriptor table (`ModelInfo`), typed field accessors and
//! the `FieldValue` impl that lets a model nest inside another.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, Lit, Result, Type};

/// Parsed definition of a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name.
    pub name: Ident,
    /// Persisted type name.
    pub table_name: String,
    /// Whether the model implements `ModelEvents` itself.
    pub events: bool,
    /// Bound fields, in declaration order. Skipped fields are absent.
    pub fields: Vec<ModelFieldDef>,
}

/// Parsed attributes of one bound field.
#[derive(Debug)]
pub struct ModelFieldDef {
    /// The field name.
    pub name: Ident,
    /// The field type.
    pub ty: Type,
    /// External key, `None` for `no_key` fields.
    pub key: Option<String>,
    /// Whether this is the identifier.
    pub primary_key: bool,
}

/// Parse a `DeriveInput` into a `ModelDef`.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let mut table_name = None;
    let mut events = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("binder") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: Lit = meta.value()?.parse()?;
                match value {
                    Lit::Str(s) => table_name = Some(s.value()),
                    other => {
                        return Err(Error::new_spanned(other, "expected string literal for table"));
                    }
                }
            } else if meta.path.is_ident("events") {
                events = true;
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown binder attribute `{attr_name}`. \
                         Valid struct attributes are: table, events"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    let mut fields = fields;
    let explicit = fields.iter().filter(|f| f.primary_key).count();
    match explicit {
        0 => {
            let implicit = fields.iter_mut().find(|f| f.name == "uid");
            match implicit {
                Some(field) => field.primary_key = true,
                None => {
                    return Err(Error::new_spanned(
                        &input.ident,
                        "Model requires an identifier: a `uid` field or #[binder(primary_key)]",
                    ));
                }
            }
        }
        1 => {}
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "Model supports exactly one #[binder(primary_key)] field",
            ));
        }
    }

    if let Some(pk) = fields.iter().find(|f| f.primary_key) {
        if !is_string_type(&pk.ty) {
            return Err(Error::new_spanned(
                &pk.ty,
                "the identifier field must be a String",
            ));
        }
    }

    Ok(ModelDef {
        table_name: table_name.unwrap_or_else(|| to_snake_case(&name.to_string())),
        name,
        events,
        fields,
    })
}

fn parse_fields(fields: &Fields) -> Result<Vec<ModelFieldDef>> {
    match fields {
        Fields::Named(named) => {
            let mut parsed = Vec::new();
            for field in &named.named {
                if let Some(def) = parse_field(field)? {
                    parsed.push(def);
                }
            }
            Ok(parsed)
        }
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Model requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

/// Parse one field. `None` for `#[binder(skip)]`.
fn parse_field(field: &Field) -> Result<Option<ModelFieldDef>> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut key = Some(name.to_string());
    let mut primary_key = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("binder") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("key") {
                let value: Lit = meta.value()?.parse()?;
                match value {
                    Lit::Str(s) if !s.value().is_empty() => key = Some(s.value()),
                    other => {
                        return Err(Error::new_spanned(
                            other,
                            "expected non-empty string literal for key",
                        ));
                    }
                }
            } else if path.is_ident("no_key") {
                key = None;
            } else if path.is_ident("primary_key") {
                primary_key = true;
            } else if path.is_ident("skip") {
                skip = true;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown binder attribute `{attr_name}`. \
                         Valid field attributes are: key, no_key, primary_key, skip"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }

    Ok(Some(ModelFieldDef {
        name,
        ty: field.ty.clone(),
        key,
        primary_key,
    }))
}

/// Check if a type is `String`.
fn is_string_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "String" && segment.arguments.is_empty();
        }
    }
    false
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Generate the `Model`, `ModelEvents`, `ToValue` and `FieldValue` impls.
pub fn generate_model_impl(def: &ModelDef) -> TokenStream {
    let name = &def.name;
    let type_name = name.to_string();
    let table_name = &def.table_name;
    let field_count = def.fields.len();

    let field_infos = def.fields.iter().map(|f| {
        let field_name = f.name.to_string();
        let ty = &f.ty;
        let key = f.key.as_ref().map(|k| quote! { .key(#k) });
        let pk = f.primary_key;
        quote! {
            modelbind_core::FieldInfo::new(
                #field_name,
                <#ty as modelbind_core::FieldValue>::FIELD_TYPE,
            )
            #key
            .primary_key(#pk)
            .optional(<#ty as modelbind_core::FieldValue>::OPTIONAL)
            .nested_opt(<#ty as modelbind_core::FieldValue>::NESTED)
        }
    });

    let getters = def.fields.iter().map(|f| {
        let ident = &f.name;
        let field_name = ident.to_string();
        quote! {
            #field_name => Some(modelbind_core::ToValue::to_value(&self.#ident)),
        }
    });

    let setters = def.fields.iter().map(|f| {
        let ident = &f.name;
        let field_name = ident.to_string();
        quote! {
            #field_name => self.#ident = modelbind_core::field_from_value(name, value)?,
        }
    });

    let events_impl = if def.events {
        quote! {}
    } else {
        quote! {
            impl modelbind_core::ModelEvents for #name {}
        }
    };

    quote! {
        impl modelbind_core::Model for #name {
            const TABLE_NAME: &'static str = #table_name;

            fn model_info() -> &'static modelbind_core::ModelInfo {
                static FIELDS: [modelbind_core::FieldInfo; #field_count] = [
                    #( #field_infos ),*
                ];
                static INFO: modelbind_core::ModelInfo = modelbind_core::ModelInfo {
                    type_name: #type_name,
                    table_name: #table_name,
                    fields: &FIELDS,
                    default_record: modelbind_core::default_record::<#name>,
                    save_child: modelbind_core::save_child::<#name>,
                    destroy_child: modelbind_core::destroy_child::<#name>,
                };
                &INFO
            }

            fn get_field(&self, name: &str) -> Option<modelbind_core::Value> {
                match name {
                    #( #getters )*
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: modelbind_core::Value,
            ) -> modelbind_core::Result<()> {
                match name {
                    #( #setters )*
                    _ => return Err(modelbind_core::Error::unknown_field(#type_name, name)),
                }
                Ok(())
            }
        }

        #events_impl

        impl modelbind_core::ToValue for #name {
            fn to_value(&self) -> modelbind_core::Value {
                modelbind_core::Value::Record(modelbind_core::Model::to_record(self))
            }
        }

        impl modelbind_core::FieldValue for #name {
            const FIELD_TYPE: modelbind_core::FieldType = modelbind_core::FieldType::Record;
            const NESTED: Option<fn() -> &'static modelbind_core::ModelInfo> =
                Some(<#name as modelbind_core::Model>::model_info);

            fn from_value(value: modelbind_core::Value) -> Option<Self> {
                match value {
                    modelbind_core::Value::Record(record) => {
                        <#name as modelbind_core::Model>::from_record(record)
                    }
                    _ => None,
                }
            }
        }
    }
}
