//! Implementation of the Arguments derive macro.
//!
//! Turns a transport input struct into an `ArgumentSet`: `Option` fields
//! that are `None` count as "not provided", everything else is provided.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Error, Fields, GenericArgument, Ident, Lit, PathArguments, Result, Type};

/// Parsed definition of a struct with `#[derive(Arguments)]`.
#[derive(Debug)]
pub struct ArgumentsDef {
    /// The struct name.
    pub name: Ident,
    /// Argument fields, in declaration order.
    pub fields: Vec<ArgumentFieldDef>,
    /// Whether any field carries `#[binder(skip)]`.
    pub has_skipped: bool,
}

/// One argument field.
#[derive(Debug)]
pub struct ArgumentFieldDef {
    /// The Rust field name.
    pub ident: Ident,
    /// Argument name as reported to the binder.
    pub name: String,
    /// The field type.
    pub ty: Type,
    /// Whether the type is `Option<T>`.
    pub is_optional: bool,
}

/// Parse a `DeriveInput` into an `ArgumentsDef`.
pub fn parse_arguments(input: &DeriveInput) -> Result<ArgumentsDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Arguments cannot be derived for generic structs",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Arguments requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                input,
                "Arguments can only be derived for structs",
            ));
        }
    };

    let mut fields = Vec::new();
    let mut has_skipped = false;
    for field in &named.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
        let mut name = ident.to_string();
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("binder") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: Lit = meta.value()?.parse()?;
                    match value {
                        Lit::Str(s) if !s.value().is_empty() => name = s.value(),
                        other => {
                            return Err(Error::new_spanned(
                                other,
                                "expected non-empty string literal for rename",
                            ));
                        }
                    }
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else {
                    let attr_name = meta.path.to_token_stream().to_string();
                    return Err(Error::new_spanned(
                        &meta.path,
                        format!(
                            "unknown binder attribute `{attr_name}`. \
                             Valid argument attributes are: rename, skip"
                        ),
                    ));
                }
                Ok(())
            })?;
        }

        if skip {
            has_skipped = true;
            continue;
        }

        fields.push(ArgumentFieldDef {
            is_optional: option_inner(&field.ty).is_some(),
            ident,
            name,
            ty: field.ty.clone(),
        });
    }

    Ok(ArgumentsDef {
        name: input.ident.clone(),
        fields,
        has_skipped,
    })
}

/// The `T` of `Option<T>`, if `ty` is one.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Generate the `ArgumentSet`, `ToValue` and `FieldValue` impls.
///
/// The `FieldValue` impl lets argument structs nest inside each other
/// (`Option<RoleInput>`, `Vec<RoleInput>`); nested values travel as maps.
pub fn generate_arguments_impl(def: &ArgumentsDef) -> TokenStream {
    let name = &def.name;

    let entries = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let arg_name = &f.name;
        if f.is_optional {
            quote! {
                (
                    ::std::borrow::Cow::Borrowed(#arg_name),
                    self.#ident.as_ref().map(modelbind_core::ToValue::to_value),
                )
            }
        } else {
            quote! {
                (
                    ::std::borrow::Cow::Borrowed(#arg_name),
                    Some(modelbind_core::ToValue::to_value(&self.#ident)),
                )
            }
        }
    });

    let extract = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let arg_name = &f.name;
        let ty = &f.ty;
        quote! {
            #ident: <#ty as modelbind_core::FieldValue>::from_value(
                map.remove(#arg_name).unwrap_or_default(),
            )?,
        }
    });

    let rest = def
        .has_skipped
        .then(|| quote! { ..::std::default::Default::default() });

    quote! {
        impl modelbind_core::ArgumentSet for #name {
            fn arguments(
                &self,
            ) -> ::std::vec::Vec<(::std::borrow::Cow<'_, str>, Option<modelbind_core::Value>)> {
                vec![ #( #entries ),* ]
            }
        }

        impl modelbind_core::ToValue for #name {
            fn to_value(&self) -> modelbind_core::Value {
                let map = modelbind_core::ArgumentSet::arguments(self)
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key.into_owned(), v)))
                    .collect();
                modelbind_core::Value::Map(map)
            }
        }

        impl modelbind_core::FieldValue for #name {
            const FIELD_TYPE: modelbind_core::FieldType = modelbind_core::FieldType::Record;

            fn from_value(value: modelbind_core::Value) -> Option<Self> {
                let modelbind_core::Value::Map(mut map) = value else {
                    return None;
                };
                Some(Self {
                    #( #extract )*
                    #rest
                })
            }
        }
    }
}
