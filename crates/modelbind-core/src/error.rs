//! Error types for binding, coercion and relation updates.

use std::fmt;

/// Result alias used throughout modelbind.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the binder and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An external key or field name did not resolve on the model.
    UnknownField {
        /// Model type name.
        model: &'static str,
        /// The key that failed to resolve.
        key: String,
    },
    /// No coercion rule converts the source into the destination type.
    TypeMismatch {
        /// Destination field name.
        field: String,
        /// Type name of the received value.
        source_type: &'static str,
        /// Declared type of the destination.
        dest_type: &'static str,
    },
    /// A relation input was malformed (missing or non-string identifier).
    RelationIntegrity(String),
    /// Validation hooks reported one or more problems.
    Validation(ValidationErrors),
    /// The persistence layer found nothing for the request.
    NotFound(String),
    /// Model metadata is inconsistent with what persistence requires.
    Config(String),
    /// Any other failure reported by the transaction collaborator.
    Transaction(String),
    /// A model hook failed.
    Hook(String),
}

impl Error {
    /// Build a type mismatch error for `field`.
    pub fn type_mismatch(
        field: impl Into<String>,
        source_type: &'static str,
        dest_type: &'static str,
    ) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            source_type,
            dest_type,
        }
    }

    /// Build an unknown field error.
    pub fn unknown_field(model: &'static str, key: impl Into<String>) -> Self {
        Error::UnknownField {
            model,
            key: key.into(),
        }
    }

    /// True if this is a not-found error from the persistence layer.
    ///
    /// Callers branch on this to decide between "create" and "exists".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownField { model, key } => {
                write!(f, "unknown field `{key}` on {model}")
            }
            Error::TypeMismatch {
                field,
                source_type,
                dest_type,
            } => write!(
                f,
                "data type mismatch on field `{field}`: received {source_type}, expected {dest_type}"
            ),
            Error::RelationIntegrity(msg) => write!(f, "relation integrity error: {msg}"),
            Error::Validation(errors) => write!(f, "validation failed: {errors}"),
            Error::NotFound(what) => write!(f, "not found: {what}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Transaction(msg) => write!(f, "transaction error: {msg}"),
            Error::Hook(msg) => write!(f, "hook error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// A single validation problem on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field the message applies to.
    pub field: String,
    /// Human readable message.
    pub message: String,
}

/// Collected validation messages returned by the `validate` hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a "field is required" message.
    pub fn add_required(&mut self, field: impl Into<String>) {
        let field = field.into();
        let message = format!("{field} is required");
        self.add(field, message);
    }

    /// True if no messages were collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected messages.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over collected messages.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Messages recorded for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when empty, otherwise `Err(Error::Validation(self))`.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}
