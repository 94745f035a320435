//! Error types for the record lifecycle.

use std::collections::BTreeMap;

use lodestone_core::{Invalid, SchemaError, StoreError};

/// Per-field validation failures, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub BTreeMap<String, Invalid>);

impl ValidationErrors {
    /// Returns the failure recorded for a field, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Invalid> {
        self.0.get(name)
    }

    /// Returns whether any field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

/// Errors from model compilation and record persistence.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// Schema compilation failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Validation failed; the store was never reached.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Failure from the external client, passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrmError {
    /// Returns the validation failures, if this is a validation error.
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for record lifecycle operations.
pub type Result<T> = std::result::Result<T, OrmError>;
