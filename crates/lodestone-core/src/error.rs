//! Error types for schema compilation.

/// Errors raised while resolving field declarations or compiling a schema.
///
/// These are fatal at compile time and never retried.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The model declares no fields at all.
    #[error("model `{table}` declares no schema")]
    MissingSchema {
        /// Table the model maps to.
        table: String,
    },

    /// The same field name appears twice in a declaration.
    #[error("model `{table}` declares field `{field}` more than once")]
    DuplicateField {
        /// Table the model maps to.
        table: String,
        /// The offending field name.
        field: String,
    },
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
