//! Error types for the migration runner.

use lodestone_core::StoreError;

/// Errors raised while applying or reverting migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The requested label is not in the changeset mapping.
    #[error("migration `{label}` not found")]
    NotFound {
        /// The unknown label.
        label: String,
    },

    /// A step failed mid-sequence. The version row was not updated and
    /// already-executed steps remain applied (the store offers no
    /// transactional DDL).
    #[error("migration step failed while executing `{statement}`: {source}")]
    Step {
        /// The statement that failed.
        statement: String,
        /// The underlying store failure, unchanged.
        #[source]
        source: StoreError,
    },

    /// Failure from the external client outside a step sequence (version
    /// bookkeeping, direct helpers).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
