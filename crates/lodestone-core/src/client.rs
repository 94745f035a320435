//! The external SQL client contract.
//!
//! All statement text generated by this workspace is directly executable by
//! a [`Client`] with no further transformation. Connection management,
//! pooling, timeouts, and retries are the client's concern, not this
//! layer's.

use crate::value::{Row, Value};

/// A failure from the external client, passed through unchanged.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// A store failure with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A store failure wrapping an underlying driver error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The outcome of one executed statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Result rows (empty for non-SELECT statements).
    pub rows: Vec<Row>,
    /// Store-generated identifier for an INSERT against an
    /// auto-incrementing table.
    pub last_insert_id: Option<i64>,
    /// Rows affected by a mutation.
    pub rows_affected: u64,
}

impl QueryOutput {
    /// An output carrying only rows.
    #[must_use]
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

/// Asynchronous statement execution against the underlying store.
///
/// One completion per operation, carrying either rows or an error, never
/// both. Implementations: `lodestone-mysql` for production,
/// `lodestone-testkit` for tests.
#[allow(async_fn_in_trait)]
pub trait Client: Send + Sync {
    /// Executes one statement with positional `?` parameters.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, StoreError>;
}
