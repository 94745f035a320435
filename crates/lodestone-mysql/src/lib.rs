//! # lodestone-mysql
//!
//! The production [`Client`] implementation, backed by a sqlx MySQL pool.
//! All statement text reaching this crate was generated by the rest of the
//! workspace and executes as-is; this crate only binds parameters and maps
//! result rows back into the workspace [`Value`] model.

use std::collections::HashMap;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::debug;

use lodestone_core::{Client, QueryOutput, Row, StoreError, Value};

/// A [`Client`] over a shared MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Connects a new pool to the given MySQL URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .connect(url)
            .await
            .map_err(|err| StoreError::with_source("failed to connect to mysql", err))?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for use outside the mapper.
    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    params: &[Value],
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Bool(b) => query.bind(*b),
            Value::Text(s) => query.bind(s.clone()),
            Value::Document(doc) => query.bind(doc.to_string()),
        };
    }
    query
}

fn map_row(row: &MySqlRow) -> Result<Row, StoreError> {
    let mut out = HashMap::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let raw = row
            .try_get_raw(column.ordinal())
            .map_err(|err| StoreError::with_source("failed to read column", err))?;
        if raw.is_null() {
            out.insert(name, Value::Null);
            continue;
        }
        let type_name = column.type_info().name();
        let value = if type_name == "BOOLEAN" {
            row.try_get::<bool, _>(column.ordinal()).map(Value::Bool)
        } else if type_name.contains("INT") {
            row.try_get::<i64, _>(column.ordinal()).map(Value::Int)
        } else if type_name == "FLOAT" || type_name == "DOUBLE" {
            row.try_get::<f64, _>(column.ordinal()).map(Value::Float)
        } else {
            row.try_get::<String, _>(column.ordinal()).map(Value::Text)
        };
        let value =
            value.map_err(|err| StoreError::with_source("failed to decode column", err))?;
        out.insert(name, value);
    }
    Ok(out)
}

impl Client for MySqlClient {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, StoreError> {
        debug!(sql, params = params.len(), "executing statement");
        let query = bind_params(sqlx::query(sql), params);

        if is_select(sql) {
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|err| StoreError::with_source("query failed", err))?;
            let rows = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;
            return Ok(QueryOutput::rows(rows));
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::with_source("statement failed", err))?;
        let last_insert_id = match result.last_insert_id() {
            0 => None,
            id => Some(id as i64),
        };
        Ok(QueryOutput {
            rows: Vec::new(),
            last_insert_id,
            rows_affected: result.rows_affected(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_detection_is_case_insensitive_and_trims() {
        assert!(is_select("SELECT * FROM `user`"));
        assert!(is_select("  select 1"));
        assert!(!is_select("INSERT INTO `user` () VALUES ()"));
        assert!(!is_select("SEL"));
    }
}
