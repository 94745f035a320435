//! # lodestone-testkit
//!
//! An in-memory [`Client`] for tests. It executes exactly the statement
//! shapes the lodestone DDL generator and record lifecycle emit — CREATE
//! TABLE, the ALTER TABLE variants, INSERT (including the version-table
//! upsert), UPDATE, and exact-match SELECT — and rejects anything else.
//! It plays the role the in-memory SQLite pool plays for a driver-backed
//! test suite: fast, hermetic, and strict about duplicate columns and keys
//! so that failing migration steps surface as store errors.

use std::collections::HashMap;
use std::sync::Mutex;

use lodestone_core::{Client, QueryOutput, Row, StoreError, Value};

#[derive(Debug, Clone)]
struct Column {
    name: String,
    definition: String,
}

#[derive(Debug, Default)]
struct TableState {
    columns: Vec<Column>,
    key_names: Vec<String>,
    unique_columns: Vec<String>,
    auto_column: Option<String>,
    next_id: i64,
    rows: Vec<Row>,
    engine: String,
}

impl TableState {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}

/// In-memory store accepting the lodestone SQL surface.
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: Mutex<HashMap<String, TableState>>,
}

impl MemoryClient {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a table exists.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.lock().expect("lock poisoned").contains_key(table)
    }

    /// Returns a table's column names, in order.
    #[must_use]
    pub fn columns(&self, table: &str) -> Vec<String> {
        self.tables
            .lock()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns whether a table has the given column.
    #[must_use]
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns(table).iter().any(|c| c == column)
    }

    /// Returns a table's storage engine.
    #[must_use]
    pub fn engine(&self, table: &str) -> Option<String> {
        self.tables
            .lock()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.engine.clone())
    }

    /// Returns a snapshot of a table's rows.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

/// Reads a leading backtick-quoted identifier, returning it and the rest.
fn take_ident(input: &str) -> Result<(String, &str), StoreError> {
    let rest = input
        .strip_prefix('`')
        .ok_or_else(|| StoreError::new(format!("expected identifier at: {input}")))?;
    let end = rest
        .find('`')
        .ok_or_else(|| StoreError::new(format!("unterminated identifier at: {input}")))?;
    Ok((rest[..end].to_string(), &rest[end + 1..]))
}

/// Splits on a delimiter at paren depth zero.
fn split_top_level(input: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in input.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == delim && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Parses the column inside a key clause body like `` (`col` (128)) ``.
fn key_column(body: &str) -> Result<String, StoreError> {
    let inner = body
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| StoreError::new(format!("malformed key columns: {body}")))?;
    let (column, _) = take_ident(inner.trim())?;
    Ok(column)
}

impl MemoryClient {
    fn create_table(&self, rest: &str) -> Result<QueryOutput, StoreError> {
        let (table, rest) = take_ident(rest)?;
        let rest = rest.trim_start();
        let body_and_engine = rest
            .strip_prefix('(')
            .ok_or_else(|| StoreError::new("malformed CREATE TABLE"))?;
        let engine_at = body_and_engine
            .rfind(") ENGINE = ")
            .ok_or_else(|| StoreError::new("missing ENGINE clause"))?;
        let body = &body_and_engine[..engine_at];
        let engine = body_and_engine[engine_at + ") ENGINE = ".len()..].trim();

        let mut tables = self.tables.lock().expect("lock poisoned");
        if tables.contains_key(&table) {
            // IF NOT EXISTS semantics.
            return Ok(QueryOutput::default());
        }

        let mut state = TableState {
            engine: engine.to_string(),
            next_id: 1,
            ..TableState::default()
        };

        for item in split_top_level(body, ',') {
            if let Some(key) = item.strip_prefix("UNIQUE KEY ") {
                let (name, body) = take_ident(key)?;
                state.key_names.push(name);
                state.unique_columns.push(key_column(body)?);
            } else if let Some(key) = item.strip_prefix("KEY ") {
                let (name, _) = take_ident(key)?;
                state.key_names.push(name);
            } else if item.starts_with("CONSTRAINT ") || item.starts_with("PRIMARY KEY") {
                // Referential integrity is not enforced in memory.
            } else {
                let (name, definition) = take_ident(&item)?;
                let definition = definition.trim().to_string();
                if definition.contains("AUTO_INCREMENT") {
                    state.auto_column = Some(name.clone());
                }
                state.columns.push(Column { name, definition });
            }
        }

        tables.insert(table, state);
        Ok(QueryOutput::default())
    }

    fn alter_table(&self, rest: &str) -> Result<QueryOutput, StoreError> {
        let (table, rest) = take_ident(rest)?;
        let rest = rest.trim_start();

        let mut tables = self.tables.lock().expect("lock poisoned");
        let state = tables
            .get_mut(&table)
            .ok_or_else(|| StoreError::new(format!("Table '{table}' doesn't exist")))?;

        if let Some(key) = rest.strip_prefix("ADD UNIQUE KEY ") {
            let (name, body) = take_ident(key)?;
            if state.key_names.contains(&name) {
                return Err(StoreError::new(format!("Duplicate key name '{name}'")));
            }
            let column = key_column(body)?;
            if !state.has_column(&column) {
                return Err(StoreError::new(format!("Key column '{column}' doesn't exist in table")));
            }
            state.key_names.push(name);
            state.unique_columns.push(column);
        } else if let Some(key) = rest.strip_prefix("ADD KEY ") {
            let (name, body) = take_ident(key)?;
            if state.key_names.contains(&name) {
                return Err(StoreError::new(format!("Duplicate key name '{name}'")));
            }
            let column = key_column(body)?;
            if !state.has_column(&column) {
                return Err(StoreError::new(format!("Key column '{column}' doesn't exist in table")));
            }
            state.key_names.push(name);
        } else if rest.starts_with("ADD FOREIGN KEY ") {
            // Accepted, not enforced.
        } else if let Some(add) = rest.strip_prefix("ADD ") {
            let (column, definition) = take_ident(add)?;
            if state.has_column(&column) {
                return Err(StoreError::new(format!("Duplicate column name '{column}'")));
            }
            let definition = definition.trim().to_string();
            if definition.contains("AUTO_INCREMENT") {
                state.auto_column = Some(column.clone());
            }
            state.columns.push(Column {
                name: column.clone(),
                definition,
            });
            for row in &mut state.rows {
                row.insert(column.clone(), Value::Null);
            }
        } else if let Some(change) = rest.strip_prefix("CHANGE ") {
            let (column, definition) = take_ident(change)?;
            let index = state
                .column_index(&column)
                .ok_or_else(|| StoreError::new(format!("Unknown column '{column}' in '{table}'")))?;
            state.columns[index].definition = definition.trim().to_string();
        } else if let Some(drop) = rest.strip_prefix("DROP COLUMN ") {
            let (column, _) = take_ident(drop)?;
            let index = state
                .column_index(&column)
                .ok_or_else(|| StoreError::new(format!("Unknown column '{column}' in '{table}'")))?;
            state.columns.remove(index);
            state.unique_columns.retain(|c| c != &column);
            if state.auto_column.as_deref() == Some(&column) {
                state.auto_column = None;
            }
            for row in &mut state.rows {
                row.remove(&column);
            }
        } else if let Some(rename) = rest.strip_prefix("RENAME COLUMN ") {
            let (from, rename_rest) = take_ident(rename)?;
            let to_part = rename_rest
                .trim_start()
                .strip_prefix("TO ")
                .ok_or_else(|| StoreError::new("malformed RENAME COLUMN"))?;
            let (to, _) = take_ident(to_part)?;
            let index = state
                .column_index(&from)
                .ok_or_else(|| StoreError::new(format!("Unknown column '{from}' in '{table}'")))?;
            if state.has_column(&to) {
                return Err(StoreError::new(format!("Duplicate column name '{to}'")));
            }
            state.columns[index].name = to.clone();
            if state.auto_column.as_deref() == Some(&from) {
                state.auto_column = Some(to.clone());
            }
            for c in &mut state.unique_columns {
                if c == &from {
                    *c = to.clone();
                }
            }
            for row in &mut state.rows {
                if let Some(value) = row.remove(&from) {
                    row.insert(to.clone(), value);
                }
            }
        } else if let Some(engine) = rest.strip_prefix("ENGINE = ") {
            state.engine = engine.trim().to_string();
        } else {
            return Err(StoreError::new(format!("unsupported alteration: {rest}")));
        }

        Ok(QueryOutput::default())
    }

    fn insert(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, StoreError> {
        let (table, rest) = take_ident(rest)?;
        let rest = rest.trim_start();
        let cols_body = rest
            .strip_prefix('(')
            .ok_or_else(|| StoreError::new("malformed INSERT"))?;
        let close = cols_body
            .find(')')
            .ok_or_else(|| StoreError::new("malformed INSERT"))?;
        let mut columns = Vec::new();
        for part in split_top_level(&cols_body[..close], ',') {
            let (name, _) = take_ident(&part)?;
            columns.push(name);
        }
        let upsert = rest.contains("ON DUPLICATE KEY UPDATE");

        if columns.len() != params.len() {
            return Err(StoreError::new("parameter count mismatch"));
        }

        let mut tables = self.tables.lock().expect("lock poisoned");
        let state = tables
            .get_mut(&table)
            .ok_or_else(|| StoreError::new(format!("Table '{table}' doesn't exist")))?;

        for column in &columns {
            if !state.has_column(column) {
                return Err(StoreError::new(format!("Unknown column '{column}' in '{table}'")));
            }
        }

        let assignments: Vec<(String, Value)> = columns
            .into_iter()
            .zip(params.iter().cloned())
            .collect();

        if upsert {
            let unique = assignments
                .iter()
                .find(|(col, _)| state.unique_columns.contains(col))
                .cloned();
            if let Some((ucol, uval)) = unique {
                if let Some(row) = state.rows.iter_mut().find(|r| r.get(&ucol) == Some(&uval)) {
                    for (col, value) in &assignments {
                        row.insert(col.clone(), value.clone());
                    }
                    return Ok(QueryOutput {
                        rows_affected: 2,
                        ..QueryOutput::default()
                    });
                }
            }
        }

        let mut row: Row = state
            .columns
            .iter()
            .map(|c| (c.name.clone(), Value::Null))
            .collect();
        for (col, value) in &assignments {
            row.insert(col.clone(), value.clone());
        }

        let mut last_insert_id = None;
        if let Some(auto) = state.auto_column.clone() {
            match row.get(&auto) {
                Some(Value::Int(provided)) => {
                    if *provided >= state.next_id {
                        state.next_id = provided + 1;
                    }
                }
                _ => {
                    let id = state.next_id;
                    state.next_id += 1;
                    row.insert(auto, Value::Int(id));
                    last_insert_id = Some(id);
                }
            }
        }

        state.rows.push(row);
        Ok(QueryOutput {
            last_insert_id,
            rows_affected: 1,
            ..QueryOutput::default()
        })
    }

    fn update(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, StoreError> {
        let (table, rest) = take_ident(rest)?;
        let rest = rest
            .trim_start()
            .strip_prefix("SET ")
            .ok_or_else(|| StoreError::new("malformed UPDATE"))?;
        let where_at = rest
            .find(" WHERE ")
            .ok_or_else(|| StoreError::new("UPDATE requires a WHERE clause"))?;
        let set_body = &rest[..where_at];
        let where_body = &rest[where_at + " WHERE ".len()..];

        let mut set_columns = Vec::new();
        for part in split_top_level(set_body, ',') {
            let (name, eq) = take_ident(&part)?;
            if eq.trim() != "= ?" {
                return Err(StoreError::new(format!("malformed assignment: {part}")));
            }
            set_columns.push(name);
        }
        let (where_column, eq) = take_ident(where_body.trim())?;
        if eq.trim() != "= ?" {
            return Err(StoreError::new("malformed WHERE clause"));
        }

        if params.len() != set_columns.len() + 1 {
            return Err(StoreError::new("parameter count mismatch"));
        }
        let where_value = &params[set_columns.len()];

        let mut tables = self.tables.lock().expect("lock poisoned");
        let state = tables
            .get_mut(&table)
            .ok_or_else(|| StoreError::new(format!("Table '{table}' doesn't exist")))?;

        let mut affected = 0;
        for row in &mut state.rows {
            if row.get(&where_column) == Some(where_value) {
                for (col, value) in set_columns.iter().zip(params.iter()) {
                    row.insert(col.clone(), value.clone());
                }
                affected += 1;
            }
        }

        Ok(QueryOutput {
            rows_affected: affected,
            ..QueryOutput::default()
        })
    }

    fn select(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, StoreError> {
        let (table, rest) = take_ident(rest)?;
        let mut rest = rest.trim_start();

        let mut limit_one = false;
        if let Some(stripped) = rest.strip_suffix("LIMIT 1") {
            limit_one = true;
            rest = stripped.trim_end();
        }

        let mut filters: Vec<String> = Vec::new();
        if let Some(where_body) = rest.strip_prefix("WHERE ") {
            for clause in where_body.split(" AND ") {
                let (column, eq) = take_ident(clause.trim())?;
                if eq.trim() != "= ?" {
                    return Err(StoreError::new(format!("malformed predicate: {clause}")));
                }
                filters.push(column);
            }
        } else if !rest.is_empty() {
            return Err(StoreError::new(format!("unsupported SELECT tail: {rest}")));
        }

        if filters.len() != params.len() {
            return Err(StoreError::new("parameter count mismatch"));
        }

        let tables = self.tables.lock().expect("lock poisoned");
        let state = tables
            .get(&table)
            .ok_or_else(|| StoreError::new(format!("Table '{table}' doesn't exist")))?;

        let mut rows = Vec::new();
        for row in &state.rows {
            let matches = filters
                .iter()
                .zip(params.iter())
                .all(|(col, value)| row.get(col) == Some(value));
            if matches {
                rows.push(row.clone());
                if limit_one {
                    break;
                }
            }
        }

        Ok(QueryOutput::rows(rows))
    }
}

impl Client for MemoryClient {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, StoreError> {
        let sql = sql.trim();
        let placeholders = sql.matches('?').count();
        if placeholders != params.len() {
            return Err(StoreError::new(format!(
                "statement has {placeholders} placeholders but {} parameters were bound",
                params.len()
            )));
        }

        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            self.create_table(rest)
        } else if let Some(rest) = sql.strip_prefix("ALTER TABLE ") {
            self.alter_table(rest)
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            self.insert(rest, params)
        } else if let Some(rest) = sql.strip_prefix("UPDATE ") {
            self.update(rest, params)
        } else if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
            self.select(rest, params)
        } else {
            Err(StoreError::new(format!("unsupported statement: {sql}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATE_USER: &str = "CREATE TABLE IF NOT EXISTS `user` (`id` BIGINT AUTO_INCREMENT PRIMARY KEY, `email` TEXT) ENGINE = InnoDB";

    #[tokio::test]
    async fn create_insert_select_roundtrip() {
        let client = MemoryClient::new();
        client.query(CREATE_USER, &[]).await.unwrap();
        assert_eq!(client.columns("user"), vec!["id", "email"]);
        assert_eq!(client.engine("user").as_deref(), Some("InnoDB"));

        let out = client
            .query(
                "INSERT INTO `user` (`email`) VALUES (?)",
                &[Value::text("hey")],
            )
            .await
            .unwrap();
        assert_eq!(out.last_insert_id, Some(1));

        let out = client
            .query(
                "SELECT * FROM `user` WHERE `email` = ?",
                &[Value::text("hey")],
            )
            .await
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].get("id"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let client = MemoryClient::new();
        client.query(CREATE_USER, &[]).await.unwrap();
        client.query(CREATE_USER, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_add_column_errors() {
        let client = MemoryClient::new();
        client.query(CREATE_USER, &[]).await.unwrap();
        client
            .query("ALTER TABLE `user` ADD `name` TEXT", &[])
            .await
            .unwrap();
        let err = client
            .query("ALTER TABLE `user` ADD `name` INT", &[])
            .await
            .unwrap_err();
        assert!(err.message().contains("Duplicate column"));
    }

    #[tokio::test]
    async fn drop_and_rename_column() {
        let client = MemoryClient::new();
        client.query(CREATE_USER, &[]).await.unwrap();

        client
            .query("ALTER TABLE `user` RENAME COLUMN `email` TO `mail`", &[])
            .await
            .unwrap();
        assert!(client.has_column("user", "mail"));
        assert!(!client.has_column("user", "email"));

        client
            .query("ALTER TABLE `user` DROP COLUMN `mail`", &[])
            .await
            .unwrap();
        assert!(!client.has_column("user", "mail"));
    }

    #[tokio::test]
    async fn upsert_replaces_on_unique_column() {
        let client = MemoryClient::new();
        client
            .query(
                "CREATE TABLE IF NOT EXISTS `versions` (`table` VARCHAR(255) NOT NULL, `version` VARCHAR(255) NOT NULL, UNIQUE KEY `table` (`table`)) ENGINE = InnoDB",
                &[],
            )
            .await
            .unwrap();

        let upsert = "INSERT INTO `versions` (`table`, `version`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `version` = VALUES(`version`)";
        client
            .query(upsert, &[Value::text("user"), Value::text("0000")])
            .await
            .unwrap();
        client
            .query(upsert, &[Value::text("user"), Value::text("0001")])
            .await
            .unwrap();

        let rows = client.rows("versions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("version"), Some(&Value::text("0001")));
    }

    #[tokio::test]
    async fn update_with_where() {
        let client = MemoryClient::new();
        client.query(CREATE_USER, &[]).await.unwrap();
        client
            .query(
                "INSERT INTO `user` (`email`) VALUES (?)",
                &[Value::text("hey")],
            )
            .await
            .unwrap();

        let out = client
            .query(
                "UPDATE `user` SET `email` = ? WHERE `id` = ?",
                &[Value::text("yo"), Value::Int(1)],
            )
            .await
            .unwrap();
        assert_eq!(out.rows_affected, 1);
        assert_eq!(client.rows("user")[0].get("email"), Some(&Value::text("yo")));
    }

    #[tokio::test]
    async fn unsupported_statement_is_rejected() {
        let client = MemoryClient::new();
        let err = client.query("DELETE FROM `user`", &[]).await.unwrap_err();
        assert!(err.message().contains("unsupported"));
    }
}
