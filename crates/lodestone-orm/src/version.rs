//! Schema-version bookkeeping.
//!
//! One shared metadata table tracks, per managed table, the label of the
//! most recently completed migration. The table is created lazily on first
//! use; an absent row means "never migrated", which is distinct from a row
//! holding the default label.

use lodestone_core::{Client, StoreError, Value};

/// Name of the shared schema-version table.
pub const SCHEMA_TABLE: &str = "lodestone_schema_version";

const CREATE_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS `lodestone_schema_version` \
     (`table` VARCHAR(255) NOT NULL, `version` VARCHAR(255) NOT NULL, \
     UNIQUE KEY `table` (`table`)) ENGINE = InnoDB";

const UPSERT_VERSION: &str = "INSERT INTO `lodestone_schema_version` (`table`, `version`) \
     VALUES (?, ?) ON DUPLICATE KEY UPDATE `version` = VALUES(`version`)";

const SELECT_VERSION: &str =
    "SELECT * FROM `lodestone_schema_version` WHERE `table` = ? LIMIT 1";

/// Writes a table's version label, creating the metadata table if needed.
pub async fn write_version<C: Client>(
    client: &C,
    table: &str,
    version: &str,
) -> Result<(), StoreError> {
    client.query(CREATE_VERSION_TABLE, &[]).await?;
    client
        .query(UPSERT_VERSION, &[Value::text(table), Value::text(version)])
        .await?;
    Ok(())
}

/// Reads a table's version label.
///
/// Returns `None` when no row exists for the table yet, distinguishing
/// "declared but never migrated" from "migrated to baseline".
pub async fn read_version<C: Client>(client: &C, table: &str) -> Result<Option<String>, StoreError> {
    client.query(CREATE_VERSION_TABLE, &[]).await?;
    let out = client.query(SELECT_VERSION, &[Value::text(table)]).await?;
    Ok(out
        .rows
        .first()
        .and_then(|row| row.get("version"))
        .and_then(|v| v.as_text())
        .map(str::to_string))
}
