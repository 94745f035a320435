//! DDL generation.
//!
//! Pure functions turning a compiled [`Schema`] or an [`Alteration`] into
//! ordered SQL statement text. Nothing here executes SQL; execution is the
//! caller's responsibility through a [`crate::Client`].
//!
//! The generated text is a compatibility surface: backtick quoting and
//! keyword casing are exercised bit-for-bit by the tests.

use crate::field::{self, FieldDecl};
use crate::schema::{ColumnSpec, KeyKind, KeySpec, Schema, Unique};
use crate::value::Value;

/// Backtick-quotes an identifier.
#[must_use]
pub fn quote(name: &str) -> String {
    format!("`{name}`")
}

/// Renders a default value literal.
fn default_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Document(doc) => format!("'{}'", doc.to_string().replace('\'', "''")),
    }
}

/// Renders one column's definition text (everything after the name).
///
/// Raw SQL declarations are emitted verbatim; structured specs render as
/// type, auto-increment, primary key, nullability, and default, in that
/// order.
#[must_use]
pub fn column_definition(spec: &ColumnSpec) -> String {
    if let Some(sql) = &spec.sql {
        return sql.clone();
    }

    let mut parts = Vec::new();
    if let Some(sql_type) = &spec.sql_type {
        parts.push(sql_type.mysql_name());
    }
    if spec.auto_increment {
        parts.push("AUTO_INCREMENT".to_string());
    }
    if spec.primary_key {
        parts.push("PRIMARY KEY".to_string());
    } else if !spec.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &spec.default {
        parts.push(format!("DEFAULT {}", default_sql(default)));
    }
    parts.join(" ")
}

/// Renders a key column list: `` (`col` (len), ...) ``.
fn key_columns_sql(key: &KeySpec) -> String {
    let cols: Vec<String> = key
        .columns
        .iter()
        .map(|col| match col.prefix {
            Some(len) => format!("{} ({len})", quote(&col.name)),
            None => quote(&col.name),
        })
        .collect();
    format!("({})", cols.join(", "))
}

/// Renders one key clause for CREATE TABLE or ADD KEY statements.
fn key_sql(key: &KeySpec) -> String {
    match key.kind {
        KeyKind::Unique => format!("UNIQUE KEY {} {}", quote(&key.name), key_columns_sql(key)),
        KeyKind::Index => format!("KEY {} {}", quote(&key.name), key_columns_sql(key)),
        KeyKind::Primary => format!("PRIMARY KEY {}", key_columns_sql(key)),
    }
}

/// Generates the single CREATE TABLE statement for a compiled schema:
/// all columns, all derived keys and constraints, and the declared engine.
#[must_use]
pub fn create_table(schema: &Schema) -> String {
    let mut items: Vec<String> = schema
        .fields
        .iter()
        .map(|(name, spec)| format!("{} {}", quote(name), column_definition(spec)))
        .collect();

    for key in &schema.keys {
        items.push(key_sql(key));
    }
    for clause in &schema.foreign_clauses {
        items.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote(&clause.constraint),
            quote(&clause.column),
            quote(&clause.references_table),
            quote(&clause.references_column),
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = {}",
        quote(&schema.table),
        items.join(", "),
        schema.engine,
    )
}

/// A key requested through the `add key` alteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    /// Key kind (`unique` or plain index).
    pub kind: KeyKind,
    /// Indexed column; defaults to the field the request is keyed under.
    pub name: Option<String>,
    /// Optional prefix-length qualifier.
    pub length: Option<u32>,
}

impl KeyRequest {
    /// A unique key request.
    #[must_use]
    pub fn unique() -> Self {
        Self {
            kind: KeyKind::Unique,
            name: None,
            length: None,
        }
    }

    /// A plain index request.
    #[must_use]
    pub fn index() -> Self {
        Self {
            kind: KeyKind::Index,
            name: None,
            length: None,
        }
    }

    /// Sets the indexed column, when different from the key's own name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the prefix length.
    #[must_use]
    pub fn length(mut self, len: u32) -> Self {
        self.length = Some(len);
        self
    }
}

/// An alteration request against a live table.
///
/// One exhaustive variant per mutation kind; the single match in [`alter`]
/// replaces any ad hoc shape probing at call sites.
#[derive(Debug)]
pub enum Alteration {
    /// Add one column per declaration.
    AddColumns(Vec<(String, FieldDecl)>),
    /// Change one column per declaration.
    ChangeColumns(Vec<(String, FieldDecl)>),
    /// Drop columns by name.
    DropColumns(Vec<String>),
    /// Rename a column, preserving its type.
    RenameColumn {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
    /// Switch the storage engine.
    Engine(String),
    /// Add keys: key name to request.
    AddKeys(Vec<(String, KeyRequest)>),
}

impl Alteration {
    /// Convenience constructor for a single added column.
    pub fn add_column(field: impl Into<String>, decl: impl Into<FieldDecl>) -> Self {
        Self::AddColumns(vec![(field.into(), decl.into())])
    }

    /// Convenience constructor for a single changed column.
    pub fn change_column(field: impl Into<String>, decl: impl Into<FieldDecl>) -> Self {
        Self::ChangeColumns(vec![(field.into(), decl.into())])
    }

    /// Convenience constructor for a single dropped column.
    pub fn drop_column(field: impl Into<String>) -> Self {
        Self::DropColumns(vec![field.into()])
    }
}

/// The follow-up statements a resolved column spec demands after its
/// ADD/CHANGE statement: unique keys, foreign key indexes, and referential
/// constraints.
fn column_followups(table: &str, name: &str, spec: &ColumnSpec) -> Vec<String> {
    let mut statements = Vec::new();

    if let Some(unique) = spec.unique {
        let columns = match unique {
            Unique::Full => format!("({})", quote(name)),
            Unique::Prefix(len) => format!("({} ({len}))", quote(name)),
        };
        statements.push(format!(
            "ALTER TABLE {} ADD UNIQUE KEY {} {columns}",
            quote(table),
            quote(name),
        ));
    }

    if let Some(foreign) = &spec.foreign {
        statements.push(format!(
            "ALTER TABLE {} ADD KEY {} ({})",
            quote(table),
            quote(&format!("{}_fkey", foreign.table)),
            quote(name),
        ));
        // Unnamed: the store assigns the `<table>_ibfk_<n>` constraint name.
        statements.push(format!(
            "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({})",
            quote(table),
            quote(name),
            quote(&foreign.table),
            quote(&foreign.column),
        ));
    }

    statements
}

/// Generates the ordered ALTER TABLE statements for an alteration request.
#[must_use]
pub fn alter(table: &str, alteration: &Alteration) -> Vec<String> {
    match alteration {
        Alteration::AddColumns(fields) | Alteration::ChangeColumns(fields) => {
            let verb = match alteration {
                Alteration::AddColumns(_) => "ADD",
                _ => "CHANGE",
            };
            let mut statements = Vec::new();
            for (name, decl) in fields {
                let spec = field::resolve(name, decl);
                statements.push(format!(
                    "ALTER TABLE {} {verb} {} {}",
                    quote(table),
                    quote(name),
                    column_definition(&spec),
                ));
                statements.extend(column_followups(table, name, &spec));
            }
            statements
        }

        Alteration::DropColumns(names) => names
            .iter()
            .map(|name| format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(name)))
            .collect(),

        Alteration::RenameColumn { from, to } => vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote(table),
            quote(from),
            quote(to),
        )],

        Alteration::Engine(engine) => {
            vec![format!("ALTER TABLE {} ENGINE = {engine}", quote(table))]
        }

        Alteration::AddKeys(keys) => keys
            .iter()
            .map(|(field, request)| {
                let column = request.name.as_deref().unwrap_or(field);
                let columns = match request.length {
                    Some(len) => format!("({} ({len}))", quote(column)),
                    None => format!("({})", quote(column)),
                };
                let keyword = match request.kind {
                    KeyKind::Unique => "ADD UNIQUE KEY",
                    _ => "ADD KEY",
                };
                format!("ALTER TABLE {} {keyword} {} {columns}", quote(table), quote(field))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::schema::{Schema, DEFAULT_ENGINE, DEFAULT_VERSION};

    #[test]
    fn create_table_with_columns_keys_and_engine() {
        let stuff = Schema::compile(
            "stuff",
            DEFAULT_ENGINE,
            DEFAULT_VERSION,
            vec![("id".to_string(), Field::id().into())],
        )
        .unwrap();

        let schema = Schema::compile(
            "user",
            DEFAULT_ENGINE,
            DEFAULT_VERSION,
            vec![
                ("id".to_string(), Field::id().into()),
                ("email".to_string(), Field::text().unique_prefix(128).into()),
                ("stuff_id".to_string(), Field::foreign(&stuff).into()),
            ],
        )
        .unwrap();

        assert_eq!(
            create_table(&schema),
            "CREATE TABLE IF NOT EXISTS `user` (\
             `id` BIGINT AUTO_INCREMENT PRIMARY KEY, \
             `email` TEXT, \
             `stuff_id` BIGINT, \
             UNIQUE KEY `email` (`email` (128)), \
             KEY `stuff_fkey` (`stuff_id`), \
             CONSTRAINT `user_ibfk_1` FOREIGN KEY (`stuff_id`) REFERENCES `stuff` (`id`)\
             ) ENGINE = InnoDB"
        );
    }

    #[test]
    fn add_column() {
        let sql = alter("user", &Alteration::add_column("yam", Field::string()));
        assert_eq!(sql, vec!["ALTER TABLE `user` ADD `yam` TEXT"]);
    }

    #[test]
    fn change_column_from_spec() {
        let sql = alter("user", &Alteration::change_column("beets", Field::number()));
        assert_eq!(sql, vec!["ALTER TABLE `user` CHANGE `beets` INT"]);
    }

    #[test]
    fn change_column_from_raw_text() {
        let sql = alter("user", &Alteration::change_column("clams", "TASTY CLAMS"));
        assert_eq!(sql, vec!["ALTER TABLE `user` CHANGE `clams` TASTY CLAMS"]);
    }

    #[test]
    fn change_with_unique_prefix_appends_key_statement() {
        let sql = alter(
            "user",
            &Alteration::change_column("clams", Field::text().unique_prefix(128)),
        );
        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[1],
            "ALTER TABLE `user` ADD UNIQUE KEY `clams` (`clams` (128))"
        );
    }

    #[test]
    fn add_column_with_default_and_full_unique() {
        let sql = alter(
            "user",
            &Alteration::add_column(
                "sss",
                Field::char(128).unique().default_value("y"),
            ),
        );
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `user` ADD `sss` CHAR(128) DEFAULT 'y'",
                "ALTER TABLE `user` ADD UNIQUE KEY `sss` (`sss`)",
            ]
        );
    }

    #[test]
    fn add_foreign_column_appends_key_and_constraint() {
        let stuff = Schema::compile(
            "stuff",
            DEFAULT_ENGINE,
            DEFAULT_VERSION,
            vec![("id".to_string(), Field::id().into())],
        )
        .unwrap();

        let sql = alter(
            "user",
            &Alteration::add_column("stuff_id", Field::foreign(&stuff)),
        );
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `user` ADD `stuff_id` BIGINT",
                "ALTER TABLE `user` ADD KEY `stuff_fkey` (`stuff_id`)",
                "ALTER TABLE `user` ADD FOREIGN KEY (`stuff_id`) REFERENCES `stuff` (`id`)",
            ]
        );
    }

    #[test]
    fn drop_column() {
        let sql = alter("user", &Alteration::drop_column("words"));
        assert_eq!(sql, vec!["ALTER TABLE `user` DROP COLUMN `words`"]);
    }

    #[test]
    fn rename_column_is_a_single_statement() {
        let sql = alter(
            "volatile",
            &Alteration::RenameColumn {
                from: "rename".to_string(),
                to: "lol".to_string(),
            },
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE `volatile` RENAME COLUMN `rename` TO `lol`"]
        );
    }

    #[test]
    fn change_engine() {
        let sql = alter("user", &Alteration::Engine("MyISAM".to_string()));
        assert_eq!(sql, vec!["ALTER TABLE `user` ENGINE = MyISAM"]);
    }

    #[test]
    fn add_key_defaults_column_to_field_name() {
        let sql = alter(
            "user",
            &Alteration::AddKeys(vec![("yeah".to_string(), KeyRequest::unique())]),
        );
        assert_eq!(sql, vec!["ALTER TABLE `user` ADD UNIQUE KEY `yeah` (`yeah`)"]);
    }

    #[test]
    fn add_key_with_alias_column() {
        let sql = alter(
            "user",
            &Alteration::AddKeys(vec![(
                "yeah".to_string(),
                KeyRequest::unique().name("yo"),
            )]),
        );
        assert_eq!(sql, vec!["ALTER TABLE `user` ADD UNIQUE KEY `yeah` (`yo`)"]);
    }

    #[test]
    fn add_key_with_alias_and_prefix_length() {
        let sql = alter(
            "user",
            &Alteration::AddKeys(vec![(
                "yeah".to_string(),
                KeyRequest::unique().name("yo").length(128),
            )]),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE `user` ADD UNIQUE KEY `yeah` (`yo` (128))"]
        );
    }
}
