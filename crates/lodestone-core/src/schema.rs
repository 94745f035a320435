//! Compiled schema representation.
//!
//! A [`Schema`] is the canonical, immutable description of one record
//! type's table: ordered column specs plus the key and foreign-key clauses
//! derived from them. It is built exactly once per model by
//! [`Schema::compile`] and never changes afterwards.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::field::{self, FieldDecl, GetterFn, SetterFn, ValidatorFn};
use crate::value::Value;

/// Default storage engine for newly created tables.
pub const DEFAULT_ENGINE: &str = "InnoDB";

/// Sentinel version label for a schema that never declared one.
pub const DEFAULT_VERSION: &str = "0000";

/// SQL column types supported by the declaration surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// 64-bit integer.
    BigInt,
    /// 32-bit integer.
    Int,
    /// Double-precision float.
    Double,
    /// Unbounded text.
    Text,
    /// Variable-length character string.
    Varchar(u32),
    /// Fixed-length character string.
    Char(u32),
    /// Enumeration over a fixed value set.
    Enum(Vec<String>),
}

impl SqlType {
    /// Returns the MySQL type name.
    #[must_use]
    pub fn mysql_name(&self) -> String {
        match self {
            Self::BigInt => "BIGINT".to_string(),
            Self::Int => "INT".to_string(),
            Self::Double => "DOUBLE".to_string(),
            Self::Text => "TEXT".to_string(),
            Self::Varchar(len) => format!("VARCHAR({len})"),
            Self::Char(len) => format!("CHAR({len})"),
            Self::Enum(values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect();
                format!("ENUM({})", quoted.join(","))
            }
        }
    }
}

/// Uniqueness requested by a field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unique {
    /// Unique over the full column value.
    Full,
    /// Unique over a length-bounded prefix, for variable-length types.
    Prefix(u32),
}

impl Unique {
    /// The prefix length, if bounded.
    #[must_use]
    pub fn prefix(&self) -> Option<u32> {
        match self {
            Self::Full => None,
            Self::Prefix(len) => Some(*len),
        }
    }
}

/// A reference to another record type's identifier column.
///
/// Captured from the referenced compiled schema at declaration time; the
/// compiler turns it into an index and a referential constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignSpec {
    /// Referenced table name.
    pub table: String,
    /// Referenced column name.
    pub column: String,
    /// Column type matching the referenced primary key.
    pub sql_type: SqlType,
}

/// Key kinds the compiler and DDL generator understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    /// `UNIQUE KEY`.
    Unique,
    /// Plain `KEY` (index).
    Index,
    /// `PRIMARY KEY`.
    Primary,
}

/// One column participating in a key, with an optional prefix length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumn {
    /// Column name.
    pub name: String,
    /// Prefix length for length-bounded keys on variable-length types.
    pub prefix: Option<u32>,
}

/// A derived key specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Key kind.
    pub kind: KeyKind,
    /// Key name.
    pub name: String,
    /// Ordered key columns.
    pub columns: Vec<KeyColumn>,
}

impl KeySpec {
    /// A single-column key.
    #[must_use]
    pub fn single(kind: KeyKind, name: impl Into<String>, column: impl Into<String>, prefix: Option<u32>) -> Self {
        Self {
            kind,
            name: name.into(),
            columns: vec![KeyColumn {
                name: column.into(),
                prefix,
            }],
        }
    }
}

/// A derived referential constraint clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignClause {
    /// Constraint name (`<table>_ibfk_<n>`).
    pub constraint: String,
    /// Local column holding the reference.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
}

/// Canonical, resolved description of one field's column and behavior.
///
/// Produced once per declared field by the resolver; immutable after the
/// schema is compiled.
#[derive(Clone, Default)]
pub struct ColumnSpec {
    /// Raw SQL column-definition text. When set it is emitted verbatim and
    /// wins over every structured attribute below.
    pub sql: Option<String>,
    /// Structured column type.
    pub sql_type: Option<SqlType>,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether a value must be present before saving (also renders NOT NULL).
    pub required: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Uniqueness request; becomes a single-column unique key.
    pub unique: Option<Unique>,
    /// Whether this column is the primary key.
    pub primary_key: bool,
    /// Whether this column auto-increments.
    pub auto_increment: bool,
    /// Whether values are structured documents serialized to JSON text.
    pub document: bool,
    /// Reference to another record type's identifier.
    pub foreign: Option<ForeignSpec>,
    /// Read transform applied by `Record::get`.
    pub getter: Option<GetterFn>,
    /// Write transform applied by `Record::set`.
    pub setter: Option<SetterFn>,
    /// Ordered validator chain.
    pub validators: Vec<ValidatorFn>,
}

impl std::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("sql", &self.sql)
            .field("sql_type", &self.sql_type)
            .field("nullable", &self.nullable)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("unique", &self.unique)
            .field("primary_key", &self.primary_key)
            .field("auto_increment", &self.auto_increment)
            .field("document", &self.document)
            .field("foreign", &self.foreign)
            .field("getter", &self.getter.as_ref().map(|_| "fn"))
            .field("setter", &self.setter.as_ref().map(|_| "fn"))
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl ColumnSpec {
    /// Creates a structured spec with the given type.
    #[must_use]
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type: Some(sql_type),
            nullable: true,
            ..Self::default()
        }
    }

    /// Creates a spec from raw SQL column-definition text.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            nullable: true,
            ..Self::default()
        }
    }

    /// Marks a value as required before saving; renders NOT NULL.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Requests a unique key over the full column value.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = Some(Unique::Full);
        self
    }

    /// Requests a unique key over a length-bounded prefix.
    #[must_use]
    pub fn unique_prefix(mut self, len: u32) -> Self {
        self.unique = Some(Unique::Prefix(len));
        self
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks values as structured documents stored as JSON text.
    #[must_use]
    pub fn document(mut self) -> Self {
        self.document = true;
        self
    }

    /// Sets the read transform.
    #[must_use]
    pub fn getter(mut self, f: GetterFn) -> Self {
        self.getter = Some(f);
        self
    }

    /// Sets the write transform.
    #[must_use]
    pub fn setter(mut self, f: SetterFn) -> Self {
        self.setter = Some(f);
        self
    }

    /// Appends a validator to the chain.
    #[must_use]
    pub fn validator(mut self, f: ValidatorFn) -> Self {
        self.validators.push(f);
        self
    }

    /// Sets the foreign reference.
    #[must_use]
    pub fn foreign(mut self, spec: ForeignSpec) -> Self {
        self.foreign = Some(spec);
        self
    }
}

/// A compiled, immutable schema for one record type.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Table name.
    pub table: String,
    /// Storage engine.
    pub engine: String,
    /// Declared version label; `"0000"` when never declared.
    pub version: String,
    /// Ordered field name / column spec pairs, in declaration order.
    pub fields: Vec<(String, ColumnSpec)>,
    /// Derived keys (unique keys from field specs, foreign-key indexes).
    pub keys: Vec<KeySpec>,
    /// Derived referential constraints.
    pub foreign_clauses: Vec<ForeignClause>,
}

impl Schema {
    /// Compiles ordered field declarations into a schema.
    ///
    /// Resolves every declaration through the field resolver, then derives:
    /// - a single-column unique key per field requesting `unique`, honoring
    ///   an optional prefix length;
    /// - per foreign field, an index named `<referencedTable>_fkey` and a
    ///   constraint named `<table>_ibfk_<n>`.
    ///
    /// Fails when no fields are declared or a field name repeats.
    pub fn compile(
        table: impl Into<String>,
        engine: impl Into<String>,
        version: impl Into<String>,
        declarations: Vec<(String, FieldDecl)>,
    ) -> Result<Self, SchemaError> {
        let table = table.into();
        if declarations.is_empty() {
            return Err(SchemaError::MissingSchema { table });
        }

        let mut fields: Vec<(String, ColumnSpec)> = Vec::with_capacity(declarations.len());
        let mut keys = Vec::new();
        let mut foreign_clauses = Vec::new();
        let mut foreign_count = 0usize;

        for (name, decl) in declarations {
            if fields.iter().any(|(existing, _)| existing == &name) {
                return Err(SchemaError::DuplicateField { table, field: name });
            }
            let spec = field::resolve(&name, &decl);

            if let Some(unique) = spec.unique {
                keys.push(KeySpec::single(KeyKind::Unique, &name, &name, unique.prefix()));
            }
            if let Some(foreign) = &spec.foreign {
                foreign_count += 1;
                keys.push(KeySpec::single(
                    KeyKind::Index,
                    format!("{}_fkey", foreign.table),
                    &name,
                    None,
                ));
                foreign_clauses.push(ForeignClause {
                    constraint: format!("{table}_ibfk_{foreign_count}"),
                    column: name.clone(),
                    references_table: foreign.table.clone(),
                    references_column: foreign.column.clone(),
                });
            }

            fields.push((name, spec));
        }

        Ok(Self {
            table,
            engine: engine.into(),
            version: version.into(),
            fields,
            keys,
            foreign_clauses,
        })
    }

    /// Looks up a field's spec by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ColumnSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    /// Returns whether the schema declares the given field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Returns the primary key field, if one is flagged.
    #[must_use]
    pub fn primary_key(&self) -> Option<(&str, &ColumnSpec)> {
        self.fields
            .iter()
            .find(|(_, spec)| spec.primary_key)
            .map(|(name, spec)| (name.as_str(), spec))
    }

    /// Returns the primary key column name, defaulting to `id`.
    #[must_use]
    pub fn id_column(&self) -> &str {
        self.primary_key().map_or("id", |(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn user_schema() -> Schema {
        Schema::compile(
            "user",
            DEFAULT_ENGINE,
            DEFAULT_VERSION,
            vec![
                ("id".to_string(), Field::id().into()),
                ("email".to_string(), Field::text().unique_prefix(128).into()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn compile_preserves_declaration_order() {
        let schema = user_schema();
        let names: Vec<&str> = schema.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "email"]);
    }

    #[test]
    fn compile_rejects_empty_schema() {
        let err = Schema::compile("empty", DEFAULT_ENGINE, DEFAULT_VERSION, vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::MissingSchema { .. }));
    }

    #[test]
    fn compile_rejects_duplicate_field() {
        let err = Schema::compile(
            "dupes",
            DEFAULT_ENGINE,
            DEFAULT_VERSION,
            vec![
                ("id".to_string(), Field::id().into()),
                ("id".to_string(), Field::number().into()),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn unique_field_derives_key() {
        let schema = user_schema();
        assert_eq!(schema.keys.len(), 1);
        let key = &schema.keys[0];
        assert_eq!(key.kind, KeyKind::Unique);
        assert_eq!(key.name, "email");
        assert_eq!(key.columns[0].prefix, Some(128));
    }

    #[test]
    fn foreign_field_derives_index_and_constraint() {
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
                ("stuff_id".to_string(), Field::foreign(&stuff).into()),
            ],
        )
        .unwrap();

        assert_eq!(schema.keys.len(), 1);
        assert_eq!(schema.keys[0].name, "stuff_fkey");
        assert_eq!(schema.keys[0].kind, KeyKind::Index);

        assert_eq!(schema.foreign_clauses.len(), 1);
        let clause = &schema.foreign_clauses[0];
        assert_eq!(clause.constraint, "user_ibfk_1");
        assert_eq!(clause.column, "stuff_id");
        assert_eq!(clause.references_table, "stuff");
        assert_eq!(clause.references_column, "id");

        // Column typed to match the referenced primary key.
        let spec = schema.field("stuff_id").unwrap();
        assert_eq!(spec.sql_type, Some(SqlType::BigInt));
    }

    #[test]
    fn primary_key_lookup() {
        let schema = user_schema();
        assert_eq!(schema.id_column(), "id");
        let (name, spec) = schema.primary_key().unwrap();
        assert_eq!(name, "id");
        assert!(spec.auto_increment);
    }
}
