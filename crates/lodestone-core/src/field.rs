//! Field declarations and the resolver that canonicalizes them.
//!
//! A field can be declared four ways: raw SQL text, an already-structured
//! [`ColumnSpec`], a generator invoked with the field name, or a
//! higher-order generator producing such a generator. [`resolve`] collapses
//! all four into a canonical [`ColumnSpec`] with one exhaustive match.

use std::sync::Arc;

use crate::schema::{ColumnSpec, ForeignSpec, Schema, SqlType};
use crate::value::{Attributes, Value};

/// Read transform: receives the stored raw value, returns the derived one.
/// Pure; never touches the attribute store.
pub type GetterFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Write transform: receives the attribute store and the incoming value and
/// is responsible for writing the derived value itself.
pub type SetterFn = Arc<dyn Fn(&mut Attributes, Value) + Send + Sync>;

/// Validator: receives the current value, returns a failure descriptor or
/// nothing.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Option<Invalid> + Send + Sync>;

/// Generator declaration: invoked once with the field name.
pub type GeneratorFn = Arc<dyn Fn(&str) -> ColumnSpec + Send + Sync>;

/// Higher-order generator declaration: invoked once to obtain the inner
/// generator, which is then invoked once with the field name.
pub type HigherOrderFn = Arc<dyn Fn() -> GeneratorFn + Send + Sync>;

/// A validation failure descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalid {
    /// Short machine-readable name of the failed check.
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl Invalid {
    /// Creates a failure descriptor.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A field declaration, before resolution.
#[derive(Clone)]
pub enum FieldDecl {
    /// Raw SQL column-definition text, emitted verbatim.
    Raw(String),
    /// Already-canonical structured spec; passes through unchanged.
    Structured(ColumnSpec),
    /// Generator invoked with the field name.
    Generator(GeneratorFn),
    /// Generator of a generator.
    HigherOrder(HigherOrderFn),
}

impl std::fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(sql) => f.debug_tuple("Raw").field(sql).finish(),
            Self::Structured(spec) => f.debug_tuple("Structured").field(spec).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
            Self::HigherOrder(_) => f.write_str("HigherOrder(..)"),
        }
    }
}

impl FieldDecl {
    /// Wraps a generator closure.
    pub fn generator(f: impl Fn(&str) -> ColumnSpec + Send + Sync + 'static) -> Self {
        Self::Generator(Arc::new(f))
    }

    /// Wraps a higher-order generator closure.
    pub fn higher_order(f: impl Fn() -> GeneratorFn + Send + Sync + 'static) -> Self {
        Self::HigherOrder(Arc::new(f))
    }
}

impl From<ColumnSpec> for FieldDecl {
    fn from(spec: ColumnSpec) -> Self {
        Self::Structured(spec)
    }
}

impl From<&str> for FieldDecl {
    fn from(sql: &str) -> Self {
        Self::Raw(sql.to_string())
    }
}

impl From<String> for FieldDecl {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

/// Resolves a declaration into a canonical column spec.
///
/// Raw text becomes the spec's verbatim SQL with no other attributes
/// inferred; structured specs pass through unchanged; generators are
/// invoked once with the field name; higher-order generators are invoked
/// once to obtain the inner generator, which is invoked once in turn.
#[must_use]
pub fn resolve(name: &str, decl: &FieldDecl) -> ColumnSpec {
    match decl {
        FieldDecl::Raw(sql) => ColumnSpec::raw(sql.clone()),
        FieldDecl::Structured(spec) => spec.clone(),
        FieldDecl::Generator(generate) => generate(name),
        FieldDecl::HigherOrder(outer) => {
            let inner = outer();
            inner(name)
        }
    }
}

/// Stock field constructors.
///
/// Each returns a [`ColumnSpec`] that converts into a
/// [`FieldDecl::Structured`]; chain builder methods for options:
///
/// ```
/// use lodestone_core::{Field, FieldDecl};
///
/// let decl: FieldDecl = Field::text().unique_prefix(128).required().into();
/// ```
pub struct Field;

impl Field {
    /// Auto-incrementing big-integer primary key.
    #[must_use]
    pub fn id() -> ColumnSpec {
        ColumnSpec::new(SqlType::BigInt).auto_increment().primary_key()
    }

    /// Text column (the stock "string" field).
    #[must_use]
    pub fn string() -> ColumnSpec {
        ColumnSpec::new(SqlType::Text)
    }

    /// Integer column.
    #[must_use]
    pub fn number() -> ColumnSpec {
        ColumnSpec::new(SqlType::Int)
    }

    /// Text column.
    #[must_use]
    pub fn text() -> ColumnSpec {
        ColumnSpec::new(SqlType::Text)
    }

    /// Variable-length character column.
    #[must_use]
    pub fn varchar(len: u32) -> ColumnSpec {
        ColumnSpec::new(SqlType::Varchar(len))
    }

    /// Fixed-length character column.
    #[must_use]
    pub fn char(len: u32) -> ColumnSpec {
        ColumnSpec::new(SqlType::Char(len))
    }

    /// Double-precision float column.
    #[must_use]
    pub fn double() -> ColumnSpec {
        ColumnSpec::new(SqlType::Double)
    }

    /// Enumeration column over a fixed value set.
    #[must_use]
    pub fn enumeration(values: impl IntoIterator<Item = impl Into<String>>) -> ColumnSpec {
        ColumnSpec::new(SqlType::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// Structured document column, serialized to JSON text for storage.
    #[must_use]
    pub fn document() -> ColumnSpec {
        ColumnSpec::new(SqlType::Text).document()
    }

    /// Reference to another record type's identifier.
    ///
    /// The column is typed to match the referenced schema's primary key
    /// (big integer when none is flagged).
    #[must_use]
    pub fn foreign(references: &Schema) -> ColumnSpec {
        let (column, sql_type) = references
            .primary_key()
            .map(|(name, spec)| {
                (
                    name.to_string(),
                    spec.sql_type.clone().unwrap_or(SqlType::BigInt),
                )
            })
            .unwrap_or_else(|| ("id".to_string(), SqlType::BigInt));

        ColumnSpec::new(sql_type.clone()).foreign(ForeignSpec {
            table: references.table.clone(),
            column,
            sql_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn raw_strings_resolve_verbatim() {
        let decl = FieldDecl::from("BIGINT AUTO_INCREMENT PRIMARY KEY");
        let spec = resolve("id", &decl);
        assert_eq!(spec.sql.as_deref(), Some("BIGINT AUTO_INCREMENT PRIMARY KEY"));
        assert_eq!(spec.sql_type, None);
        assert!(spec.unique.is_none());
    }

    #[test]
    fn structured_specs_pass_through() {
        let decl: FieldDecl = Field::text().unique_prefix(128).required().into();
        let spec = resolve("email", &decl);
        assert_eq!(spec.sql_type, Some(SqlType::Text));
        assert_eq!(spec.unique, Some(crate::schema::Unique::Prefix(128)));
        assert!(spec.required);
        assert!(spec.sql.is_none());
    }

    #[test]
    fn generators_receive_the_field_name() {
        let decl = FieldDecl::generator(|name| {
            assert_eq!(name, "beets");
            Field::number()
        });
        let spec = resolve("beets", &decl);
        assert_eq!(spec.sql_type, Some(SqlType::Int));
    }

    #[test]
    fn higher_order_invokes_outer_then_inner_once_each() {
        static OUTER: AtomicUsize = AtomicUsize::new(0);
        static INNER: AtomicUsize = AtomicUsize::new(0);

        let decl = FieldDecl::higher_order(|| {
            OUTER.fetch_add(1, Ordering::SeqCst);
            Arc::new(|name: &str| {
                // Outer must have run before the inner generator.
                assert_eq!(OUTER.load(Ordering::SeqCst), 1);
                INNER.fetch_add(1, Ordering::SeqCst);
                assert_eq!(name, "id");
                ColumnSpec::raw("ya")
            })
        });

        let spec = resolve("id", &decl);
        assert_eq!(spec.sql.as_deref(), Some("ya"));
        assert_eq!(OUTER.load(Ordering::SeqCst), 1);
        assert_eq!(INNER.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn enumeration_renders_value_set() {
        let spec = Field::enumeration(["one", "two"]);
        assert_eq!(
            spec.sql_type.unwrap().mysql_name(),
            "ENUM('one','two')"
        );
    }
}
