//! Model descriptors.
//!
//! A [`Model`] is the immutable compiled descriptor for one record type:
//! the compiled schema plus the query surface (make_table, the find family,
//! schema-version bookkeeping). It is produced by an explicit factory,
//! [`ModelBuilder`], and compiled exactly once — cloning a `Model` is a
//! cheap handle copy.

use std::sync::Arc;

use tracing::debug;

use lodestone_core::ddl::{self, quote};
use lodestone_core::schema::{DEFAULT_ENGINE, DEFAULT_VERSION};
use lodestone_core::{
    Attributes, Client, FieldDecl, GetterFn, Schema, SetterFn, Value, ValidatorFn,
};

use crate::error::Result;
use crate::record::Record;
use crate::version;

/// Factory for compiled model descriptors.
pub struct ModelBuilder {
    table: String,
    engine: String,
    version: String,
    fields: Vec<(String, FieldDecl)>,
    getters: Vec<(String, GetterFn)>,
    setters: Vec<(String, SetterFn)>,
    validators: Vec<(String, ValidatorFn)>,
}

impl ModelBuilder {
    fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            engine: DEFAULT_ENGINE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            fields: Vec::new(),
            getters: Vec::new(),
            setters: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Overrides the storage engine (default `InnoDB`).
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Declares the schema version label (default `"0000"`).
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declares a field. Declaration order is preserved.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, decl: impl Into<FieldDecl>) -> Self {
        self.fields.push((name.into(), decl.into()));
        self
    }

    /// Declares a read transform for a field. Takes effect only when the
    /// field exists in the schema.
    #[must_use]
    pub fn getter(
        mut self,
        field: impl Into<String>,
        f: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.getters.push((field.into(), Arc::new(f)));
        self
    }

    /// Declares a write transform for a field. The transform receives the
    /// attribute store and writes the derived value itself.
    #[must_use]
    pub fn setter(
        mut self,
        field: impl Into<String>,
        f: impl Fn(&mut Attributes, Value) + Send + Sync + 'static,
    ) -> Self {
        self.setters.push((field.into(), Arc::new(f)));
        self
    }

    /// Appends a validator to a field's chain, after any declared in the
    /// field spec itself.
    #[must_use]
    pub fn validator(
        mut self,
        field: impl Into<String>,
        f: impl Fn(&Value) -> Option<lodestone_core::Invalid> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push((field.into(), Arc::new(f)));
        self
    }

    /// Compiles the schema and freezes the descriptor.
    pub fn build(self) -> Result<Model> {
        let mut schema = Schema::compile(self.table, self.engine, self.version, self.fields)?;

        for (name, getter) in self.getters {
            if let Some((_, spec)) = schema.fields.iter_mut().find(|(f, _)| f == &name) {
                spec.getter = Some(getter);
            }
        }
        for (name, setter) in self.setters {
            if let Some((_, spec)) = schema.fields.iter_mut().find(|(f, _)| f == &name) {
                spec.setter = Some(setter);
            }
        }
        for (name, validator) in self.validators {
            if let Some((_, spec)) = schema.fields.iter_mut().find(|(f, _)| f == &name) {
                spec.validators.push(validator);
            }
        }

        Ok(Model {
            schema: Arc::new(schema),
        })
    }
}

/// An immutable compiled record type descriptor.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<Schema>,
}

impl Model {
    /// Starts declaring a model mapped to the given table.
    #[must_use]
    pub fn builder(table: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(table)
    }

    /// The compiled schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.schema.table
    }

    /// Creates a record instance from an attribute mapping. Keys not
    /// declared in the schema are silently dropped.
    #[must_use]
    pub fn record(&self, attributes: Attributes) -> Record {
        Record::new(self.clone(), attributes)
    }

    /// Creates the model's table.
    pub async fn make_table<C: Client>(&self, client: &C) -> Result<()> {
        let sql = ddl::create_table(&self.schema);
        debug!(table = %self.schema.table, "creating table");
        client.query(&sql, &[]).await?;
        Ok(())
    }

    /// Finds all records whose attributes exactly match the filter
    /// (pairs ANDed).
    ///
    /// Filter keys not declared in the schema contribute no predicate, the
    /// same way a record constructor drops unknown attributes; a filter
    /// holding only unknown keys therefore matches every row.
    pub async fn find<C: Client>(&self, client: &C, filter: Attributes) -> Result<Vec<Record>> {
        self.select(client, &filter, false).await
    }

    /// Finds the first record matching the filter.
    pub async fn find_one<C: Client>(
        &self,
        client: &C,
        filter: Attributes,
    ) -> Result<Option<Record>> {
        let mut records = self.select(client, &filter, true).await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.remove(0))
        })
    }

    /// Finds a record by identifier.
    pub async fn find_by_id<C: Client>(&self, client: &C, id: i64) -> Result<Option<Record>> {
        let id_column = self.schema.id_column().to_string();
        let mut filter = Attributes::new();
        filter.insert(id_column, Value::Int(id));
        self.find_one(client, filter).await
    }

    /// Returns every record in the table.
    pub async fn find_all<C: Client>(&self, client: &C) -> Result<Vec<Record>> {
        self.select(client, &Attributes::new(), false).await
    }

    async fn select<C: Client>(
        &self,
        client: &C,
        filter: &Attributes,
        limit_one: bool,
    ) -> Result<Vec<Record>> {
        let mut sql = format!("SELECT * FROM {}", quote(&self.schema.table));
        let mut params = Vec::new();

        // Predicate order follows field declaration order so statement
        // text is deterministic.
        let mut predicates = Vec::new();
        for (name, spec) in &self.schema.fields {
            if let Some(value) = filter.get(name) {
                predicates.push(format!("{} = ?", quote(name)));
                params.push(crate::record::storage_value(spec, value));
            }
        }
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        if limit_one {
            sql.push_str(" LIMIT 1");
        }

        let out = client.query(&sql, &params).await?;
        Ok(out
            .rows
            .into_iter()
            .map(|row| Record::hydrate(self.clone(), row))
            .collect())
    }

    /// Writes this table's schema version: the given label, or the
    /// schema's declared/default version when absent.
    pub async fn update_schema_version<C: Client>(
        &self,
        client: &C,
        label: Option<&str>,
    ) -> Result<()> {
        let version = label.unwrap_or(&self.schema.version);
        version::write_version(client, &self.schema.table, version).await?;
        Ok(())
    }

    /// Reads this table's schema version; `None` when never written.
    pub async fn get_schema_version<C: Client>(&self, client: &C) -> Result<Option<String>> {
        Ok(version::read_version(client, &self.schema.table).await?)
    }
}
