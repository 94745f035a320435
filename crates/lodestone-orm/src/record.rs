//! Record instances.
//!
//! A [`Record`] is one row's worth of attributes bound to a compiled
//! [`Model`]. Reads pass through the field's getter transform, writes
//! through its setter; `save` runs the validator chain, serializes
//! document fields, and issues the INSERT or UPDATE.

use tracing::debug;

use lodestone_core::ddl::quote;
use lodestone_core::{Attributes, Client, ColumnSpec, Invalid, Row, Value};

use crate::error::{OrmError, Result, ValidationErrors};
use crate::model::Model;

/// Serializes a value to its storage form: documents become their
/// canonical JSON text, scalars pass through.
pub(crate) fn storage_value(spec: &ColumnSpec, value: &Value) -> Value {
    match value {
        Value::Document(doc) if spec.document => Value::Text(doc.to_string()),
        other => other.clone(),
    }
}

/// Inverse of [`storage_value`]: parses a document field's stored text
/// back into its structured form. Unparseable text is kept as-is.
fn revive_value(spec: &ColumnSpec, value: &Value) -> Value {
    match value {
        Value::Text(text) if spec.document => serde_json::from_str(text)
            .map(Value::Document)
            .unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// An instance of a declared record type.
#[derive(Debug, Clone)]
pub struct Record {
    model: Model,
    attributes: Attributes,
}

impl Record {
    /// Builds a record, keeping only schema-declared fields.
    pub(crate) fn new(model: Model, attributes: Attributes) -> Self {
        let attributes = attributes
            .into_iter()
            .filter(|(name, _)| model.schema().has_field(name))
            .collect();
        Self { model, attributes }
    }

    /// Builds a record from a stored row, deserializing document fields.
    pub(crate) fn hydrate(model: Model, row: Row) -> Self {
        let record = Self::new(model, row);
        let attributes = record.demutate(&record.attributes);
        Self {
            model: record.model,
            attributes,
        }
    }

    /// The model this record belongs to.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The raw attribute store.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Reads a field, applying its getter transform if one is declared.
    /// The transform is pure; stored state is untouched.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        let value = self.attributes.get(field)?;
        match self.model.schema().field(field).and_then(|s| s.getter.as_ref()) {
            Some(getter) => Some(getter(value)),
            None => Some(value.clone()),
        }
    }

    /// Writes a field. A declared setter receives the attribute store and
    /// the incoming value and writes the derived value itself; otherwise
    /// the raw value is stored as-is. Unknown fields are ignored.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        let Some(spec) = self.model.schema().field(field) else {
            return;
        };
        match spec.setter.clone() {
            Some(setter) => setter(&mut self.attributes, value.into()),
            None => {
                self.attributes.insert(field.to_string(), value.into());
            }
        }
    }

    /// The record's identifier, when assigned.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.attributes
            .get(self.model.schema().id_column())
            .and_then(Value::as_int)
    }

    /// Runs every field's validator chain in declaration order.
    ///
    /// A required-field check runs first and short-circuits the rest of
    /// that field's chain; otherwise the first failing validator stops the
    /// chain for that field while other fields are still checked. Returns
    /// `None` when everything passed.
    #[must_use]
    pub fn validate(&self) -> Option<ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for (name, spec) in &self.model.schema().fields {
            let value = self.attributes.get(name);
            let missing = value.is_none() || value.is_some_and(Value::is_null);

            if spec.required && missing {
                errors.0.insert(
                    name.clone(),
                    Invalid::new("required", format!("{name} is required")),
                );
                continue;
            }
            let Some(value) = value else { continue };

            for validator in &spec.validators {
                if let Some(failure) = validator(value) {
                    errors.0.insert(name.clone(), failure);
                    break;
                }
            }
        }

        if errors.is_empty() {
            None
        } else {
            Some(errors)
        }
    }

    /// Produces the storage-ready attribute mapping: document fields
    /// serialized to JSON text, scalars unchanged.
    #[must_use]
    pub fn mutate(&self) -> Attributes {
        self.model
            .schema()
            .fields
            .iter()
            .filter_map(|(name, spec)| {
                self.attributes
                    .get(name)
                    .map(|value| (name.clone(), storage_value(spec, value)))
            })
            .collect()
    }

    /// Inverse of [`Record::mutate`] for document fields.
    #[must_use]
    pub fn demutate(&self, stored: &Attributes) -> Attributes {
        self.model
            .schema()
            .fields
            .iter()
            .filter_map(|(name, spec)| {
                stored
                    .get(name)
                    .map(|value| (name.clone(), revive_value(spec, value)))
            })
            .collect()
    }

    /// Validates, serializes, and persists this record.
    ///
    /// Validation failures abort before the store is reached. An instance
    /// without an identifier is INSERTed and assigned the store-generated
    /// id; one with an identifier is UPDATEd in place.
    pub async fn save<C: Client>(&mut self, client: &C) -> Result<()> {
        if let Some(errors) = self.validate() {
            return Err(OrmError::Validation(errors));
        }

        let stored = self.mutate();
        let schema = self.model.schema();
        let table = schema.table.clone();
        let id_column = schema.id_column().to_string();

        // Fields in declaration order, identifier excluded.
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (name, _) in &schema.fields {
            if name == &id_column {
                continue;
            }
            if let Some(value) = stored.get(name) {
                columns.push(quote(name));
                params.push(value.clone());
            }
        }

        match self.id() {
            Some(id) => {
                if columns.is_empty() {
                    return Ok(());
                }
                let assignments: Vec<String> =
                    columns.iter().map(|c| format!("{c} = ?")).collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = ?",
                    quote(&table),
                    assignments.join(", "),
                    quote(&id_column),
                );
                params.push(Value::Int(id));
                debug!(table = %table, id, "updating record");
                client.query(&sql, &params).await?;
            }
            None => {
                let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote(&table),
                    columns.join(", "),
                    placeholders.join(", "),
                );
                debug!(table = %table, "inserting record");
                let out = client.query(&sql, &params).await?;
                if let Some(id) = out.last_insert_id {
                    self.attributes.insert(id_column, Value::Int(id));
                }
            }
        }

        Ok(())
    }
}
