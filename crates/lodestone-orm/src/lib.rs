//! # lodestone-orm
//!
//! The record lifecycle for lodestone: compiled model descriptors, record
//! instances with getter/setter transforms and a validator chain,
//! document-field serialization, persistence, and the find family, plus
//! per-table schema-version bookkeeping in a shared metadata table.
//!
//! ```no_run
//! use lodestone_core::{Attributes, Field, Value};
//! use lodestone_orm::Model;
//!
//! # async fn example(client: &impl lodestone_core::Client) -> lodestone_orm::Result<()> {
//! let user = Model::builder("user")
//!     .field("id", Field::id())
//!     .field("email", Field::text().unique_prefix(128).required())
//!     .build()?;
//!
//! user.make_table(client).await?;
//!
//! let mut attrs = Attributes::new();
//! attrs.insert("email".to_string(), Value::text("brian@example.com"));
//! let mut record = user.record(attrs);
//! record.save(client).await?;
//!
//! let found = user.find_by_id(client, record.id().unwrap()).await?;
//! # let _ = found;
//! # Ok(())
//! # }
//! ```

mod error;
mod model;
mod record;
pub mod version;

pub use error::{OrmError, Result, ValidationErrors};
pub use model::{Model, ModelBuilder};
pub use record::Record;
pub use version::SCHEMA_TABLE;

#[cfg(test)]
mod tests {
    use super::*;
    use lodestone_core::{Attributes, Field, SchemaError, Value};
    use lodestone_testkit::MemoryClient;

    fn model(table: &str) -> Model {
        Model::builder(table)
            .field("id", Field::id())
            .field("email", Field::string())
            .field("eggs", Field::string())
            .field("drop", Field::string())
            .build()
            .unwrap()
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::text(*v)))
            .collect()
    }

    #[test]
    fn missing_schema_fails_to_build() {
        let err = Model::builder("nothing").build().unwrap_err();
        assert!(matches!(
            err,
            OrmError::Schema(SchemaError::MissingSchema { .. })
        ));
    }

    async fn seeded(client: &MemoryClient) -> Model {
        let m = model("findtest");
        m.make_table(client).await.unwrap();

        let mut x = m.record(attrs(&[("email", "hey"), ("drop", "what")]));
        let mut y = m.record(attrs(&[("email", "yo"), ("other", "garbage")]));
        let mut z = m.record(attrs(&[("email", "sup"), ("eggs", "lots")]));

        x.save(client).await.unwrap();
        x.set("drop", "yeah");
        x.save(client).await.unwrap();
        y.save(client).await.unwrap();
        z.save(client).await.unwrap();
        m
    }

    #[tokio::test]
    async fn find_matches_exactly_one_row_with_latest_values() {
        let client = MemoryClient::new();
        let m = seeded(&client).await;

        let results = m.find(&client, attrs(&[("email", "hey")])).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("email"), Some(Value::text("hey")));
        assert_eq!(results[0].get("drop"), Some(Value::text("yeah")));
    }

    #[tokio::test]
    async fn find_ands_all_pairs() {
        let client = MemoryClient::new();
        let m = seeded(&client).await;

        let results = m
            .find(&client, attrs(&[("email", "sup"), ("eggs", "lots")]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("email"), Some(Value::text("sup")));
    }

    #[tokio::test]
    async fn find_one_and_find_by_id() {
        let client = MemoryClient::new();
        let m = seeded(&client).await;

        let one = m
            .find_one(&client, attrs(&[("email", "yo")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one.get("email"), Some(Value::text("yo")));

        let first = m.find_by_id(&client, 1).await.unwrap().unwrap();
        assert_eq!(first.get("email"), Some(Value::text("hey")));

        assert!(m.find_by_id(&client, 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_ignores_undeclared_filter_keys() {
        let client = MemoryClient::new();
        let m = seeded(&client).await;

        // The declared pair still filters; the unknown key adds nothing.
        let results = m
            .find(&client, attrs(&[("email", "yo"), ("bogus", "x")]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("email"), Some(Value::text("yo")));

        // Only unknown keys: no predicates, so every row matches.
        let results = m.find(&client, attrs(&[("bogus", "x")])).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn find_all_returns_everything() {
        let client = MemoryClient::new();
        let m = seeded(&client).await;

        let all = m.find_all(&client).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].get("email"), Some(Value::text("hey")));
    }

    #[tokio::test]
    async fn schema_version_defaults_to_0000() {
        let client = MemoryClient::new();
        let m = Model::builder("schema_ver_test")
            .field("id", Field::id())
            .field("name", Field::string())
            .build()
            .unwrap();

        m.update_schema_version(&client, None).await.unwrap();
        assert_eq!(
            m.get_schema_version(&client).await.unwrap().as_deref(),
            Some("0000")
        );
    }

    #[tokio::test]
    async fn schema_version_uses_the_declared_label() {
        let client = MemoryClient::new();
        let m = Model::builder("schema_ver_specific")
            .version("0621")
            .field("id", Field::id())
            .field("name", Field::string())
            .build()
            .unwrap();

        m.update_schema_version(&client, None).await.unwrap();
        assert_eq!(
            m.get_schema_version(&client).await.unwrap().as_deref(),
            Some("0621")
        );
    }

    #[tokio::test]
    async fn schema_version_can_be_passed_explicitly() {
        let client = MemoryClient::new();
        let m = Model::builder("schema_ver_passed_in")
            .field("id", Field::id())
            .field("name", Field::string())
            .build()
            .unwrap();

        m.update_schema_version(&client, Some("1234")).await.unwrap();
        assert_eq!(
            m.get_schema_version(&client).await.unwrap().as_deref(),
            Some("1234")
        );
    }

    #[tokio::test]
    async fn schema_version_absent_for_an_unmanaged_table() {
        let client = MemoryClient::new();
        let m = Model::builder("schema_ver_untouched")
            .field("id", Field::id())
            .build()
            .unwrap();

        // Never written: absent, not the default label.
        assert_eq!(m.get_schema_version(&client).await.unwrap(), None);
    }
}
