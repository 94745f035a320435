//! # lodestone-migrate
//!
//! Labelled schema migrations for lodestone models. A [`Migration`] is
//! bound to one model's table and carries an ordered set of [`Changeset`]s;
//! each changeset records its mutations against a [`MutationHandle`] and
//! the runner replays them as `ALTER TABLE` statements through the
//! injected client. Applying a changeset stamps its label into the shared
//! schema-version table; reverting restores the model's declared baseline.
//!
//! ```no_run
//! use lodestone_core::Field;
//! use lodestone_migrate::{Changeset, Migration};
//! use lodestone_orm::Model;
//!
//! # async fn example(client: &impl lodestone_core::Client) -> Result<(), Box<dyn std::error::Error>> {
//! let user = Model::builder("user").field("id", Field::id()).build()?;
//!
//! let migration = Migration::new(user).changeset(Changeset::new(
//!     "0001",
//!     |t| t.add_column("name", Field::string()),
//!     |t| t.drop_column("name"),
//! ));
//!
//! migration.up("0001", client).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod runner;

pub use error::{MigrateError, Result};
pub use runner::{Changeset, Migration, MutationHandle};
