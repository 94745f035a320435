//! The migration runner.
//!
//! A [`Migration`] owns a named, ordered set of changesets for one model's
//! table. Each changeset's `up`/`down` procedure runs against a
//! [`MutationHandle`] that records mutations; the runner then expands the
//! recorded steps through the DDL generator and executes them strictly
//! sequentially, halting on the first failure. Only a fully successful run
//! touches the schema-version row.

use tracing::{debug, info};

use lodestone_core::ddl::{self, Alteration};
use lodestone_core::{Client, FieldDecl};
use lodestone_orm::{version, Model};

use crate::error::{MigrateError, Result};

/// One recorded mutation.
#[derive(Debug)]
enum Step {
    AddColumn(String, FieldDecl),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    Sql(String),
}

/// Records the mutations a changeset procedure requests.
#[derive(Debug, Default)]
pub struct MutationHandle {
    steps: Vec<Step>,
}

impl MutationHandle {
    /// Records a column addition.
    pub fn add_column(&mut self, field: impl Into<String>, decl: impl Into<FieldDecl>) {
        self.steps.push(Step::AddColumn(field.into(), decl.into()));
    }

    /// Records a column drop.
    pub fn drop_column(&mut self, field: impl Into<String>) {
        self.steps.push(Step::DropColumn(field.into()));
    }

    /// Records a column rename. The column's type is preserved.
    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.steps.push(Step::RenameColumn {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Records a raw SQL passthrough.
    pub fn execute_sql(&mut self, sql: impl Into<String>) {
        self.steps.push(Step::Sql(sql.into()));
    }

    /// Expands the recorded steps into statement text for a table.
    fn into_statements(self, table: &str) -> Vec<String> {
        let mut statements = Vec::new();
        for step in self.steps {
            match step {
                Step::AddColumn(field, decl) => {
                    statements.extend(ddl::alter(table, &Alteration::AddColumns(vec![(field, decl)])));
                }
                Step::DropColumn(field) => {
                    statements.extend(ddl::alter(table, &Alteration::DropColumns(vec![field])));
                }
                Step::RenameColumn { from, to } => {
                    statements.extend(ddl::alter(table, &Alteration::RenameColumn { from, to }));
                }
                Step::Sql(sql) => statements.push(sql),
            }
        }
        statements
    }
}

type ChangeProc = Box<dyn Fn(&mut MutationHandle) + Send + Sync>;

/// A named pair of forward and backward procedures.
pub struct Changeset {
    label: String,
    up: ChangeProc,
    down: ChangeProc,
}

impl Changeset {
    /// Declares a changeset.
    pub fn new(
        label: impl Into<String>,
        up: impl Fn(&mut MutationHandle) + Send + Sync + 'static,
        down: impl Fn(&mut MutationHandle) + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            up: Box::new(up),
            down: Box::new(down),
        }
    }

    /// The changeset's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Changeset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Changeset").field("label", &self.label).finish()
    }
}

/// A migration runner bound to one model's table.
///
/// Labels are opaque; the only ordering is declaration order, and
/// reverting always restores the schema's declared/default version, never
/// an intermediate label.
#[derive(Debug)]
pub struct Migration {
    model: Model,
    sets: Vec<Changeset>,
}

impl Migration {
    /// Creates a runner with no changesets (useful for the direct
    /// mutation helpers and SQL inspection).
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            model,
            sets: Vec::new(),
        }
    }

    /// Appends a changeset, preserving declaration order.
    #[must_use]
    pub fn changeset(mut self, set: Changeset) -> Self {
        self.sets.push(set);
        self
    }

    /// The model this runner mutates.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Generates the statements for an alteration without executing them.
    #[must_use]
    pub fn get_alter_sql(&self, alteration: &Alteration) -> Vec<String> {
        ddl::alter(self.model.table(), alteration)
    }

    /// Adds a column immediately (with any unique/foreign follow-ups).
    pub async fn add_column<C: Client>(
        &self,
        client: &C,
        field: impl Into<String>,
        decl: impl Into<FieldDecl>,
    ) -> Result<()> {
        let statements =
            self.get_alter_sql(&Alteration::add_column(field.into(), decl.into()));
        self.run_statements(client, statements).await
    }

    /// Drops a column immediately.
    pub async fn drop_column<C: Client>(&self, client: &C, field: &str) -> Result<()> {
        let statements = self.get_alter_sql(&Alteration::drop_column(field));
        self.run_statements(client, statements).await
    }

    /// Renames a column immediately, preserving its type.
    pub async fn rename_column<C: Client>(&self, client: &C, from: &str, to: &str) -> Result<()> {
        let statements = self.get_alter_sql(&Alteration::RenameColumn {
            from: from.to_string(),
            to: to.to_string(),
        });
        self.run_statements(client, statements).await
    }

    /// Executes raw SQL immediately.
    pub async fn execute_sql<C: Client>(&self, client: &C, sql: &str) -> Result<()> {
        self.run_statements(client, vec![sql.to_string()]).await
    }

    /// Applies the changeset with the given label.
    ///
    /// On success the table's schema version becomes `label`. On the first
    /// failing step, execution stops, the version row is untouched, and
    /// already-executed steps remain applied.
    pub async fn up<C: Client>(&self, label: &str, client: &C) -> Result<()> {
        let set = self.lookup(label)?;
        info!(table = %self.model.table(), label, "applying migration");

        let mut handle = MutationHandle::default();
        (set.up)(&mut handle);
        self.run_statements(client, handle.into_statements(self.model.table()))
            .await?;

        version::write_version(client, self.model.table(), label).await?;
        info!(table = %self.model.table(), label, "migration applied");
        Ok(())
    }

    /// Reverts the changeset with the given label.
    ///
    /// On success the table's schema version is restored to the schema's
    /// declared/default version.
    pub async fn down<C: Client>(&self, label: &str, client: &C) -> Result<()> {
        let set = self.lookup(label)?;
        info!(table = %self.model.table(), label, "reverting migration");

        let mut handle = MutationHandle::default();
        (set.down)(&mut handle);
        self.run_statements(client, handle.into_statements(self.model.table()))
            .await?;

        let baseline = self.model.schema().version.clone();
        version::write_version(client, self.model.table(), &baseline).await?;
        info!(table = %self.model.table(), label, baseline = %baseline, "migration reverted");
        Ok(())
    }

    fn lookup(&self, label: &str) -> Result<&Changeset> {
        self.sets
            .iter()
            .find(|set| set.label == label)
            .ok_or_else(|| MigrateError::NotFound {
                label: label.to_string(),
            })
    }

    /// Executes statements strictly sequentially, halting on the first
    /// failure.
    async fn run_statements<C: Client>(&self, client: &C, statements: Vec<String>) -> Result<()> {
        for statement in statements {
            debug!(sql = %statement, "executing migration step");
            if let Err(source) = client.query(&statement, &[]).await {
                return Err(MigrateError::Step { statement, source });
            }
        }
        Ok(())
    }
}
