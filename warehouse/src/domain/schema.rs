//! Schema reset: drop everything, then recreate it.
//!
//! Every statement runs as its own committed unit of work, so a failure
//! leaves prior statements applied. Drops are `IF EXISTS`-guarded, which
//! makes the reset idempotent: running it twice produces the same final
//! schema as running it once, and a fresh database is valid input.

use tracing::info;

use crate::domain::ports::{SqlSession, SqlSessionError};
use crate::domain::statements::SchemaCatalog;

/// Errors raised during a schema reset, tagged with the failing statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A drop statement failed; the remaining drops were not attempted.
    #[error("schema drop '{name}' failed: {source}")]
    Drop {
        /// Statement label.
        name: &'static str,
        /// Underlying execution failure.
        #[source]
        source: SqlSessionError,
    },
    /// A create statement failed; the remaining creates were not attempted.
    #[error("schema create '{name}' failed: {source}")]
    Create {
        /// Statement label.
        name: &'static str,
        /// Underlying execution failure.
        #[source]
        source: SqlSessionError,
    },
}

/// Resets the staging and dimensional relations from a statement catalog.
#[derive(Debug, Clone, Copy)]
pub struct SchemaManager {
    catalog: SchemaCatalog,
}

impl SchemaManager {
    /// Build a manager over a statement catalog.
    #[must_use]
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Drop all relations, then create them again.
    ///
    /// All drops fully precede all creates; within each phase statements run
    /// in declaration order. A statement failure aborts the remainder of its
    /// phase.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the statement that failed.
    pub async fn reset<S: SqlSession>(&self, session: &mut S) -> Result<(), SchemaError> {
        for statement in self.catalog.drop_statements() {
            info!(statement = statement.name, "dropping relation");
            session
                .execute(&statement)
                .await
                .map_err(|source| SchemaError::Drop {
                    name: statement.name,
                    source,
                })?;
        }
        for statement in self.catalog.create_statements() {
            info!(statement = statement.name, "creating relation");
            session
                .execute(&statement)
                .await
                .map_err(|source| SchemaError::Create {
                    name: statement.name,
                    source,
                })?;
        }
        Ok(())
    }
}
