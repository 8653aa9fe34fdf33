//! Staged ETL: bulk-load the staging relations, then transform them into
//! the dimensional schema.
//!
//! Phases are strictly ordered: every load commits before the first
//! transform runs. Statements inside the load phase have no join
//! dependency on each other; their order is fixed only for reproducibility.
//! There is no retry and no cross-phase rollback: a failed run leaves a
//! partially populated schema that the next full reset-and-reload corrects.

use tracing::info;

use crate::domain::ports::{SqlSession, SqlSessionError, Statement};

/// Errors raised by a pipeline run, tagged with the phase and statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A staging load failed; the remaining loads were not attempted.
    #[error("staging load '{name}' failed: {source}")]
    Load {
        /// Statement label.
        name: &'static str,
        /// Underlying execution failure.
        #[source]
        source: SqlSessionError,
    },
    /// A transform failed; the remaining transforms were not attempted.
    #[error("transform '{name}' failed: {source}")]
    Transform {
        /// Statement label.
        name: &'static str,
        /// Underlying execution failure.
        #[source]
        source: SqlSessionError,
    },
}

/// Executes the staged load-then-transform pipeline.
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    loads: Vec<Statement>,
    transforms: Vec<Statement>,
}

impl EtlPipeline {
    /// Build a pipeline from bulk-load statements and transform statements.
    #[must_use]
    pub fn new(loads: Vec<Statement>, transforms: Vec<Statement>) -> Self {
        Self { loads, transforms }
    }

    /// Bulk-load the staging relations, one committed statement each.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] naming the statement that failed.
    pub async fn load_staging<S: SqlSession>(&self, session: &mut S) -> Result<(), PipelineError> {
        for statement in &self.loads {
            info!(statement = statement.name, "loading staging relation");
            session
                .execute(statement)
                .await
                .map_err(|source| PipelineError::Load {
                    name: statement.name,
                    source,
                })?;
        }
        Ok(())
    }

    /// Populate the dimensional schema from the staging relations.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Transform`] naming the statement that
    /// failed.
    pub async fn transform<S: SqlSession>(&self, session: &mut S) -> Result<(), PipelineError> {
        for statement in &self.transforms {
            info!(statement = statement.name, "running transform");
            session
                .execute(statement)
                .await
                .map_err(|source| PipelineError::Transform {
                    name: statement.name,
                    source,
                })?;
        }
        Ok(())
    }

    /// Run both phases: every load commits before the first transform.
    ///
    /// # Errors
    ///
    /// Propagates the first [`PipelineError`] encountered.
    pub async fn run<S: SqlSession>(&self, session: &mut S) -> Result<(), PipelineError> {
        self.load_staging(session).await?;
        self.transform(session).await
    }
}
