//! In-memory session fake for exercising statement-driven services.

use async_trait::async_trait;

use crate::domain::ports::{SqlSession, SqlSessionError, Statement};

/// Session fake that records executed statement names and can be primed to
/// fail on a specific statement.
#[derive(Debug, Default)]
pub struct RecordingSession {
    /// Names of statements executed so far, in order.
    pub executed: Vec<&'static str>,
    /// Statement name that should fail when executed.
    pub fail_on: Option<&'static str>,
}

impl RecordingSession {
    /// A session that executes everything successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that fails when the named statement is executed.
    pub fn failing_on(name: &'static str) -> Self {
        Self {
            executed: Vec::new(),
            fail_on: Some(name),
        }
    }
}

#[async_trait]
impl SqlSession for RecordingSession {
    async fn execute(&mut self, statement: &Statement) -> Result<(), SqlSessionError> {
        if self.fail_on == Some(statement.name) {
            return Err(SqlSessionError::execution(format!(
                "primed failure for '{}'",
                statement.name
            )));
        }
        self.executed.push(statement.name);
        Ok(())
    }
}
