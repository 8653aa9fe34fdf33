//! Driven port for SQL execution against the warehouse database.
//!
//! The session models the pipeline's unit-of-work contract: every call to
//! [`SqlSession::execute`] runs exactly one statement and commits it before
//! returning. There is no cross-statement transaction: a failed run leaves
//! whatever the committed statements produced, and the next full reset and
//! reload corrects it.

use std::fmt;

use async_trait::async_trait;

use super::define_port_error;

/// A named SQL statement ready for execution.
///
/// The name is a stable label for diagnostics; the text is the complete
/// statement. Statements carry no bind parameters; everything the catalog
/// produces is either static text or built from validated, escaped literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Diagnostic label, for example `create users`.
    pub name: &'static str,
    /// Full statement text.
    pub sql: String,
}

impl Statement {
    /// Build a statement from a label and its text.
    #[must_use]
    pub fn new(name: &'static str, sql: impl Into<String>) -> Self {
        Self {
            name,
            sql: sql.into(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

define_port_error! {
    /// Errors raised while executing a statement.
    pub enum SqlSessionError {
        /// The connection could not be established or was lost.
        Connection { message: String } =>
            "database connection failed: {message}",
        /// The database rejected the statement.
        Execution { message: String } =>
            "statement execution failed: {message}",
    }
}

/// Port for running statements over one long-lived database connection.
#[async_trait]
pub trait SqlSession: Send {
    /// Execute one statement as its own committed unit of work.
    async fn execute(&mut self, statement: &Statement) -> Result<(), SqlSessionError>;
}
