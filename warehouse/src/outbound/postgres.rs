//! PostgreSQL-protocol adapter for the SQL session port.
//!
//! The warehouse endpoint speaks the PostgreSQL wire protocol, so one
//! `tokio-postgres` connection serves every statement in a run. Statements
//! execute over the simple query protocol, since bulk-load statements
//! cannot be prepared, and each call commits on its own, which is exactly the
//! session port's unit-of-work contract. Dropping the session closes the
//! connection; [`PgSession::close`] does so explicitly and waits for the
//! connection task to finish.

use async_trait::async_trait;
use tokio_postgres::NoTls;
use tracing::warn;

use crate::domain::ports::{SqlSession, SqlSessionError, Statement};

/// Connection parameters for the warehouse database.
#[derive(Debug, Clone)]
pub struct PgSessionConfig {
    /// Endpoint host.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// Database name.
    pub dbname: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

/// One long-lived database session.
pub struct PgSession {
    client: tokio_postgres::Client,
    connection: tokio::task::JoinHandle<()>,
}

impl PgSession {
    /// Connect with explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SqlSessionError::Connection`] when the endpoint is
    /// unreachable or rejects the credentials.
    pub async fn connect(config: &PgSessionConfig) -> Result<Self, SqlSessionError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(&config.password);
        Self::connect_with(pg_config).await
    }

    /// Connect with a `postgresql://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`SqlSessionError::Connection`] for malformed URLs and
    /// connection failures.
    pub async fn connect_url(url: &str) -> Result<Self, SqlSessionError> {
        let pg_config: tokio_postgres::Config = url
            .parse()
            .map_err(|error: tokio_postgres::Error| {
                SqlSessionError::connection(error.to_string())
            })?;
        Self::connect_with(pg_config).await
    }

    async fn connect_with(pg_config: tokio_postgres::Config) -> Result<Self, SqlSessionError> {
        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|error| SqlSessionError::connection(error.to_string()))?;
        let connection = tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(%error, "database connection closed with error");
            }
        });
        Ok(Self { client, connection })
    }

    /// Close the connection and wait for the connection task to finish.
    pub async fn close(self) {
        drop(self.client);
        // The task ends once the client half is gone; its outcome has
        // already been logged.
        drop(self.connection.await);
    }
}

#[async_trait]
impl SqlSession for PgSession {
    async fn execute(&mut self, statement: &Statement) -> Result<(), SqlSessionError> {
        self.client
            .batch_execute(&statement.sql)
            .await
            .map_err(|error| {
                SqlSessionError::execution(format!("{}: {error}", statement.name))
            })
    }
}
