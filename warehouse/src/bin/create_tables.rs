//! Reset the warehouse schema: drop the staging and dimensional relations,
//! then recreate them. Safe to run repeatedly.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt};

use warehouse::config::WarehouseSettings;
use warehouse::domain::{Dialect, SchemaCatalog, SchemaManager};
use warehouse::outbound::{PgSession, PgSessionConfig};

/// `create-tables` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "create-tables",
    about = "Drop and recreate the staging and dimensional relations",
    version
)]
struct CliArgs {}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {error}");
    }
    let _args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build runtime")?;
    runtime.block_on(run())
}

async fn run() -> Result<()> {
    let settings = WarehouseSettings::from_env().wrap_err("failed to load settings")?;
    let session_config = PgSessionConfig {
        host: settings.db_host()?.to_owned(),
        port: settings.db_port(),
        dbname: settings.db_name().to_owned(),
        user: settings.db_user().to_owned(),
        password: settings.db_password()?.to_owned(),
    };
    let mut session = PgSession::connect(&session_config)
        .await
        .wrap_err("failed to connect to the warehouse database")?;

    let manager = SchemaManager::new(SchemaCatalog::new(Dialect::Redshift));
    let result = manager.reset(&mut session).await;
    session.close().await;
    result.wrap_err("schema reset failed")?;

    println!("schema=reset");
    Ok(())
}
