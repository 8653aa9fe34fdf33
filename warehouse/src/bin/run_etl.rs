//! Run the staged ETL pipeline: bulk-load the staging relations from object
//! storage, then transform them into the dimensional schema.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt};

use warehouse::config::WarehouseSettings;
use warehouse::domain::{
    Dialect, EtlPipeline, SchemaCatalog, copy_staging_events, copy_staging_songs,
};
use warehouse::outbound::{PgSession, PgSessionConfig};

/// `run-etl` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "run-etl",
    about = "Bulk-load staging data and populate the dimensional schema",
    version
)]
struct CliArgs {
    /// Only run the staging loads, skipping the transforms.
    #[arg(long = "load-only", conflicts_with = "transform_only")]
    load_only: bool,
    /// Only run the transforms, assuming staging is already loaded.
    #[arg(long = "transform-only", conflicts_with = "load_only")]
    transform_only: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {error}");
    }
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = WarehouseSettings::from_env().wrap_err("failed to load settings")?;
    let role_arn = settings.role_arn()?.to_owned();
    let events = settings.events_source()?;
    let jsonpaths = settings.events_jsonpaths()?;
    let songs = settings.songs_source()?;

    let pipeline = EtlPipeline::new(
        vec![
            copy_staging_events(&events, &jsonpaths, &role_arn, settings.region()),
            copy_staging_songs(&songs, &role_arn, settings.region()),
        ],
        SchemaCatalog::new(Dialect::Redshift).transform_statements(),
    );

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

    let result = if args.load_only {
        pipeline.load_staging(&mut session).await
    } else if args.transform_only {
        pipeline.transform(&mut session).await
    } else {
        pipeline.run(&mut session).await
    };
    session.close().await;
    result.wrap_err("pipeline run failed")?;

    println!("pipeline=complete");
    Ok(())
}
