//! Tear down the analytic warehouse: delete the cluster and the identity
//! role, best effort, and report what happened to each.

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt};

use warehouse::config::WarehouseSettings;
use warehouse::domain::ClusterLifecycle;
use warehouse::outbound::{
    AccessKeyPair, AwsClients, Ec2NetworkApi, IamIdentityApi, RedshiftClusterApi,
};

/// `teardown-warehouse` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "teardown-warehouse",
    about = "Delete the analytic cluster and its identity role",
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
    let keys = AccessKeyPair::from_env()?;
    let clients = AwsClients::connect(&keys, settings.region()).await?;

    let lifecycle = ClusterLifecycle::new(
        Arc::new(RedshiftClusterApi::new(clients.redshift)),
        Arc::new(Ec2NetworkApi::new(clients.ec2)),
        Arc::new(IamIdentityApi::new(clients.iam)),
    );
    let report = lifecycle
        .teardown(settings.cluster_identifier(), &settings.role_spec())
        .await;

    println!("cluster={:?}", report.cluster);
    println!("role={:?}", report.role);
    if report.is_clean() {
        Ok(())
    } else {
        Err(eyre!(
            "teardown left resources behind; rerun after checking the log"
        ))
    }
}
