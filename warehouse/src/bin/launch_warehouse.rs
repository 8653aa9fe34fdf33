//! Provision the analytic warehouse end to end: identity role, cluster,
//! readiness wait, and inbound network access.
//!
//! If the cluster never becomes ready, a best-effort teardown runs before
//! the error is reported so no billable resources outlive the failed
//! launch. Ctrl-C cancels the readiness wait at the next poll tick.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use warehouse::config::{SettingsError, WarehouseSettings};
use warehouse::domain::ports::ObjectStore;
use warehouse::domain::{
    CancelFlag, ClusterLifecycle, PollPolicy, RoleProvisioner,
};
use warehouse::outbound::{
    AccessKeyPair, AwsClients, Ec2NetworkApi, IamIdentityApi, RedshiftClusterApi, S3ObjectStore,
};

/// `launch-warehouse` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "launch-warehouse",
    about = "Provision the analytic cluster, wait until it is ready, and open access",
    version
)]
struct CliArgs {
    /// Seconds between readiness polls.
    #[arg(long = "poll-interval", value_name = "seconds", default_value_t = 5)]
    poll_interval_secs: u64,
    /// Total seconds to wait for the cluster before giving up.
    #[arg(long = "max-wait", value_name = "seconds", default_value_t = 900)]
    max_wait_secs: u64,
    /// Skip probing the source locations before provisioning.
    #[arg(long = "skip-source-probe")]
    skip_source_probe: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build runtime")?;
    runtime.block_on(run(args))
}

fn init_tracing() {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {error}");
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = WarehouseSettings::from_env().wrap_err("failed to load settings")?;
    let keys = AccessKeyPair::from_env()?;
    let clients = AwsClients::connect(&keys, settings.region()).await?;

    if args.skip_source_probe {
        info!("skipping source probes");
    } else {
        probe_sources(&settings, &S3ObjectStore::new(clients.s3.clone())).await?;
    }

    let role_spec = settings.role_spec();
    let provisioner = RoleProvisioner::new(Arc::new(IamIdentityApi::new(clients.iam.clone())));
    let role = provisioner
        .ensure_role(&role_spec)
        .await
        .wrap_err("identity role provisioning failed")?;

    let lifecycle = ClusterLifecycle::new(
        Arc::new(RedshiftClusterApi::new(clients.redshift)),
        Arc::new(Ec2NetworkApi::new(clients.ec2)),
        Arc::new(IamIdentityApi::new(clients.iam)),
    );
    let spec = settings.cluster_spec(&role.arn)?;
    lifecycle
        .provision(&spec)
        .await
        .wrap_err("cluster creation request failed")?;

    let cancel = CancelFlag::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling the readiness wait");
            interrupt.cancel();
        }
    });

    let policy = PollPolicy {
        interval: Duration::from_secs(args.poll_interval_secs),
        max_wait: Duration::from_secs(args.max_wait_secs),
    };
    let ready = match lifecycle
        .await_ready(&spec.identifier, policy, &cancel)
        .await
    {
        Ok(descriptor) => descriptor,
        Err(error) => {
            warn!(%error, "cluster never became ready; tearing down");
            let report = lifecycle.teardown(&spec.identifier, &role_spec).await;
            if !report.is_clean() {
                warn!(?report, "best-effort teardown left resources behind");
            }
            return Err(Report::new(error).wrap_err("cluster never became available"));
        }
    };

    let ingress = lifecycle
        .authorize_access(&ready, settings.db_port())
        .await
        .wrap_err("network authorization failed")?;
    let endpoint = ready
        .endpoint
        .ok_or_else(|| eyre!("cluster is available but reported no endpoint"))?;

    println!("status=available");
    println!("host={}", endpoint.host);
    println!("port={}", endpoint.port);
    println!("role_arn={}", role.arn);
    println!("role_outcome={:?}", role.outcome);
    println!("ingress={ingress:?}");
    Ok(())
}

async fn probe_sources(
    settings: &WarehouseSettings,
    store: &S3ObjectStore,
) -> Result<()> {
    let sources = [
        ("events", settings.events_source()),
        ("songs", settings.songs_source()),
    ];
    for (label, source) in sources {
        match source {
            Ok(location) => {
                let objects = store
                    .probe(&location)
                    .await
                    .wrap_err_with(|| format!("source '{label}' is not readable"))?;
                if objects == 0 {
                    warn!(%location, source = label, "source location is readable but empty");
                } else {
                    info!(%location, source = label, objects, "source location is readable");
                }
            }
            Err(SettingsError::Missing { .. }) => {
                info!(source = label, "source not configured; skipping probe");
            }
            Err(error) => return Err(Report::new(error)),
        }
    }
    Ok(())
}
