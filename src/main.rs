use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use staleguard::config;
use staleguard::confluence::ConfluenceClient;
use staleguard::health;
use staleguard::jira::JiraClient;
use staleguard::metrics;
use staleguard::scheduler::JobContext;
use staleguard::supervisor::{self, SHUTDOWN_GRACE};

#[derive(Debug, Parser)]
#[command(author, version, about = "Raise Jira issues for Confluence pages that have gone stale")]
struct Args {
    /// Atlassian API token
    #[arg(long, env = "ATLASSIAN_TOKEN", hide_env_values = true)]
    atlassian_token: String,

    /// Atlassian user name the token belongs to
    #[arg(long, env = "ATLASSIAN_USERNAME")]
    atlassian_username: String,

    /// Path to YAML config file
    #[arg(long, env = "CONFIG_FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Address for the /healthz and /metrics listener
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen_address: String,
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(?err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(?err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    init_tracing(cfg.debug);
    metrics::init_metrics();

    let base_url = cfg.base_url()?;
    let confluence = ConfluenceClient::new(
        base_url.clone(),
        args.atlassian_username.clone(),
        args.atlassian_token.clone(),
    )
    .context("failed to build Confluence client")?;
    let jira = JiraClient::new(
        base_url.clone(),
        args.atlassian_username.clone(),
        args.atlassian_token.clone(),
    )
    .context("failed to build Jira client")?;

    let ctx = JobContext {
        content: Arc::new(confluence),
        tracker: Arc::new(jira),
        site_base: base_url,
        dry_run: cfg.debug,
    };
    if cfg.debug {
        warn!("debug mode: stale pages are logged, no issues will be raised");
    }

    let listener = health::bind(&args.listen_address).await?;
    let server_shutdown = CancellationToken::new();
    let server = tokio::spawn(health::serve(listener, server_shutdown.clone()));

    let cancel = CancellationToken::new();
    let handles = supervisor::spawn_jobs(&cfg.jobs, &ctx, &cancel);
    info!(jobs = handles.len(), configured = cfg.jobs.len(), "startup complete");

    shutdown_signal().await;
    info!("shutting down gracefully");
    cancel.cancel();
    if !supervisor::wait_for_jobs(handles, SHUTDOWN_GRACE).await {
        warn!("some jobs were aborted during shutdown");
    }

    server_shutdown.cancel();
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(res)) => res?,
        Ok(Err(err)) => error!(?err, "health server task failed"),
        Err(_) => warn!("health server did not stop within grace period"),
    }
    info!("shutdown complete");
    Ok(())
}
