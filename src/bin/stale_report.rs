use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use staleguard::config;
use staleguard::confluence::ConfluenceClient;
use staleguard::model::StaleRecord;
use staleguard::{lister, tree};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run discovery for one job and print the stale pages without raising issues"
)]
struct Args {
    #[arg(long, env = "ATLASSIAN_TOKEN", hide_env_values = true)]
    atlassian_token: String,

    #[arg(long, env = "ATLASSIAN_USERNAME")]
    atlassian_username: String,

    /// Path to YAML config file
    #[arg(long, env = "CONFIG_FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Name of the job to report on
    #[arg(long)]
    job: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let job_cfg = cfg
        .job(&args.job)
        .ok_or_else(|| anyhow!("no job named '{}' in {}", args.job, args.config.display()))?;
    let settings = job_cfg.resolve()?;

    let Some(discovery) = settings.discovery else {
        println!("{}: no lastUpdate section, nothing to report", settings.name);
        return Ok(());
    };

    let base_url = cfg.base_url()?;
    let content = ConfluenceClient::new(
        base_url.clone(),
        args.atlassian_username,
        args.atlassian_token,
    )?;

    let pages = lister::list_pages(
        &content,
        &discovery.space_key,
        discovery.results_limit,
        &CancellationToken::new(),
    )
    .await
    .with_context(|| format!("listing space {} failed", discovery.space_key))?;
    let selection = tree::select_stale_descendants(
        &pages,
        &discovery.root_page_id,
        discovery.stale_after,
        Utc::now(),
    )
    .with_context(|| format!("filtering pages under {} failed", discovery.root_page_id))?;

    println!(
        "{}: {} pages in scope, {} stale",
        settings.name,
        selection.in_scope,
        selection.stale.len()
    );
    for page in &selection.stale {
        let record = StaleRecord::from_page(page, &base_url);
        println!("{}\n\n{}", record.summary, record.description);
    }
    Ok(())
}
