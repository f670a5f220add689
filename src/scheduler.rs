//! Per-job timer loop: discover stale pages, raise issues, wait, repeat.
//!
//! ```text
//! Waiting(d) --timer--> Running --ok--> Waiting(poll_interval)
//!                          |
//!                          +--discovery failed--> RetryWaiting(retry_interval) --timer--> Running
//! any state --cancel--> Stopped
//! ```
use chrono::Utc;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::JobSettings;
use crate::confluence::ContentRepository;
use crate::dedup::{self, RaiseReport};
use crate::error::DiscoveryError;
use crate::jira::IssueTracker;
use crate::lister;
use crate::metrics;
use crate::model::StaleRecord;
use crate::tree;

/// Delay before a freshly started job runs for the first time.
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting(Duration),
    Running,
    RetryWaiting(Duration),
    Stopped,
}

/// Clients and global options shared read-only by every job.
#[derive(Clone)]
pub struct JobContext {
    pub content: Arc<dyn ContentRepository>,
    pub tracker: Arc<dyn IssueTracker>,
    /// Site root used to build page links in issue descriptions.
    pub site_base: Url,
    /// Log stale records instead of touching the tracker.
    pub dry_run: bool,
}

/// Outcome of one successful tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub in_scope: usize,
    pub stale: usize,
    pub issues: RaiseReport,
}

pub struct Job {
    settings: JobSettings,
    ctx: JobContext,
    cancel: CancellationToken,
}

impl Job {
    pub fn new(settings: JobSettings, ctx: JobContext, cancel: CancellationToken) -> Self {
        Self {
            settings,
            ctx,
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Drive the state machine until cancelled.
    pub async fn run(self) {
        let mut state = JobState::Waiting(INITIAL_DELAY);
        while state != JobState::Stopped {
            state = self.step(state).await;
        }
        info!(job = %self.settings.name, "job stopped");
    }

    /// Perform one transition.
    pub async fn step(&self, state: JobState) -> JobState {
        match state {
            JobState::Waiting(wait) | JobState::RetryWaiting(wait) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => JobState::Stopped,
                    _ = tokio::time::sleep(wait) => JobState::Running,
                }
            }
            JobState::Running => {
                if self.cancel.is_cancelled() {
                    return JobState::Stopped;
                }
                let next = match self.run_tick().await {
                    Ok(report) => {
                        info!(
                            job = %self.settings.name,
                            in_scope = report.in_scope,
                            stale = report.stale,
                            created = report.issues.created,
                            existing = report.issues.existing,
                            failed = report.issues.failed,
                            "job complete; waiting {:?}",
                            self.settings.poll_interval
                        );
                        JobState::Waiting(self.settings.poll_interval)
                    }
                    Err(DiscoveryError::Cancelled { fetched }) => {
                        info!(job = %self.settings.name, fetched, "discovery cancelled");
                        return JobState::Stopped;
                    }
                    Err(err) => {
                        error!(
                            job = %self.settings.name,
                            ?err,
                            "discovery failed; retrying in {:?}",
                            self.settings.retry_interval
                        );
                        JobState::RetryWaiting(self.settings.retry_interval)
                    }
                };
                if self.cancel.is_cancelled() {
                    JobState::Stopped
                } else {
                    next
                }
            }
            JobState::Stopped => JobState::Stopped,
        }
    }

    /// Discovery, filtering and issue raising, in that order.
    #[instrument(skip_all, fields(job = %self.settings.name))]
    pub async fn run_tick(&self) -> Result<TickReport, DiscoveryError> {
        info!("running job");
        let (in_scope, records) = match self.discover().await {
            Ok(found) => found,
            Err(err) => {
                if !matches!(err, DiscoveryError::Cancelled { .. }) {
                    metrics::record_error(metrics::PKG_LASTUPDATE);
                }
                return Err(err);
            }
        };

        let mut report = TickReport {
            in_scope,
            stale: records.len(),
            ..Default::default()
        };

        if self.ctx.dry_run {
            for record in &records {
                info!(summary = %record.summary, description = %record.description, "dry run; not raising issue");
            }
            return Ok(report);
        }

        report.issues = dedup::raise_issues(
            self.ctx.tracker.as_ref(),
            &self.settings.name,
            &records,
            &self.settings.project_key,
            &self.settings.labels,
            &self.cancel,
        )
        .await;
        Ok(report)
    }

    /// List the space and turn stale descendants of the root page into records.
    /// Returns the number of in-scope pages alongside the records.
    pub async fn discover(&self) -> Result<(usize, Vec<StaleRecord>), DiscoveryError> {
        let Some(discovery) = &self.settings.discovery else {
            return Ok((0, Vec::new()));
        };

        let pages = lister::list_pages(
            self.ctx.content.as_ref(),
            &discovery.space_key,
            discovery.results_limit,
            &self.cancel,
        )
        .await?;

        let selection = tree::select_stale_descendants(
            &pages,
            &discovery.root_page_id,
            discovery.stale_after,
            Utc::now(),
        )?;
        metrics::set_pages_in_scope(&self.settings.name, selection.in_scope);
        info!(
            job = %self.settings.name,
            in_scope = selection.in_scope,
            "{} pages found older than {:?}",
            selection.stale.len(),
            discovery.stale_after
        );

        let records = selection
            .stale
            .iter()
            .map(|page| StaleRecord::from_page(page, &self.ctx.site_base))
            .collect();
        Ok((selection.in_scope, records))
    }
}
