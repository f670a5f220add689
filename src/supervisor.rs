use futures::future::join_all;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::JobConfig;
use crate::metrics;
use crate::scheduler::{Job, JobContext};

/// How long shutdown waits for jobs to reach `Stopped`.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Resolve and spawn one task per job. A job whose configuration does not
/// resolve is logged, counted and skipped; the rest still start.
pub fn spawn_jobs(
    jobs: &[JobConfig],
    ctx: &JobContext,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let settings = match job.resolve() {
            Ok(settings) => settings,
            Err(err) => {
                metrics::record_error(metrics::PKG_CONFIG);
                error!(job = %job.name, %err, "invalid job configuration; not starting");
                continue;
            }
        };
        info!(job = %settings.name, interval = ?settings.poll_interval, "starting job");
        let job = Job::new(settings, ctx.clone(), cancel.child_token());
        handles.push(tokio::spawn(job.run()));
    }
    handles
}

/// Wait up to `grace` for every job to finish. Stragglers are aborted so
/// nothing keeps running once this returns. Returns whether all jobs
/// stopped on their own.
pub async fn wait_for_jobs(handles: Vec<JoinHandle<()>>, grace: Duration) -> bool {
    let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
    match tokio::time::timeout(grace, join_all(handles)).await {
        Ok(results) => {
            for res in results {
                if let Err(err) = res {
                    error!(?err, "job task ended abnormally");
                }
            }
            true
        }
        Err(_) => {
            warn!(?grace, "jobs did not stop within grace period; aborting");
            for abort in aborts {
                abort.abort();
            }
            false
        }
    }
}
