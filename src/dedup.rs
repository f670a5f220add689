use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::TransportError;
use crate::jira::IssueTracker;
use crate::metrics;
use crate::model::{NewIssue, StaleRecord, FALLBACK_ISSUE_TYPE};

/// What [`ensure_issue`] found or did for one stale record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured {
    Created { key: String },
    Exists { key: String },
    /// More than one issue matched; treated as already tracked.
    Ambiguous { keys: Vec<String> },
}

impl Ensured {
    pub fn created(&self) -> bool {
        matches!(self, Ensured::Created { .. })
    }

    pub fn issue_key(&self) -> &str {
        match self {
            Ensured::Created { key } | Ensured::Exists { key } => key,
            Ensured::Ambiguous { keys } => keys.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// Escape text for use inside a quoted phrase that itself sits inside a JQL
/// string literal. Each quote needs escaping at both levels.
pub fn escape_phrase(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\\\\"),
            '"' => out.push_str(r#"\\\""#),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', r"\\").replace('"', r#"\""#)
}

/// JQL matching issues in `project_key` whose summary contains `summary` as an exact phrase.
pub fn build_search_query(project_key: &str, summary: &str) -> String {
    format!(
        r#"project = "{}" AND summary ~ "\"{}\"""#,
        escape_literal(project_key),
        escape_phrase(summary)
    )
}

/// Raise an issue for `record` unless the tracker already has one with the same summary.
///
/// The tracker-side search is the only idempotence guard; nothing is
/// remembered locally between ticks.
#[instrument(skip_all, fields(job = %job_name))]
pub async fn ensure_issue(
    tracker: &dyn IssueTracker,
    job_name: &str,
    record: &StaleRecord,
    project_key: &str,
    labels: &[String],
) -> Result<Ensured, TransportError> {
    let jql = build_search_query(project_key, &record.summary);
    info!(project_key, summary = %record.summary, "searching for existing issue");
    let existing = tracker.search_issues(&jql).await?;

    match existing.len() {
        0 => {}
        1 => {
            return Ok(Ensured::Exists {
                key: existing[0].key.clone(),
            })
        }
        _ => {
            let keys: Vec<String> = existing.iter().map(|i| i.key.clone()).collect();
            let exact = existing.iter().filter(|i| i.title == record.summary).count();
            warn!(
                summary = %record.summary,
                ?keys,
                exact,
                "found multiple issues that match"
            );
            metrics::record_ambiguous_match(job_name);
            return Ok(Ensured::Ambiguous { keys });
        }
    }

    let issue = NewIssue {
        project_key: project_key.to_string(),
        issue_type: FALLBACK_ISSUE_TYPE.to_string(),
        summary: record.summary.clone(),
        description: record.description.clone(),
        labels: labels.to_vec(),
    };
    let key = tracker.create_issue(&issue).await?;
    metrics::record_issue_created(job_name);
    Ok(Ensured::Created { key })
}

/// Per-tick tally of [`raise_issues`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaiseReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
    /// Records left untouched because shutdown was requested.
    pub skipped: usize,
}

/// Run [`ensure_issue`] for each record in order. A failing record is logged
/// and counted, then the next one is attempted.
pub async fn raise_issues(
    tracker: &dyn IssueTracker,
    job_name: &str,
    records: &[StaleRecord],
    project_key: &str,
    labels: &[String],
    cancel: &CancellationToken,
) -> RaiseReport {
    let mut report = RaiseReport::default();
    for (idx, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            report.skipped = records.len() - idx;
            info!(job = %job_name, skipped = report.skipped, "shutdown requested; stopping issue creation");
            break;
        }
        match ensure_issue(tracker, job_name, record, project_key, labels).await {
            Ok(Ensured::Created { key }) => {
                info!(job = %job_name, summary = %record.summary, key = %key, "issue created");
                report.created += 1;
            }
            Ok(found) => {
                info!(job = %job_name, summary = %record.summary, key = %found.issue_key(), "issue already exists");
                report.existing += 1;
            }
            Err(err) => {
                metrics::record_error(metrics::PKG_ISSUERAISER);
                error!(job = %job_name, page_id = %record.page_id, ?err, "failed to raise issue");
                report.failed += 1;
            }
        }
    }
    report
}
