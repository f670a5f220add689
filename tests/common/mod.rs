#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{StatusCode, Url};
use staleguard::config::{DiscoverySettings, JobSettings};
use staleguard::confluence::{ContentRepository, PageBatch};
use staleguard::dedup::escape_phrase;
use staleguard::error::{DiscoveryError, TransportError};
use staleguard::jira::IssueTracker;
use staleguard::model::{ExistingIssue, NewIssue, Page};
use staleguard::scheduler::JobContext;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const DAY: u64 = 24 * 3600;

pub fn server_error(body: &str) -> TransportError {
    TransportError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: body.to_string(),
    }
}

pub fn page(id: &str, parent: &str, days_ago: i64) -> Page {
    Page {
        id: id.into(),
        title: format!("Page {id}"),
        parent_id: parent.into(),
        last_modified_at: Utc::now() - ChronoDuration::days(days_ago),
    }
}

pub fn settings(name: &str, root: &str) -> JobSettings {
    JobSettings {
        name: name.into(),
        poll_interval: Duration::from_secs(3600),
        retry_interval: Duration::from_secs(60),
        project_key: "DOCS".into(),
        labels: vec!["stale-docs".into()],
        discovery: Some(DiscoverySettings {
            space_key: "ENG".into(),
            root_page_id: root.into(),
            stale_after: Duration::from_secs(90 * DAY),
            results_limit: 2,
        }),
    }
}

pub fn context(content: &FakeContent, tracker: &RecordingTracker) -> JobContext {
    JobContext {
        content: Arc::new(content.clone()),
        tracker: Arc::new(tracker.clone()),
        site_base: Url::parse("https://example.atlassian.net").unwrap(),
        dry_run: false,
    }
}

/// Serves a fixed listing split into batches joined by `cursor-N` links.
#[derive(Clone, Default)]
pub struct FakeContent {
    batches: Arc<Vec<Vec<Page>>>,
    /// Index of a continuation batch that fails.
    fail_batch: Option<usize>,
    /// Scripted failures for upcoming space lookups.
    resolve_failures: Arc<Mutex<VecDeque<DiscoveryError>>>,
    /// Cancelled while the first batch is being served.
    cancel_on_list: Option<CancellationToken>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeContent {
    pub fn with_batches(batches: Vec<Vec<Page>>) -> Self {
        Self {
            batches: Arc::new(batches),
            ..Default::default()
        }
    }

    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self::with_batches(vec![pages])
    }

    pub fn failing_batch(mut self, idx: usize) -> Self {
        self.fail_batch = Some(idx);
        self
    }

    pub fn cancelling_on_first_batch(mut self, cancel: &CancellationToken) -> Self {
        self.cancel_on_list = Some(cancel.clone());
        self
    }

    pub async fn fail_next_resolves(&self, times: usize) {
        let mut guard = self.resolve_failures.lock().await;
        for _ in 0..times {
            guard.push_back(DiscoveryError::Transport(server_error("space lookup down")));
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn resolve_calls(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.starts_with("resolve:"))
            .count()
    }

    fn batch(&self, idx: usize) -> PageBatch {
        let pages = self.batches.get(idx).cloned().unwrap_or_default();
        let next = (idx + 1 < self.batches.len()).then(|| format!("cursor-{}", idx + 1));
        PageBatch { pages, next }
    }
}

#[async_trait]
impl ContentRepository for FakeContent {
    async fn resolve_space_id(&self, space_key: &str) -> Result<String, DiscoveryError> {
        self.calls.lock().await.push(format!("resolve:{space_key}"));
        if let Some(err) = self.resolve_failures.lock().await.pop_front() {
            return Err(err);
        }
        Ok(format!("id-{space_key}"))
    }

    async fn list_space_pages(
        &self,
        space_id: &str,
        limit: u32,
    ) -> Result<PageBatch, TransportError> {
        self.calls.lock().await.push(format!("list:{space_id}:{limit}"));
        if let Some(cancel) = &self.cancel_on_list {
            cancel.cancel();
        }
        Ok(self.batch(0))
    }

    async fn next_pages(&self, cursor: &str) -> Result<PageBatch, TransportError> {
        self.calls.lock().await.push(format!("next:{cursor}"));
        let idx: usize = cursor
            .trim_start_matches("cursor-")
            .parse()
            .map_err(|_| server_error("bad cursor"))?;
        if self.fail_batch == Some(idx) {
            return Err(server_error("continuation failed"));
        }
        Ok(self.batch(idx))
    }
}

/// In-memory tracker whose search sees every issue created so far.
#[derive(Clone, Default)]
pub struct RecordingTracker {
    issues: Arc<Mutex<Vec<ExistingIssue>>>,
    searches: Arc<Mutex<Vec<String>>>,
    created: Arc<Mutex<Vec<NewIssue>>>,
    /// Creation fails for summaries containing any of these.
    fail_create: Arc<Vec<String>>,
}

impl RecordingTracker {
    pub fn failing_for(markers: &[&str]) -> Self {
        Self {
            fail_create: Arc::new(markers.iter().map(|m| m.to_string()).collect()),
            ..Default::default()
        }
    }

    pub async fn seed(&self, key: &str, title: &str) {
        self.issues.lock().await.push(ExistingIssue {
            key: key.into(),
            title: title.into(),
        });
    }

    pub async fn searches(&self) -> Vec<String> {
        self.searches.lock().await.clone()
    }

    pub async fn created(&self) -> Vec<NewIssue> {
        self.created.lock().await.clone()
    }
}

#[async_trait]
impl IssueTracker for RecordingTracker {
    async fn search_issues(&self, jql: &str) -> Result<Vec<ExistingIssue>, TransportError> {
        self.searches.lock().await.push(jql.to_string());
        let issues = self.issues.lock().await;
        Ok(issues
            .iter()
            .filter(|i| jql.contains(&format!("\\\"{}\\\"", escape_phrase(&i.title))))
            .cloned()
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<String, TransportError> {
        if self.fail_create.iter().any(|m| issue.summary.contains(m)) {
            return Err(server_error("create rejected"));
        }
        let mut issues = self.issues.lock().await;
        let key = format!("{}-{}", issue.project_key, issues.len() + 1);
        issues.push(ExistingIssue {
            key: key.clone(),
            title: issue.summary.clone(),
        });
        self.created.lock().await.push(issue.clone());
        Ok(key)
    }
}
