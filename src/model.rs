use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// One content item in a wiki space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub title: String,
    /// Empty for pages at the top of the space.
    pub parent_id: String,
    pub last_modified_at: DateTime<Utc>,
}

/// Work item handed from discovery to issue creation. Built fresh every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleRecord {
    pub page_id: String,
    pub summary: String,
    pub description: String,
}

/// Read-only view of an issue already present in the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIssue {
    pub key: String,
    pub title: String,
}

/// Issue payload submitted to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// Issue type used for every ticket raised.
pub const FALLBACK_ISSUE_TYPE: &str = "Task";

/// Format a timestamp the way the wiki API renders it, e.g. `2023-01-02T15:04:05.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl StaleRecord {
    /// Derive the summary and description for a stale page. `site_base` is the
    /// Atlassian site root used to build the page view link.
    pub fn from_page(page: &Page, site_base: &Url) -> Self {
        let updated = format_timestamp(&page.last_modified_at);
        let page_url = view_url(site_base, &page.id);
        Self {
            page_id: page.id.clone(),
            summary: format!("\"{}\" has not been updated since {}", page.title, updated),
            description: format!(
                "Page ID: {}\nPage Title: {}\nLast Updated: {}\nURL: {}\n\nPlease review this page and update any out-of-date information if required.\n\n",
                page.id, page.title, updated, page_url
            ),
        }
    }
}

fn view_url(site_base: &Url, page_id: &str) -> String {
    let mut url = site_base.clone();
    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/wiki/pages/viewpage.action", base_path));
    url.query_pairs_mut().clear().append_pair("pageId", page_id);
    url.to_string()
}
