use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::debug;

use crate::error::TransportError;
use crate::http;
use crate::jira::model::{CreateIssueReq, CreateIssueResp, SearchResp};
use crate::model::{ExistingIssue, NewIssue};

pub mod model;

/// Write access to the issue tracker. Stateless from the caller's side.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn search_issues(&self, jql: &str) -> Result<Vec<ExistingIssue>, TransportError>;

    /// Create an issue and return its key.
    async fn create_issue(&self, issue: &NewIssue) -> Result<String, TransportError>;
}

/// Jira Cloud v2 REST client.
#[derive(Clone)]
pub struct JiraClient {
    http: Client,
    base_url: Url,
    username: String,
    token: String,
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    pub fn new(base_url: Url, username: String, token: String) -> Result<Self, TransportError> {
        Ok(Self {
            http: http::build_client()?,
            base_url: http::with_trailing_slash(base_url),
            username,
            token,
        })
    }

    /// Enhanced JQL search. Only the first page is read: dedup needs to know
    /// whether anything matched, not every match.
    pub fn build_search(&self, jql: &str) -> Result<reqwest::Request, TransportError> {
        let endpoint = self.base_url.join("rest/api/2/search/jql")?;
        Ok(self
            .http
            .get(endpoint)
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
            .query(&[("jql", jql), ("fields", "summary")])
            .build()?)
    }

    pub fn build_create(&self, issue: &NewIssue) -> Result<reqwest::Request, TransportError> {
        let endpoint = self.base_url.join("rest/api/2/issue")?;
        Ok(self
            .http
            .post(endpoint)
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
            .json(&CreateIssueReq::from(issue))
            .build()?)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search_issues(&self, jql: &str) -> Result<Vec<ExistingIssue>, TransportError> {
        let request = self.build_search(jql)?;
        debug!(url=%request.url(), "sending jira search");
        let res = self.http.execute(request).await?;
        let resp: SearchResp = http::decode("jira", res).await?;
        Ok(resp.issues.into_iter().map(ExistingIssue::from).collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<String, TransportError> {
        let request = self.build_create(issue)?;
        debug!(url=%request.url(), summary=%issue.summary, "sending jira create");
        let res = self.http.execute(request).await?;
        let resp: CreateIssueResp = http::decode("jira", res).await?;
        Ok(resp.key)
    }
}
