use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::debug;

use crate::confluence::model::{PagesResp, SpacesResp};
use crate::error::{DiscoveryError, TransportError};
use crate::http;
use crate::model::Page;

pub mod model;

/// One page of a space listing plus the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBatch {
    pub pages: Vec<Page>,
    pub next: Option<String>,
}

impl From<PagesResp> for PageBatch {
    fn from(resp: PagesResp) -> Self {
        let next = resp.next_cursor();
        Self {
            pages: resp.results.into_iter().map(Page::from).collect(),
            next,
        }
    }
}

/// Read access to the wiki. Implementations keep no cache, so one instance
/// can be shared by every job.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn resolve_space_id(&self, space_key: &str) -> Result<String, DiscoveryError>;

    async fn list_space_pages(&self, space_id: &str, limit: u32)
        -> Result<PageBatch, TransportError>;

    /// Follow a continuation cursor returned by a previous batch.
    async fn next_pages(&self, cursor: &str) -> Result<PageBatch, TransportError>;
}

/// Confluence Cloud v2 REST client.
#[derive(Clone)]
pub struct ConfluenceClient {
    http: Client,
    base_url: Url,
    username: String,
    token: String,
}

impl fmt::Debug for ConfluenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfluenceClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ConfluenceClient {
    /// `base_url` is the site root, e.g. `https://example.atlassian.net`.
    pub fn new(base_url: Url, username: String, token: String) -> Result<Self, TransportError> {
        Ok(Self {
            http: http::build_client()?,
            base_url: http::with_trailing_slash(base_url),
            username,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_get(&self, url: Url) -> Result<reqwest::Request, TransportError> {
        Ok(self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
            .build()?)
    }

    async fn fetch_pages(&self, url: Url) -> Result<PageBatch, TransportError> {
        let request = self.build_get(url)?;
        debug!(url=%request.url(), "sending confluence request");
        let res = self.http.execute(request).await?;
        let resp: PagesResp = http::decode("confluence", res).await?;
        Ok(resp.into())
    }
}

#[async_trait]
impl ContentRepository for ConfluenceClient {
    async fn resolve_space_id(&self, space_key: &str) -> Result<String, DiscoveryError> {
        let mut url = self
            .base_url
            .join("wiki/api/v2/spaces")
            .map_err(TransportError::from)?;
        url.query_pairs_mut()
            .append_pair("keys", space_key)
            .append_pair("serialize-ids-as-strings", "true");

        let request = self.build_get(url)?;
        debug!(url=%request.url(), "resolving space");
        let res = self
            .http
            .execute(request)
            .await
            .map_err(TransportError::from)?;
        let spaces: SpacesResp = http::decode("confluence", res).await?;

        match spaces.results.len() {
            0 => Err(DiscoveryError::SpaceNotFound {
                key: space_key.to_string(),
            }),
            1 => Ok(spaces.results[0].id.clone()),
            count => Err(DiscoveryError::AmbiguousSpace {
                key: space_key.to_string(),
                count,
            }),
        }
    }

    async fn list_space_pages(
        &self,
        space_id: &str,
        limit: u32,
    ) -> Result<PageBatch, TransportError> {
        let mut url = self
            .base_url
            .join(&format!("wiki/api/v2/spaces/{}/pages", space_id))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("serialize-ids-as-strings", "true");
        self.fetch_pages(url).await
    }

    async fn next_pages(&self, cursor: &str) -> Result<PageBatch, TransportError> {
        // `_links.next` is site-relative, e.g. `/wiki/api/v2/spaces/1/pages?cursor=..`
        let url = self.base_url.join(cursor)?;
        self.fetch_pages(url).await
    }
}
