use reqwest::StatusCode;
use thiserror::Error;

/// Network, HTTP or decode failure from either remote service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure of the discovery phase (listing + tree filtering). Any of these
/// aborts the tick and sends the job into its retry wait.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("page listing aborted after {fetched} pages: {source}")]
    IncompleteListing {
        fetched: usize,
        #[source]
        source: TransportError,
    },
    #[error("no spaces found with key {key}")]
    SpaceNotFound { key: String },
    #[error("{count} spaces found with key {key}")]
    AmbiguousSpace { key: String, count: usize },
    #[error("page listing cancelled after {fetched} pages")]
    Cancelled { fetched: usize },
    #[error("parent graph revisits page {page_id}")]
    CyclicParentGraph { page_id: String },
}
