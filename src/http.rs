use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::TransportError;

const USER_AGENT: &str = concat!("staleguard/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Result<Client, TransportError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .no_proxy()
        .build()?)
}

/// Make sure relative joins keep the full base path.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Check the status and decode a JSON body.
pub(crate) async fn decode<T: DeserializeOwned>(
    service: &'static str,
    res: Response,
) -> Result<T, TransportError> {
    let status = res.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let body = res.text().await.unwrap_or_default();
        warn!(service, "rate limited: {}", body);
        return Err(TransportError::Status { status, body });
    }
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(TransportError::Status { status, body });
    }
    let body = res.text().await?;
    Ok(serde_json::from_str(&body)?)
}
