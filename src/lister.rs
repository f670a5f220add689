use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::confluence::ContentRepository;
use crate::error::DiscoveryError;
use crate::model::Page;

/// Resolve `space_key` and fetch every page in the space, following
/// continuation cursors until the listing is exhausted.
///
/// A failure on any continuation call discards everything fetched so far:
/// filtering an incomplete listing would silently miss stale pages.
/// Cancellation is checked before every continuation call.
#[instrument(skip(repo, cancel))]
pub async fn list_pages(
    repo: &dyn ContentRepository,
    space_key: &str,
    limit: u32,
    cancel: &CancellationToken,
) -> Result<Vec<Page>, DiscoveryError> {
    let space_id = repo.resolve_space_id(space_key).await?;
    debug!(space_key, space_id = %space_id, "resolved space");

    let first = repo.list_space_pages(&space_id, limit).await?;
    let mut pages = first.pages;
    let mut cursor = first.next;
    let mut requests = 1usize;

    while let Some(next) = cursor {
        if cancel.is_cancelled() {
            debug!(fetched = pages.len(), "listing cancelled");
            return Err(DiscoveryError::Cancelled {
                fetched: pages.len(),
            });
        }
        let batch = repo
            .next_pages(&next)
            .await
            .map_err(|source| DiscoveryError::IncompleteListing {
                fetched: pages.len(),
                source,
            })?;
        requests += 1;
        pages.extend(batch.pages);
        cursor = batch.next;
    }

    debug!(pages = pages.len(), requests, "space listing complete");
    Ok(pages)
}
