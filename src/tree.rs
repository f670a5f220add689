//! Rebuilds the page tree from one bulk listing and picks out stale descendants.
//!
//! One listing call per space plus in-memory filtering is far cheaper against a
//! rate-limited API than walking a children endpoint node by node.
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::error::DiscoveryError;
use crate::model::Page;

/// Every page reachable from `root_id` through parent links, excluding the
/// root itself, in breadth-first order. Siblings keep listing order.
pub fn descendants<'a>(
    pages: &'a [Page],
    root_id: &str,
) -> Result<Vec<&'a Page>, DiscoveryError> {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, page) in pages.iter().enumerate() {
        children.entry(page.parent_id.as_str()).or_default().push(idx);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(root_id);
    let mut queue: VecDeque<&str> = VecDeque::from([root_id]);
    let mut out = Vec::new();

    while let Some(parent) = queue.pop_front() {
        let Some(kids) = children.get(parent) else {
            continue;
        };
        for &idx in kids {
            let page = &pages[idx];
            if !visited.insert(page.id.as_str()) {
                return Err(DiscoveryError::CyclicParentGraph {
                    page_id: page.id.clone(),
                });
            }
            out.push(page);
            queue.push_back(page.id.as_str());
        }
    }
    Ok(out)
}

/// Keep pages last modified strictly before `now - stale_after`, most recently
/// modified first. Ties keep their input order.
pub fn filter_stale<'a>(
    pages: Vec<&'a Page>,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> Vec<&'a Page> {
    let cutoff = ChronoDuration::from_std(stale_after)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut stale: Vec<&Page> = pages
        .into_iter()
        .filter(|p| p.last_modified_at < cutoff)
        .collect();
    stale.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
    stale
}

/// Result of one discovery pass over a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Number of descendants of the root, stale or not.
    pub in_scope: usize,
    pub stale: Vec<Page>,
}

pub fn select_stale_descendants(
    all_pages: &[Page],
    root_id: &str,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> Result<Selection, DiscoveryError> {
    let scope = descendants(all_pages, root_id)?;
    let in_scope = scope.len();
    let stale = filter_stale(scope, stale_after, now)
        .into_iter()
        .cloned()
        .collect();
    Ok(Selection { in_scope, stale })
}
