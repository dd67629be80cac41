//! Window read shared by every bid store backend.

use tracing::debug;

use super::{BidStore, StoreError};
use crate::model::BidEvent;

/// Walk a campaign's pages until the keyspace is exhausted or at least
/// `limit` candidates are collected, then sort newest first and truncate.
///
/// Backends page from the highest key down, so within one platform the
/// newest bids come first. Stopping early means the truncation only sees the
/// pages scanned so far: with several platforms, a newer bid on a platform
/// that sorts lower can be missed. The window is treated as approximate.
pub(super) async fn recent_bids<S>(
    store: &S,
    campaign_id: &str,
    limit: usize,
    page_size: usize,
) -> Result<Vec<BidEvent>, StoreError>
where
    S: BidStore + ?Sized,
{
    if limit == 0 {
        return Ok(Vec::new());
    }

    let page_size = page_size.max(1);
    let mut bids = Vec::new();
    let mut cursor: Option<String> = None;
    let mut skipped = 0usize;

    loop {
        let page = store
            .scan_page(campaign_id, cursor.as_deref(), page_size)
            .await?;

        for entry in page.entries {
            match serde_json::from_str::<BidEvent>(&entry.payload) {
                // Prefix scans can surface ids that merely share a prefix.
                Ok(bid) if bid.campaign_id == campaign_id => bids.push(bid),
                Ok(_) => {}
                Err(e) => {
                    skipped += 1;
                    debug!("Skipping undecodable bid {}: {}", entry.key, e);
                }
            }
        }

        cursor = page.next_cursor;
        if cursor.is_none() || bids.len() >= limit {
            break;
        }
    }

    if skipped > 0 {
        debug!(
            "Skipped {} undecodable bids for campaign {}",
            skipped, campaign_id
        );
    }

    bids.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
    bids.truncate(limit);
    Ok(bids)
}
