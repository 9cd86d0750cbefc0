//! Milestone payment fetcher
//!
//! Only awarded or accepted bids can carry milestones, so the fetcher
//! restricts itself to those before batching bid IDs into `bids[]=` queries.
//! Returned milestones are grouped by bid ID; summing the cleared ones is
//! the merger's job.

use crate::api::types::MilestoneListResponse;
use crate::api::{
    retry, split_into_batches, ApiClient, ApiError, Endpoint, QueryPairs, RetryPolicy,
    INTER_BATCH_DELAY,
};
use crate::model::{Bid, Milestone};
use crate::pipeline::{CancelToken, StageProgress};
use crate::Result;
use std::collections::HashMap;

/// The milestone endpoint accepts at most this many bid IDs per request
pub const MILESTONE_BATCH_SIZE: usize = 50;

/// Fetches milestone payments for the awarded bids, grouped by bid ID
pub async fn fetch_milestones(
    client: &ApiClient,
    bids: &[Bid],
    retry_policy: &RetryPolicy,
    progress: &StageProgress<'_>,
    cancel: &CancelToken,
) -> Result<HashMap<u64, Vec<Milestone>>> {
    let mut milestones: HashMap<u64, Vec<Milestone>> = HashMap::new();

    // Bids that were never awarded have no milestones to fetch
    let awarded_ids: Vec<u64> = bids
        .iter()
        .filter(|bid| bid.award_status.is_awarded())
        .map(|bid| bid.id)
        .collect();

    if awarded_ids.is_empty() {
        progress.report(100.0, "No awarded bids to fetch payments for");
        return Ok(milestones);
    }

    let batches = split_into_batches(&awarded_ids, MILESTONE_BATCH_SIZE);
    let total = batches.len();
    let mut succeeded = 0usize;
    let mut last_error: Option<ApiError> = None;

    for (index, batch) in batches.iter().enumerate() {
        cancel.check()?;

        if index > 0 {
            tokio::time::sleep(INTER_BATCH_DELAY).await;
        }

        let pairs = QueryPairs::new().with_array("bids", batch.iter().copied());

        match retry(retry_policy, || {
            client.get::<MilestoneListResponse>(Endpoint::Milestones, &pairs)
        })
        .await
        {
            Ok(response) => {
                succeeded += 1;
                for raw in response.milestones.into_vec() {
                    let milestone = raw.normalize(None);
                    if let Some(bid_id) = milestone.bid_id {
                        milestones.entry(bid_id).or_default().push(milestone);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Milestone batch {}/{} failed, continuing: {}",
                    index + 1,
                    total,
                    e
                );
                last_error = Some(e);
            }
        }

        progress.report(
            (index + 1) as f32 / total as f32 * 100.0,
            format!("Fetched payments {}/{} batches", index + 1, total),
        );
    }

    if succeeded == 0 {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    tracing::info!(
        "Milestone fetch complete: {} of {} awarded bids have payments",
        milestones.len(),
        awarded_ids.len()
    );

    Ok(milestones)
}
