//! Bid history fetcher
//!
//! Pages through the bid list endpoint with `(offset, page_size)` until a
//! page comes back short or the optional limit is reached. Each page also
//! carries stub projects and stub users, which are accumulated alongside the
//! bids for later enrichment.

use crate::api::types::BidListResponse;
use crate::api::{retry, ApiClient, Endpoint, QueryPairs, RetryPolicy};
use crate::model::{Bid, ClientProfile, Project};
use crate::pipeline::{CancelToken, StageProgress};
use crate::Result;
use std::collections::HashMap;

/// Progress denominator assumed when no bid limit is configured
const UNBOUNDED_PROGRESS_DENOMINATOR: u32 = 500;

/// Parameters for one bid history fetch
#[derive(Debug, Clone)]
pub struct BidQuery {
    /// The bidder whose history is being aggregated
    pub bidder_id: u64,

    /// Inclusive window start, epoch seconds
    pub from_time: Option<i64>,

    /// Inclusive window end, epoch seconds
    pub to_time: Option<i64>,

    /// Stop after this many bids
    pub limit: Option<u32>,

    /// Bids requested per page
    pub page_size: u32,
}

/// Bids plus the stub records embedded in the bid list response
#[derive(Debug, Default)]
pub struct BidFetchResult {
    pub bids: Vec<Bid>,
    pub projects: HashMap<u64, Project>,
    pub clients: HashMap<u64, ClientProfile>,
}

/// Fetches the bid history one page at a time
///
/// Progress is proportional to bids accumulated against the configured limit
/// (or a fixed denominator when unbounded). Once the limit is reached the
/// fetcher stops without requesting another page.
pub async fn fetch_bids(
    client: &ApiClient,
    query: &BidQuery,
    retry_policy: &RetryPolicy,
    progress: &StageProgress<'_>,
    cancel: &CancelToken,
) -> Result<BidFetchResult> {
    let mut result = BidFetchResult::default();
    let mut offset: u32 = 0;
    let denominator = query.limit.unwrap_or(UNBOUNDED_PROGRESS_DENOMINATOR).max(1);

    progress.report(0.0, "Fetching bid history");

    loop {
        cancel.check()?;

        let mut pairs = QueryPairs::new()
            .with_array("bidders", [query.bidder_id])
            .with("project_details", "true")
            .with("user_details", "true");
        if let Some(from) = query.from_time {
            pairs.push("from_time", from);
        }
        if let Some(to) = query.to_time {
            pairs.push("to_time", to);
        }
        pairs.push("offset", offset);
        pairs.push("limit", query.page_size);

        let page: BidListResponse =
            retry(retry_policy, || client.get(Endpoint::Bids, &pairs)).await?;

        let page_len = page.bids.len();

        // Stub projects and users ride along with every page; first sighting wins
        for raw in page.projects.into_vec() {
            if let Some(project) = raw.normalize(false) {
                result.projects.entry(project.id).or_insert(project);
            }
        }
        for raw in page.users.into_vec() {
            if let Some(profile) = raw.normalize(false) {
                result.clients.entry(profile.id).or_insert(profile);
            }
        }

        for raw in page.bids {
            if let Some(bid) = raw.normalize() {
                result.bids.push(bid);
            }
        }

        let limit_reached = query
            .limit
            .is_some_and(|limit| result.bids.len() >= limit as usize);

        if limit_reached {
            result.bids.truncate(query.limit.unwrap_or(0) as usize);
        }

        let fetched = result.bids.len();
        progress.report(
            (fetched as f32 / denominator as f32 * 100.0).min(100.0),
            format!("Fetched {} bids", fetched),
        );

        if limit_reached || page_len == 0 || page_len < query.page_size as usize {
            break;
        }

        offset += page_len as u32;
    }

    tracing::info!(
        "Bid fetch complete: {} bids, {} stub projects, {} stub clients",
        result.bids.len(),
        result.projects.len(),
        result.clients.len()
    );

    Ok(result)
}
