//! Client profile fetcher
//!
//! Project owners discovered during the bid fetch are detailed in small
//! batches: profile, reputation, and payment verification flags.

use crate::api::types::UserListResponse;
use crate::api::{
    retry, split_into_batches, ApiClient, ApiError, Endpoint, QueryPairs, RetryPolicy,
    INTER_BATCH_DELAY,
};
use crate::model::ClientProfile;
use crate::pipeline::{CancelToken, StageProgress};
use crate::Result;
use std::collections::HashMap;

/// The user endpoint accepts at most this many IDs per request
pub const CLIENT_BATCH_SIZE: usize = 5;

/// Fetches detailed profiles for the given client IDs, keyed by client ID
pub async fn fetch_client_profiles(
    client: &ApiClient,
    client_ids: &[u64],
    retry_policy: &RetryPolicy,
    progress: &StageProgress<'_>,
    cancel: &CancelToken,
) -> Result<HashMap<u64, ClientProfile>> {
    let mut profiles = HashMap::new();

    if client_ids.is_empty() {
        progress.report(100.0, "No clients to profile");
        return Ok(profiles);
    }

    let batches = split_into_batches(client_ids, CLIENT_BATCH_SIZE);
    let total = batches.len();
    let mut succeeded = 0usize;
    let mut last_error: Option<ApiError> = None;

    for (index, batch) in batches.iter().enumerate() {
        cancel.check()?;

        if index > 0 {
            tokio::time::sleep(INTER_BATCH_DELAY).await;
        }

        let pairs = QueryPairs::new()
            .with_array("users", batch.iter().copied())
            .with("reputation", "true")
            .with("employer_reputation", "true")
            .with("status", "true")
            .with("jobs", "true")
            .with("badge_details", "true")
            .with("country_details", "true");

        match retry(retry_policy, || {
            client.get::<UserListResponse>(Endpoint::Users, &pairs)
        })
        .await
        {
            Ok(response) => {
                succeeded += 1;
                for raw in response.users.into_vec() {
                    if let Some(profile) = raw.normalize(true) {
                        profiles.insert(profile.id, profile);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Client profile batch {}/{} failed, continuing: {}",
                    index + 1,
                    total,
                    e
                );
                last_error = Some(e);
            }
        }

        progress.report(
            (index + 1) as f32 / total as f32 * 100.0,
            format!("Fetched client profiles {}/{} batches", index + 1, total),
        );
    }

    if succeeded == 0 {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    tracing::info!(
        "Client profile fetch complete: {} of {} clients detailed",
        profiles.len(),
        client_ids.len()
    );

    Ok(profiles)
}
