//! Project detail fetcher
//!
//! Projects referenced by bids are detailed lazily: their IDs are batched and
//! each batch is requested with full description, skills, and bid statistics.
//! One failed batch is logged and skipped; the fetch as a whole fails only
//! when every batch fails.

use crate::api::types::ProjectListResponse;
use crate::api::{
    retry, split_into_batches, ApiClient, ApiError, Endpoint, QueryPairs, RetryPolicy,
    INTER_BATCH_DELAY,
};
use crate::model::Project;
use crate::pipeline::{CancelToken, StageProgress};
use crate::Result;
use std::collections::HashMap;

/// The project detail endpoint accepts at most this many IDs per request
pub const PROJECT_BATCH_SIZE: usize = 10;

/// Fetches full details for the given project IDs, keyed by project ID
pub async fn fetch_project_details(
    client: &ApiClient,
    project_ids: &[u64],
    retry_policy: &RetryPolicy,
    progress: &StageProgress<'_>,
    cancel: &CancelToken,
) -> Result<HashMap<u64, Project>> {
    let mut details = HashMap::new();

    if project_ids.is_empty() {
        progress.report(100.0, "No projects to detail");
        return Ok(details);
    }

    let batches = split_into_batches(project_ids, PROJECT_BATCH_SIZE);
    let total = batches.len();
    let mut succeeded = 0usize;
    let mut last_error: Option<ApiError> = None;

    for (index, batch) in batches.iter().enumerate() {
        cancel.check()?;

        if index > 0 {
            tokio::time::sleep(INTER_BATCH_DELAY).await;
        }

        let pairs = QueryPairs::new()
            .with_array("projects", batch.iter().copied())
            .with("full_description", "true")
            .with("jobs", "true")
            .with("upgrades", "true");

        match retry(retry_policy, || {
            client.get::<ProjectListResponse>(Endpoint::Projects, &pairs)
        })
        .await
        {
            Ok(response) => {
                succeeded += 1;
                for raw in response.projects.into_vec() {
                    if let Some(project) = raw.normalize(true) {
                        details.insert(project.id, project);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Project detail batch {}/{} failed, continuing: {}",
                    index + 1,
                    total,
                    e
                );
                last_error = Some(e);
            }
        }

        progress.report(
            (index + 1) as f32 / total as f32 * 100.0,
            format!("Fetched project details {}/{} batches", index + 1, total),
        );
    }

    if succeeded == 0 {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    tracing::info!(
        "Project detail fetch complete: {} of {} projects detailed",
        details.len(),
        project_ids.len()
    );

    Ok(details)
}
