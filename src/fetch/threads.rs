//! Conversation thread fetcher
//!
//! Threads are looked up one project at a time against the messaging
//! endpoint. This is the pipeline's dominant cost driver at scale; the
//! signature already takes the full ID set so a batched lookup can slot in
//! without touching callers. A project with no thread is simply absent from
//! the result, never an error.

use crate::api::types::ThreadListResponse;
use crate::api::{retry, ApiClient, ApiError, Endpoint, QueryPairs, RetryPolicy};
use crate::model::Thread;
use crate::pipeline::{CancelToken, StageProgress};
use crate::Result;
use std::collections::HashMap;

/// Fetches the conversation thread for each project, keyed by project ID
pub async fn fetch_threads(
    client: &ApiClient,
    project_ids: &[u64],
    retry_policy: &RetryPolicy,
    progress: &StageProgress<'_>,
    cancel: &CancelToken,
) -> Result<HashMap<u64, Thread>> {
    let mut threads = HashMap::new();

    if project_ids.is_empty() {
        progress.report(100.0, "No projects to look up threads for");
        return Ok(threads);
    }

    let total = project_ids.len();
    let mut succeeded = 0usize;
    let mut last_error: Option<ApiError> = None;

    for (index, project_id) in project_ids.iter().enumerate() {
        cancel.check()?;

        let pairs = QueryPairs::new()
            .with_array("contexts", [*project_id])
            .with("context_type", "project");

        match retry(retry_policy, || {
            client.get::<ThreadListResponse>(Endpoint::Threads, &pairs)
        })
        .await
        {
            Ok(response) => {
                succeeded += 1;
                for raw in response.threads {
                    if let Some(thread) = raw.normalize() {
                        // Keep the earliest thread seen per project
                        threads.entry(thread.project_id).or_insert(thread);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Thread lookup for project {} failed, continuing: {}",
                    project_id,
                    e
                );
                last_error = Some(e);
            }
        }

        progress.report(
            (index + 1) as f32 / total as f32 * 100.0,
            format!("Checked threads for {}/{} projects", index + 1, total),
        );
    }

    if succeeded == 0 {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    tracing::info!(
        "Thread fetch complete: {} of {} projects have a conversation",
        threads.len(),
        project_ids.len()
    );

    Ok(threads)
}
