//! Aggregation orchestrator
//!
//! Drives the enrichment stages in strict dependency order: the bid fetch
//! discovers the project and client IDs everything later needs, so stages
//! never run concurrently. Batches within a stage are likewise sequential;
//! the rate-limit tracker's model assumes serialized request timing.

use crate::api::{ApiClient, RetryPolicy};
use crate::fetch::{
    fetch_bids, fetch_client_profiles, fetch_milestones, fetch_project_details, fetch_threads,
    BidQuery,
};
use crate::model::{Milestone, Row, Thread};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::merger::merge_rows;
use crate::pipeline::progress::{ProgressObserver, Stage, StageProgress};
use crate::{BidscopeError, Result};
use std::collections::{BTreeSet, HashMap};

/// Which stages of the pipeline to run
///
/// Single-stage scopes still run the bid fetch first, since every other
/// stage takes its ID set from the bids; skipped stages leave their fields
/// at defaults in the output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchScope {
    #[default]
    Full,
    BidsOnly,
    ProjectsOnly,
    ThreadsOnly,
    ClientsOnly,
}

impl FetchScope {
    fn runs_project_details(&self) -> bool {
        matches!(self, Self::Full | Self::ProjectsOnly)
    }

    fn runs_threads(&self) -> bool {
        matches!(self, Self::Full | Self::ThreadsOnly)
    }

    fn runs_payments(&self) -> bool {
        matches!(self, Self::Full)
    }

    fn runs_clients(&self) -> bool {
        matches!(self, Self::Full | Self::ClientsOnly)
    }
}

impl std::str::FromStr for FetchScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "all" => Ok(Self::Full),
            "bids" | "bids-only" => Ok(Self::BidsOnly),
            "projects" | "projects-only" => Ok(Self::ProjectsOnly),
            "threads" | "threads-only" => Ok(Self::ThreadsOnly),
            "clients" | "clients-only" => Ok(Self::ClientsOnly),
            other => Err(format!(
                "unknown fetch scope '{}' (expected full, bids-only, projects-only, threads-only, or clients-only)",
                other
            )),
        }
    }
}

impl std::fmt::Display for FetchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Full => "full",
            Self::BidsOnly => "bids-only",
            Self::ProjectsOnly => "projects-only",
            Self::ThreadsOnly => "threads-only",
            Self::ClientsOnly => "clients-only",
        };
        f.write_str(s)
    }
}

/// Runs the multi-stage aggregation pipeline
pub struct Aggregator<'a> {
    client: &'a ApiClient,
    observer: &'a dyn ProgressObserver,
    retry_policy: RetryPolicy,
    cancel: CancelToken,
}

impl<'a> Aggregator<'a> {
    pub fn new(client: &'a ApiClient, observer: &'a dyn ProgressObserver) -> Self {
        Self {
            client,
            observer,
            retry_policy: RetryPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Overrides the per-call retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Token callers can use to stop the run at the next checkpoint
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the pipeline and returns the merged rows
    ///
    /// A stage error that survives retries aborts the remaining stages and
    /// propagates; re-running the whole aggregation is always safe because
    /// every stage is a pure read against IDs.
    pub async fn run(&self, query: &BidQuery, scope: FetchScope) -> Result<Vec<Row>> {
        tracing::info!(
            "Starting aggregation for bidder {} (scope: {})",
            query.bidder_id,
            scope
        );

        // Stage 1: bids, plus embedded stub projects and users
        self.cancel.check()?;
        let progress = StageProgress::new(self.observer, Stage::Bids);
        let fetched = fetch_bids(self.client, query, &self.retry_policy, &progress, &self.cancel)
            .await
            .map_err(stage_err("bids"))?;

        let bids = fetched.bids;
        let mut projects = fetched.projects;
        let mut clients = fetched.clients;

        // IDs discovered by the bid fetch, in deterministic order
        let project_ids: Vec<u64> = bids
            .iter()
            .map(|b| b.project_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Stage 2: project details
        if scope.runs_project_details() {
            self.cancel.check()?;
            let progress = StageProgress::new(self.observer, Stage::ProjectDetails);
            let detailed = fetch_project_details(
                self.client,
                &project_ids,
                &self.retry_policy,
                &progress,
                &self.cancel,
            )
            .await
            .map_err(stage_err("project details"))?;

            for (id, detail) in detailed {
                let merged = match projects.remove(&id) {
                    Some(stub) => stub.absorb(detail),
                    None => detail,
                };
                projects.insert(id, merged);
            }
        }

        // Stage 3: conversation threads
        let mut threads: HashMap<u64, Thread> = HashMap::new();
        if scope.runs_threads() {
            self.cancel.check()?;
            let progress = StageProgress::new(self.observer, Stage::Threads);
            threads = fetch_threads(
                self.client,
                &project_ids,
                &self.retry_policy,
                &progress,
                &self.cancel,
            )
            .await
            .map_err(stage_err("threads"))?;
        }

        // Stage 4: milestone payments for awarded bids
        let mut milestones: HashMap<u64, Vec<Milestone>> = HashMap::new();
        if scope.runs_payments() {
            self.cancel.check()?;
            let progress = StageProgress::new(self.observer, Stage::Payments);
            milestones = fetch_milestones(
                self.client,
                &bids,
                &self.retry_policy,
                &progress,
                &self.cancel,
            )
            .await
            .map_err(stage_err("payments"))?;
        }

        // Stage 5: client profiles for the project owners
        if scope.runs_clients() {
            self.cancel.check()?;
            let client_ids: Vec<u64> = projects
                .values()
                .filter_map(|p| p.owner_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let progress = StageProgress::new(self.observer, Stage::Clients);
            let detailed = fetch_client_profiles(
                self.client,
                &client_ids,
                &self.retry_policy,
                &progress,
                &self.cancel,
            )
            .await
            .map_err(stage_err("clients"))?;

            for (id, detail) in detailed {
                let merged = match clients.remove(&id) {
                    Some(stub) => stub.absorb(detail),
                    None => detail,
                };
                clients.insert(id, merged);
            }
        }

        // Final stage: merge everything into rows
        self.cancel.check()?;
        let progress = StageProgress::new(self.observer, Stage::Merge);
        progress.report(0.0, "Merging records");
        let rows = merge_rows(&bids, &projects, &clients, &threads, &milestones);
        progress.report(100.0, format!("Merged {} rows", rows.len()));

        StageProgress::new(self.observer, Stage::Complete)
            .report(100.0, "Aggregation complete");

        tracing::info!("Aggregation complete: {} rows", rows.len());

        Ok(rows)
    }
}

fn stage_err(stage: &'static str) -> impl FnOnce(BidscopeError) -> BidscopeError {
    move |e| match e {
        BidscopeError::Api(source) => BidscopeError::Stage { stage, source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parsing() {
        assert_eq!("full".parse::<FetchScope>().unwrap(), FetchScope::Full);
        assert_eq!(
            "bids-only".parse::<FetchScope>().unwrap(),
            FetchScope::BidsOnly
        );
        assert_eq!(
            "Projects".parse::<FetchScope>().unwrap(),
            FetchScope::ProjectsOnly
        );
        assert!("everything".parse::<FetchScope>().is_err());
    }

    #[test]
    fn test_scope_stage_matrix() {
        assert!(FetchScope::Full.runs_project_details());
        assert!(FetchScope::Full.runs_threads());
        assert!(FetchScope::Full.runs_payments());
        assert!(FetchScope::Full.runs_clients());

        assert!(!FetchScope::BidsOnly.runs_project_details());
        assert!(!FetchScope::BidsOnly.runs_threads());
        assert!(!FetchScope::BidsOnly.runs_payments());
        assert!(!FetchScope::BidsOnly.runs_clients());

        assert!(FetchScope::ProjectsOnly.runs_project_details());
        assert!(!FetchScope::ProjectsOnly.runs_threads());

        assert!(FetchScope::ThreadsOnly.runs_threads());
        assert!(!FetchScope::ThreadsOnly.runs_clients());

        assert!(FetchScope::ClientsOnly.runs_clients());
        assert!(!FetchScope::ClientsOnly.runs_payments());
    }

    #[test]
    fn test_scope_round_trips_through_display() {
        for scope in [
            FetchScope::Full,
            FetchScope::BidsOnly,
            FetchScope::ProjectsOnly,
            FetchScope::ThreadsOnly,
            FetchScope::ClientsOnly,
        ] {
            assert_eq!(scope.to_string().parse::<FetchScope>().unwrap(), scope);
        }
    }
}
