//! Enrichment fetchers
//!
//! Each fetcher paginates or batches over one API resource and returns raw
//! records keyed by ID:
//! - `fetch_bids`: paginated bid history plus embedded stub projects/users
//! - `fetch_project_details`: batched full project details
//! - `fetch_threads`: conversation lookup per project
//! - `fetch_milestones`: batched milestone payments for awarded bids
//! - `fetch_client_profiles`: batched client profiles and verification flags
//!
//! A failed batch never aborts its siblings; a fetcher fails only when every
//! one of its batches fails. Missing response fields degrade to safe empty
//! values in the normalization layer.

mod bids;
mod clients;
mod payments;
mod projects;
mod threads;

pub use bids::{fetch_bids, BidFetchResult, BidQuery};
pub use clients::{fetch_client_profiles, CLIENT_BATCH_SIZE};
pub use payments::{fetch_milestones, MILESTONE_BATCH_SIZE};
pub use projects::{fetch_project_details, PROJECT_BATCH_SIZE};
pub use threads::fetch_threads;
