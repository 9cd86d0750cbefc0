//! Aggregation pipeline
//!
//! This module contains the staged aggregation logic, including:
//! - The orchestrator sequencing the enrichment fetchers
//! - The pure data merger producing final rows
//! - Typed progress reporting with fixed per-stage ranges
//! - Cooperative cancellation between stages and batches

mod cancel;
mod merger;
mod orchestrator;
mod progress;

pub use cancel::CancelToken;
pub use merger::merge_rows;
pub use orchestrator::{Aggregator, FetchScope};
pub use progress::{NullObserver, ProgressEvent, ProgressObserver, Stage, StageProgress};
