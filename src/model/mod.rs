//! Domain model for bid-history aggregation
//!
//! # Components
//!
//! - `Bid`, `Project`, `ClientProfile`, `Thread`, `Milestone`: records built
//!   from API responses, with an explicit stub-vs-detailed lifecycle for
//!   projects and clients
//! - `Row`: the final flat record one bid becomes after merging
//!
//! Projects and clients arrive twice: as stubs embedded in the bid list
//! response and, later, as detailed records from their own endpoints.
//! `absorb` folds a detailed record onto a stub with field-level precedence.

mod row;
mod types;

pub use row::Row;
pub use types::{
    AwardStatus, Bid, ClientProfile, Milestone, MilestoneStatus, Project, ProjectType, Thread,
};
