use crate::model::types::{AwardStatus, ProjectType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bid merged with its project, client, thread, and milestones
///
/// Rows are created once, at the end of the pipeline, and are immutable
/// afterwards. They are plain serializable data so datasets round-trip
/// through storage without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    // Bid
    pub bid_id: u64,
    pub project_id: u64,
    pub amount: f64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub award_status: AwardStatus,
    pub awarded_at: Option<DateTime<Utc>>,
    pub paid_amount: f64,

    // Project
    pub project_title: Option<String>,
    pub project_type: Option<ProjectType>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub bid_count: Option<u32>,
    pub average_bid: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub project_created_at: Option<DateTime<Utc>>,

    // Client
    pub client_id: Option<u64>,
    pub client_name: Option<String>,
    pub client_username: Option<String>,
    pub client_country: Option<String>,
    pub client_reputation: Option<f64>,
    pub payment_verified: Option<bool>,

    // Derived
    /// Sum of cleared milestone amounts for this bid
    pub total_milestone_amount: f64,

    /// True iff a conversation thread exists for the project
    pub received_response: bool,

    /// Seconds from bid submission to the client's first message
    pub response_time_secs: Option<i64>,

    /// Seconds from project creation to bid submission
    pub time_to_bid_secs: Option<i64>,

    /// Seconds from bid submission to award
    pub bid_to_award_secs: Option<i64>,

    /// Bid amount relative to the project's average bid, 2 decimals
    pub price_competitiveness: Option<f64>,
}
