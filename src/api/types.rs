//! Raw response shapes and their normalization
//!
//! The API is inconsistent about shape: payloads sometimes nest under a
//! `result` key and sometimes arrive bare, and keyed collections come back
//! either as `id -> object` maps or as plain arrays. Everything external is
//! deserialized into the tolerant types here and converted into model types
//! before any other module touches it. Missing fields normalize to safe
//! empty values, never errors.

use crate::model::{
    AwardStatus, Bid, ClientProfile, Milestone, MilestoneStatus, Project, ProjectType, Thread,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Strips the optional `result` envelope from a response body
///
/// `{"status": "success", "result": {...}}` and a bare `{...}` both
/// normalize to the inner payload.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// A collection the API returns either as an `id -> item` map or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MapOrList<T> {
    Map(HashMap<String, T>),
    List(Vec<T>),
}

impl<T> MapOrList<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Map(map) => map.into_values().collect(),
            Self::List(list) => list,
        }
    }
}

impl<T> Default for MapOrList<T> {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

fn epoch_to_datetime(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

// ===== Bids =====

#[derive(Debug, Default, Deserialize)]
pub struct BidListResponse {
    #[serde(default)]
    pub bids: Vec<RawBid>,

    /// Stub projects embedded when `project_details=true`
    #[serde(default)]
    pub projects: MapOrList<RawProject>,

    /// Stub users embedded when `user_details=true`
    #[serde(default)]
    pub users: MapOrList<RawUser>,
}

#[derive(Debug, Deserialize)]
pub struct RawBid {
    pub id: Option<u64>,
    pub project_id: Option<u64>,
    pub bidder_id: Option<u64>,
    pub amount: Option<f64>,
    pub time_submitted: Option<i64>,
    pub award_status: Option<String>,
    pub time_awarded: Option<i64>,
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub milestones: Vec<RawMilestone>,
}

impl RawBid {
    /// Converts into a model bid; `None` when the record has no usable identity
    pub fn normalize(self) -> Option<Bid> {
        let id = self.id?;
        let project_id = self.project_id?;
        Some(Bid {
            id,
            project_id,
            bidder_id: self.bidder_id,
            amount: self.amount.unwrap_or(0.0),
            submitted_at: epoch_to_datetime(self.time_submitted),
            award_status: self
                .award_status
                .as_deref()
                .map(AwardStatus::from_api)
                .unwrap_or(AwardStatus::Pending),
            awarded_at: epoch_to_datetime(self.time_awarded),
            paid_amount: self.paid_amount.unwrap_or(0.0),
            milestones: self
                .milestones
                .into_iter()
                .map(|m| m.normalize(Some(id)))
                .collect(),
        })
    }
}

// ===== Projects =====

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListResponse {
    #[serde(default)]
    pub projects: MapOrList<RawProject>,
}

#[derive(Debug, Deserialize)]
pub struct RawProject {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub owner_id: Option<u64>,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub budget: Option<RawBudget>,
    pub bid_stats: Option<RawBidStats>,
    #[serde(default)]
    pub jobs: Vec<RawJob>,
    pub time_submitted: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RawBudget {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawBidStats {
    pub bid_count: Option<u32>,
    pub bid_avg: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawJob {
    pub name: Option<String>,
}

impl RawProject {
    /// Converts into a model project; `detailed` marks records from the
    /// detail endpoint as authoritative for the fields they carry
    pub fn normalize(self, detailed: bool) -> Option<Project> {
        let id = self.id?;
        Some(Project {
            id,
            title: self.title,
            owner_id: self.owner_id,
            project_type: self.project_type.as_deref().and_then(ProjectType::from_api),
            budget_min: self.budget.as_ref().and_then(|b| b.minimum),
            budget_max: self.budget.as_ref().and_then(|b| b.maximum),
            bid_count: self.bid_stats.as_ref().and_then(|s| s.bid_count),
            average_bid: self.bid_stats.as_ref().and_then(|s| s.bid_avg),
            skills: self.jobs.into_iter().filter_map(|j| j.name).collect(),
            created_at: epoch_to_datetime(self.time_submitted),
            detailed,
        })
    }
}

// ===== Users =====

#[derive(Debug, Default, Deserialize)]
pub struct UserListResponse {
    #[serde(default)]
    pub users: MapOrList<RawUser>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub id: Option<u64>,
    pub display_name: Option<String>,
    pub public_name: Option<String>,
    pub username: Option<String>,
    pub location: Option<RawLocation>,
    pub reputation: Option<RawReputation>,
    pub employer_reputation: Option<RawReputation>,
    pub status: Option<RawUserStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub country: Option<RawCountry>,
}

#[derive(Debug, Deserialize)]
pub struct RawCountry {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawReputation {
    pub entire_history: Option<RawReputationPeriod>,
}

#[derive(Debug, Deserialize)]
pub struct RawReputationPeriod {
    pub overall: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawUserStatus {
    pub payment_verified: Option<bool>,
}

impl RawUser {
    pub fn normalize(self, detailed: bool) -> Option<ClientProfile> {
        let id = self.id?;

        // Employer reputation is what matters for a project owner; fall back
        // to the general score when it is absent
        let reputation = self
            .employer_reputation
            .as_ref()
            .or(self.reputation.as_ref())
            .and_then(|r| r.entire_history.as_ref())
            .and_then(|p| p.overall);

        Some(ClientProfile {
            id,
            display_name: self.display_name.or(self.public_name),
            username: self.username,
            country: self
                .location
                .and_then(|l| l.country)
                .and_then(|c| c.name),
            reputation,
            payment_verified: self.status.and_then(|s| s.payment_verified),
            detailed,
        })
    }
}

// ===== Threads =====

#[derive(Debug, Default, Deserialize)]
pub struct ThreadListResponse {
    #[serde(default)]
    pub threads: Vec<RawThread>,
}

#[derive(Debug, Deserialize)]
pub struct RawThread {
    pub context: Option<RawThreadContext>,
    pub time_created: Option<i64>,
    pub message: Option<RawThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub struct RawThreadContext {
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub context_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawThreadMessage {
    pub time_created: Option<i64>,
}

impl RawThread {
    /// Converts into a model thread keyed by its project context
    ///
    /// The first message time falls back to the thread creation time when
    /// no message payload is embedded.
    pub fn normalize(self) -> Option<Thread> {
        let context = self.context?;
        if let Some(kind) = context.context_type.as_deref() {
            if kind != "project" {
                return None;
            }
        }
        let project_id = context.id?;

        let first_message_at = self
            .message
            .and_then(|m| m.time_created)
            .or(self.time_created);

        Some(Thread {
            project_id,
            first_message_at: epoch_to_datetime(first_message_at),
        })
    }
}

// ===== Milestones =====

#[derive(Debug, Default, Deserialize)]
pub struct MilestoneListResponse {
    #[serde(default)]
    pub milestones: MapOrList<RawMilestone>,
}

#[derive(Debug, Deserialize)]
pub struct RawMilestone {
    #[serde(alias = "transaction_id")]
    pub id: Option<u64>,
    pub bid_id: Option<u64>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    pub time_created: Option<i64>,
    pub reason: Option<String>,
}

impl RawMilestone {
    /// Converts into a model milestone, preferring the explicit bid ID from
    /// the payload over the fallback from the surrounding context
    pub fn normalize(self, fallback_bid_id: Option<u64>) -> Milestone {
        // Non-finite amounts coerce to zero so sums never poison
        let amount = self.amount.filter(|a| a.is_finite()).unwrap_or(0.0);

        Milestone {
            id: self.id,
            bid_id: self.bid_id.or(fallback_bid_id),
            amount,
            status: self
                .status
                .as_deref()
                .map(MilestoneStatus::from_api)
                .unwrap_or(MilestoneStatus::Other),
            created_at: epoch_to_datetime(self.time_created),
            reason: self.reason,
        }
    }
}
