use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a bid on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardStatus {
    /// Submitted, no decision yet
    Pending,

    /// Awarded by the client, not yet accepted by the freelancer
    Awarded,

    /// Awarded and accepted; work may have milestones
    Accepted,

    /// Explicitly rejected or revoked
    Rejected,

    /// Any status string this client does not recognize
    Other,
}

impl AwardStatus {
    /// Maps an API status string onto the known variants
    pub fn from_api(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "awarded" => Self::Awarded,
            "accepted" => Self::Accepted,
            "rejected" | "revoked" => Self::Rejected,
            _ => Self::Other,
        }
    }

    /// True for bids that can carry milestone payments
    pub fn is_awarded(&self) -> bool {
        matches!(self, Self::Awarded | Self::Accepted)
    }
}

impl std::fmt::Display for AwardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Awarded => "awarded",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// One freelancer proposal on one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: u64,
    pub project_id: u64,
    pub bidder_id: Option<u64>,
    pub amount: f64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub award_status: AwardStatus,
    pub awarded_at: Option<DateTime<Utc>>,

    /// Running total the API reports as already paid out
    pub paid_amount: f64,

    /// Milestones embedded directly on the bid object, when present
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

/// Fixed-price or hourly engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Fixed,
    Hourly,
}

impl ProjectType {
    pub fn from_api(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "hourly" => Some(Self::Hourly),
            _ => None,
        }
    }
}

/// One marketplace job posting, stub or detailed
///
/// A stub comes embedded in the bid list response (title and owner only);
/// the detailed form is fetched lazily for projects referenced by bids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub title: Option<String>,
    pub owner_id: Option<u64>,
    pub project_type: Option<ProjectType>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub bid_count: Option<u32>,
    pub average_bid: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,

    /// True once the detail endpoint has contributed to this record
    pub detailed: bool,
}

impl Project {
    /// Minimal record with only an ID known
    pub fn stub(id: u64) -> Self {
        Self {
            id,
            title: None,
            owner_id: None,
            project_type: None,
            budget_min: None,
            budget_max: None,
            bid_count: None,
            average_bid: None,
            skills: Vec::new(),
            created_at: None,
            detailed: false,
        }
    }

    /// Folds a detailed record onto this one
    ///
    /// Field-level precedence: the detailed side wins only for fields it
    /// actually provides, so stub-only fields survive the merge.
    pub fn absorb(mut self, detailed: Project) -> Self {
        self.title = detailed.title.or(self.title);
        self.owner_id = detailed.owner_id.or(self.owner_id);
        self.project_type = detailed.project_type.or(self.project_type);
        self.budget_min = detailed.budget_min.or(self.budget_min);
        self.budget_max = detailed.budget_max.or(self.budget_max);
        self.bid_count = detailed.bid_count.or(self.bid_count);
        self.average_bid = detailed.average_bid.or(self.average_bid);
        if !detailed.skills.is_empty() {
            self.skills = detailed.skills;
        }
        self.created_at = detailed.created_at.or(self.created_at);
        self.detailed = self.detailed || detailed.detailed;
        self
    }
}

/// The project owner, stub or detailed-profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: u64,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub country: Option<String>,
    pub reputation: Option<f64>,
    pub payment_verified: Option<bool>,

    /// True once the user endpoint has contributed to this record
    pub detailed: bool,
}

impl ClientProfile {
    pub fn stub(id: u64) -> Self {
        Self {
            id,
            display_name: None,
            username: None,
            country: None,
            reputation: None,
            payment_verified: None,
            detailed: false,
        }
    }

    /// Folds a detailed profile onto this one, same precedence as
    /// [`Project::absorb`]
    pub fn absorb(mut self, detailed: ClientProfile) -> Self {
        self.display_name = detailed.display_name.or(self.display_name);
        self.username = detailed.username.or(self.username);
        self.country = detailed.country.or(self.country);
        self.reputation = detailed.reputation.or(self.reputation);
        self.payment_verified = detailed.payment_verified.or(self.payment_verified);
        self.detailed = self.detailed || detailed.detailed;
        self
    }
}

/// A messaging conversation tied to a project
///
/// Existence of a thread means the client responded to the bid; the first
/// message time drives the response-time metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub project_id: u64,
    pub first_message_at: Option<DateTime<Utc>>,
}

/// Payment state of a milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    /// Released to the freelancer; the only status that counts as paid
    Cleared,
    Pending,
    Other,
}

impl MilestoneStatus {
    pub fn from_api(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "cleared" => Self::Cleared,
            "pending" => Self::Pending,
            _ => Self::Other,
        }
    }
}

/// A discrete payment release tied to a bid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Option<u64>,
    pub bid_id: Option<u64>,
    pub amount: f64,
    pub status: MilestoneStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_status_from_api() {
        assert_eq!(AwardStatus::from_api("pending"), AwardStatus::Pending);
        assert_eq!(AwardStatus::from_api("AWARDED"), AwardStatus::Awarded);
        assert_eq!(AwardStatus::from_api("revoked"), AwardStatus::Rejected);
        assert_eq!(AwardStatus::from_api("canceled"), AwardStatus::Other);
    }

    #[test]
    fn test_only_awarded_statuses_carry_milestones() {
        assert!(AwardStatus::Awarded.is_awarded());
        assert!(AwardStatus::Accepted.is_awarded());
        assert!(!AwardStatus::Pending.is_awarded());
        assert!(!AwardStatus::Rejected.is_awarded());
        assert!(!AwardStatus::Other.is_awarded());
    }

    #[test]
    fn test_project_absorb_prefers_detailed_fields() {
        let mut stub = Project::stub(10);
        stub.title = Some("Stub title".to_string());
        stub.owner_id = Some(99);

        let mut detailed = Project::stub(10);
        detailed.title = Some("Detailed title".to_string());
        detailed.average_bid = Some(250.0);
        detailed.skills = vec!["rust".to_string()];
        detailed.detailed = true;

        let merged = stub.absorb(detailed);

        assert_eq!(merged.title.as_deref(), Some("Detailed title"));
        // Stub-only field survives
        assert_eq!(merged.owner_id, Some(99));
        assert_eq!(merged.average_bid, Some(250.0));
        assert_eq!(merged.skills, vec!["rust".to_string()]);
        assert!(merged.detailed);
    }

    #[test]
    fn test_project_absorb_keeps_stub_when_detailed_is_silent() {
        let mut stub = Project::stub(10);
        stub.title = Some("Stub title".to_string());
        stub.skills = vec!["python".to_string()];

        let merged = stub.clone().absorb(Project::stub(10));

        assert_eq!(merged.title, stub.title);
        assert_eq!(merged.skills, stub.skills);
        assert!(!merged.detailed);
    }

    #[test]
    fn test_client_absorb() {
        let mut stub = ClientProfile::stub(7);
        stub.username = Some("acme".to_string());

        let mut detailed = ClientProfile::stub(7);
        detailed.country = Some("Australia".to_string());
        detailed.payment_verified = Some(true);
        detailed.detailed = true;

        let merged = stub.absorb(detailed);

        assert_eq!(merged.username.as_deref(), Some("acme"));
        assert_eq!(merged.country.as_deref(), Some("Australia"));
        assert_eq!(merged.payment_verified, Some(true));
        assert!(merged.detailed);
    }

    #[test]
    fn test_milestone_status_from_api() {
        assert_eq!(MilestoneStatus::from_api("cleared"), MilestoneStatus::Cleared);
        assert_eq!(MilestoneStatus::from_api("Pending"), MilestoneStatus::Pending);
        assert_eq!(MilestoneStatus::from_api("frozen"), MilestoneStatus::Other);
    }
}
