//! Data merger
//!
//! Pure function joining bids with their project, client, thread, and
//! milestone maps into final rows. Missing references are never fatal: the
//! affected fields degrade to their defaults and the row is still produced.
//! The output preserves the input bid order and is idempotent over its
//! inputs.

use crate::model::{Bid, ClientProfile, Milestone, MilestoneStatus, Project, Row, Thread};
use std::collections::{HashMap, HashSet};

/// Merges bids with their enrichment maps into final rows
///
/// Milestones come from two sources: lists embedded on the bid object and
/// the externally fetched map. Both are unioned, deduplicated by milestone
/// ID so a payment present in both sources is counted once.
pub fn merge_rows(
    bids: &[Bid],
    projects: &HashMap<u64, Project>,
    clients: &HashMap<u64, ClientProfile>,
    threads: &HashMap<u64, Thread>,
    milestones: &HashMap<u64, Vec<Milestone>>,
) -> Vec<Row> {
    bids.iter()
        .map(|bid| merge_one(bid, projects, clients, threads, milestones))
        .collect()
}

fn merge_one(
    bid: &Bid,
    projects: &HashMap<u64, Project>,
    clients: &HashMap<u64, ClientProfile>,
    threads: &HashMap<u64, Thread>,
    milestones: &HashMap<u64, Vec<Milestone>>,
) -> Row {
    let project = projects.get(&bid.project_id);
    let client = project
        .and_then(|p| p.owner_id)
        .and_then(|owner_id| clients.get(&owner_id));
    let thread = threads.get(&bid.project_id);

    let combined = union_milestones(bid, milestones.get(&bid.id));
    let total_milestone_amount = combined
        .iter()
        .filter(|m| m.status == MilestoneStatus::Cleared)
        .map(|m| if m.amount.is_finite() { m.amount } else { 0.0 })
        .sum();

    let response_time_secs = match (thread.and_then(|t| t.first_message_at), bid.submitted_at) {
        (Some(first_message), Some(submitted)) => Some((first_message - submitted).num_seconds()),
        _ => None,
    };

    let time_to_bid_secs = match (bid.submitted_at, project.and_then(|p| p.created_at)) {
        (Some(submitted), Some(created)) => Some((submitted - created).num_seconds()),
        _ => None,
    };

    let bid_to_award_secs = match (bid.awarded_at, bid.submitted_at) {
        (Some(awarded), Some(submitted)) => Some((awarded - submitted).num_seconds()),
        _ => None,
    };

    let price_competitiveness = project
        .and_then(|p| p.average_bid)
        .filter(|avg| *avg != 0.0 && avg.is_finite())
        .map(|avg| round2(bid.amount / avg));

    Row {
        bid_id: bid.id,
        project_id: bid.project_id,
        amount: bid.amount,
        submitted_at: bid.submitted_at,
        award_status: bid.award_status,
        awarded_at: bid.awarded_at,
        paid_amount: bid.paid_amount,

        project_title: project.and_then(|p| p.title.clone()),
        project_type: project.and_then(|p| p.project_type),
        budget_min: project.and_then(|p| p.budget_min),
        budget_max: project.and_then(|p| p.budget_max),
        bid_count: project.and_then(|p| p.bid_count),
        average_bid: project.and_then(|p| p.average_bid),
        skills: project.map(|p| p.skills.clone()).unwrap_or_default(),
        project_created_at: project.and_then(|p| p.created_at),

        client_id: client.map(|c| c.id).or_else(|| project.and_then(|p| p.owner_id)),
        client_name: client.and_then(|c| c.display_name.clone()),
        client_username: client.and_then(|c| c.username.clone()),
        client_country: client.and_then(|c| c.country.clone()),
        client_reputation: client.and_then(|c| c.reputation),
        payment_verified: client.and_then(|c| c.payment_verified),

        total_milestone_amount,
        received_response: thread.is_some(),
        response_time_secs,
        time_to_bid_secs,
        bid_to_award_secs,
        price_competitiveness,
    }
}

/// Unions embedded and externally fetched milestones, dropping duplicates
/// by milestone ID. Milestones without an ID cannot be matched and are kept.
fn union_milestones<'a>(bid: &'a Bid, external: Option<&'a Vec<Milestone>>) -> Vec<&'a Milestone> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut combined = Vec::new();

    for milestone in bid.milestones.iter().chain(external.into_iter().flatten()) {
        match milestone.id {
            Some(id) => {
                if seen.insert(id) {
                    combined.push(milestone);
                }
            }
            None => combined.push(milestone),
        }
    }

    combined
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
