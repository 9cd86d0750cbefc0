//! Statistics generation from aggregated rows
//!
//! This module computes summary statistics over a dataset's rows for the
//! `--stats` mode and the markdown summary export.

use crate::model::{AwardStatus, Row};
use std::collections::{HashMap, HashSet};

/// Summary statistics over one dataset
#[derive(Debug, Clone)]
pub struct DatasetStats {
    /// Total number of bids (rows)
    pub total_bids: u64,

    /// Count of bids by award status
    pub bids_by_status: HashMap<AwardStatus, u64>,

    /// Bids that were awarded or accepted
    pub awarded_bids: u64,

    /// Bids whose project has a conversation thread
    pub responded_bids: u64,

    /// Number of distinct projects bid on
    pub unique_projects: u64,

    /// Number of distinct clients bid to
    pub unique_clients: u64,

    /// Sum of all bid amounts
    pub total_bid_amount: f64,

    /// Sum of cleared milestone payments
    pub total_paid: f64,

    /// Mean bid amount, when any bids exist
    pub average_bid_amount: Option<f64>,

    /// Mean response time in seconds, over responded bids with timing data
    pub average_response_time_secs: Option<i64>,
}

impl DatasetStats {
    /// Share of bids that received a response, in percent
    pub fn response_rate(&self) -> f64 {
        percentage(self.responded_bids, self.total_bids)
    }

    /// Share of bids that were awarded or accepted, in percent
    pub fn award_rate(&self) -> f64 {
        percentage(self.awarded_bids, self.total_bids)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Computes statistics over a dataset's rows
pub fn compute_statistics(rows: &[Row]) -> DatasetStats {
    let mut bids_by_status: HashMap<AwardStatus, u64> = HashMap::new();
    let mut projects: HashSet<u64> = HashSet::new();
    let mut clients: HashSet<u64> = HashSet::new();

    let mut awarded_bids = 0u64;
    let mut responded_bids = 0u64;
    let mut total_bid_amount = 0.0f64;
    let mut total_paid = 0.0f64;
    let mut response_time_sum = 0i64;
    let mut response_time_count = 0u32;

    for row in rows {
        *bids_by_status.entry(row.award_status).or_insert(0) += 1;
        projects.insert(row.project_id);
        if let Some(client_id) = row.client_id {
            clients.insert(client_id);
        }

        if row.award_status.is_awarded() {
            awarded_bids += 1;
        }
        if row.received_response {
            responded_bids += 1;
        }

        total_bid_amount += row.amount;
        total_paid += row.total_milestone_amount;

        if let Some(secs) = row.response_time_secs {
            response_time_sum += secs;
            response_time_count += 1;
        }
    }

    let total_bids = rows.len() as u64;

    DatasetStats {
        total_bids,
        bids_by_status,
        awarded_bids,
        responded_bids,
        unique_projects: projects.len() as u64,
        unique_clients: clients.len() as u64,
        total_bid_amount,
        total_paid,
        average_bid_amount: if total_bids > 0 {
            Some(total_bid_amount / total_bids as f64)
        } else {
            None
        },
        average_response_time_secs: if response_time_count > 0 {
            Some(response_time_sum / i64::from(response_time_count))
        } else {
            None
        },
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &DatasetStats) {
    println!("=== Dataset Statistics ===\n");
    println!("Total bids:        {}", stats.total_bids);
    println!("Unique projects:   {}", stats.unique_projects);
    println!("Unique clients:    {}", stats.unique_clients);
    println!();
    println!("Awarded bids:      {} ({:.1}%)", stats.awarded_bids, stats.award_rate());
    println!(
        "Responded bids:    {} ({:.1}%)",
        stats.responded_bids,
        stats.response_rate()
    );
    println!();
    println!("Total bid amount:  {:.2}", stats.total_bid_amount);
    if let Some(avg) = stats.average_bid_amount {
        println!("Average bid:       {:.2}", avg);
    }
    println!("Total paid:        {:.2}", stats.total_paid);
    if let Some(secs) = stats.average_response_time_secs {
        println!("Avg response time: {:.1}h", secs as f64 / 3600.0);
    }

    if !stats.bids_by_status.is_empty() {
        println!("\nBids by status:");
        let mut entries: Vec<_> = stats.bids_by_status.iter().collect();
        entries.sort_by_key(|(status, _)| status.to_string());
        for (status, count) in entries {
            println!("  {:<10} {}", status, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AwardStatus;

    fn row(bid_id: u64, project_id: u64, status: AwardStatus, amount: f64) -> Row {
        Row {
            bid_id,
            project_id,
            amount,
            submitted_at: None,
            award_status: status,
            awarded_at: None,
            paid_amount: 0.0,
            project_title: None,
            project_type: None,
            budget_min: None,
            budget_max: None,
            bid_count: None,
            average_bid: None,
            skills: Vec::new(),
            project_created_at: None,
            client_id: None,
            client_name: None,
            client_username: None,
            client_country: None,
            client_reputation: None,
            payment_verified: None,
            total_milestone_amount: 0.0,
            received_response: false,
            response_time_secs: None,
            time_to_bid_secs: None,
            bid_to_award_secs: None,
            price_competitiveness: None,
        }
    }

    #[test]
    fn test_empty_dataset() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_bids, 0);
        assert_eq!(stats.average_bid_amount, None);
        assert_eq!(stats.response_rate(), 0.0);
        assert_eq!(stats.award_rate(), 0.0);
    }

    #[test]
    fn test_counts_and_rates() {
        let mut awarded = row(1, 10, AwardStatus::Awarded, 100.0);
        awarded.received_response = true;
        awarded.response_time_secs = Some(3600);
        awarded.total_milestone_amount = 80.0;
        awarded.client_id = Some(7);

        let mut pending = row(2, 20, AwardStatus::Pending, 50.0);
        pending.client_id = Some(7);

        let rejected = row(3, 10, AwardStatus::Rejected, 70.0);

        let stats = compute_statistics(&[awarded, pending, rejected]);

        assert_eq!(stats.total_bids, 3);
        assert_eq!(stats.awarded_bids, 1);
        assert_eq!(stats.responded_bids, 1);
        assert_eq!(stats.unique_projects, 2);
        assert_eq!(stats.unique_clients, 1);
        assert_eq!(stats.total_bid_amount, 220.0);
        assert_eq!(stats.total_paid, 80.0);
        assert_eq!(stats.average_response_time_secs, Some(3600));
        assert!((stats.award_rate() - 33.333).abs() < 0.01);
        assert_eq!(stats.bids_by_status[&AwardStatus::Rejected], 1);
    }
}
