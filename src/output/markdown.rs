//! Markdown summary generation
//!
//! Renders a saved dataset as a human-readable markdown report: run
//! metadata, headline statistics, and the award-status breakdown.

use crate::output::stats::{compute_statistics, DatasetStats};
use crate::storage::DatasetRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary file for a dataset
///
/// # Arguments
///
/// * `record` - The saved dataset to summarize
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(record: &DatasetRecord, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(record);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a dataset summary as markdown
pub fn format_markdown_summary(record: &DatasetRecord) -> String {
    let stats = compute_statistics(&record.rows);
    let mut md = String::new();

    md.push_str("# Bidscope Dataset Summary\n\n");

    md.push_str("## Dataset\n\n");
    md.push_str(&format!("- **ID**: {}\n", record.id));
    md.push_str(&format!("- **Name**: {}\n", record.name));
    if let Some(from) = &record.metadata.from_date {
        md.push_str(&format!("- **From**: {}\n", from));
    }
    if let Some(to) = &record.metadata.to_date {
        md.push_str(&format!("- **To**: {}\n", to));
    }
    if let Some(limit) = record.metadata.bid_limit {
        md.push_str(&format!("- **Bid limit**: {}\n", limit));
    }
    md.push_str(&format!("- **Saved**: {}\n", record.metadata.saved_at));
    md.push_str(&format!("- **Config hash**: {}\n\n", record.metadata.config_hash));

    md.push_str("## Overall\n\n");
    md.push_str(&format!("- **Total bids**: {}\n", stats.total_bids));
    md.push_str(&format!("- **Unique projects**: {}\n", stats.unique_projects));
    md.push_str(&format!("- **Unique clients**: {}\n", stats.unique_clients));
    md.push_str(&format!(
        "- **Award rate**: {:.1}% ({} bids)\n",
        stats.award_rate(),
        stats.awarded_bids
    ));
    md.push_str(&format!(
        "- **Response rate**: {:.1}% ({} bids)\n",
        stats.response_rate(),
        stats.responded_bids
    ));
    md.push_str(&format!("- **Total bid amount**: {:.2}\n", stats.total_bid_amount));
    if let Some(avg) = stats.average_bid_amount {
        md.push_str(&format!("- **Average bid**: {:.2}\n", avg));
    }
    md.push_str(&format!("- **Total paid**: {:.2}\n", stats.total_paid));
    if let Some(secs) = stats.average_response_time_secs {
        md.push_str(&format!(
            "- **Average response time**: {:.1} hours\n",
            secs as f64 / 3600.0
        ));
    }
    md.push('\n');

    push_status_breakdown(&mut md, &stats);

    md
}

fn push_status_breakdown(md: &mut String, stats: &DatasetStats) {
    if stats.bids_by_status.is_empty() {
        return;
    }

    md.push_str("## Bids by Status\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");

    let mut entries: Vec<_> = stats.bids_by_status.iter().collect();
    entries.sort_by_key(|(status, _)| status.to_string());
    for (status, count) in entries {
        md.push_str(&format!("| {} | {} |\n", status, count));
    }
    md.push('\n');
}
