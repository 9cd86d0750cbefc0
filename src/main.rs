//! Bidscope main entry point
//!
//! This is the command-line interface for the Bidscope bid-history
//! aggregator.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bidscope::api::ApiClient;
use bidscope::config::{load_config_with_hash, Config};
use bidscope::fetch::BidQuery;
use bidscope::output::{compute_statistics, generate_markdown_summary, print_statistics};
use bidscope::pipeline::{Aggregator, FetchScope, ProgressEvent, ProgressObserver};
use bidscope::storage::{
    generate_dataset_id, DatasetMetadata, DatasetRecord, DatasetStore, SqliteStore,
};

/// Bidscope: a polite bid-history aggregator
///
/// Bidscope fetches a freelancer's bid history from the marketplace API,
/// enriches it with project, conversation, payment, and client data while
/// respecting the API's rate limits, and stores the merged rows as named
/// local datasets.
#[derive(Parser, Debug)]
#[command(name = "bidscope")]
#[command(version = "1.0.0")]
#[command(about = "A polite bid-history aggregator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Name for the saved dataset (defaults to a timestamped name)
    #[arg(long)]
    name: Option<String>,

    /// Pipeline scope: full, bids-only, projects-only, threads-only, clients-only
    #[arg(long, value_name = "SCOPE", default_value = "full")]
    fetch_type: String,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["list_datasets", "stats", "export_summary", "delete_dataset"])]
    dry_run: bool,

    /// List saved datasets and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_summary", "delete_dataset"])]
    list_datasets: bool,

    /// Show statistics for a saved dataset and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "list_datasets", "export_summary", "delete_dataset"])]
    stats: Option<String>,

    /// Generate a markdown summary for a saved dataset and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "list_datasets", "stats", "delete_dataset"])]
    export_summary: Option<String>,

    /// Delete a saved dataset and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "list_datasets", "stats", "export_summary"])]
    delete_dataset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.list_datasets {
        handle_list_datasets(&config)?;
    } else if let Some(id) = &cli.stats {
        handle_stats(&config, id)?;
    } else if let Some(id) = &cli.export_summary {
        handle_export_summary(&config, id)?;
    } else if let Some(id) = &cli.delete_dataset {
        handle_delete_dataset(&config, id)?;
    } else {
        handle_fetch(&config, &config_hash, cli.name, &cli.fetch_type).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bidscope=info,warn"),
            1 => EnvFilter::new("bidscope=debug,info"),
            2 => EnvFilter::new("bidscope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Progress observer that logs pipeline steps
struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, event: ProgressEvent) {
        tracing::info!("[{:>5.1}%] {}", event.percent, event.message);
    }
}

/// Handles the --dry-run mode: validates config and shows the fetch plan
fn handle_dry_run(config: &Config) {
    println!("=== Bidscope Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  User ID: {}", config.api.user_id);
    println!(
        "  Token: {}",
        if config.api.resolve_token().is_some() {
            "configured"
        } else {
            "NOT configured"
        }
    );

    println!("\nFetch window:");
    println!(
        "  From: {}",
        config.fetch.from_date.as_deref().unwrap_or("(unbounded)")
    );
    println!(
        "  To: {}",
        config.fetch.to_date.as_deref().unwrap_or("(unbounded)")
    );
    println!(
        "  Bid limit: {}",
        config
            .fetch
            .bid_limit
            .map(|l| l.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  Page size: {}", config.fetch.page_size);
    println!("  Aggressiveness: {}", config.fetch.aggressiveness);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would aggregate bids for user {} in five stages",
        config.api.user_id
    );
}

/// Handles the main aggregation run
async fn handle_fetch(
    config: &Config,
    config_hash: &str,
    name: Option<String>,
    fetch_type: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let scope: FetchScope = fetch_type.parse()?;

    let token = config.api.resolve_token();
    if token.is_none() {
        tracing::warn!("No API token configured; requests will be unauthenticated");
    }

    let client = ApiClient::new(&config.api.base_url, token, config.fetch.aggressiveness)?;

    let query = BidQuery {
        bidder_id: config.api.user_id,
        from_time: config.fetch.from_epoch(),
        to_time: config.fetch.to_epoch(),
        limit: config.fetch.bid_limit,
        page_size: config.fetch.page_size,
    };

    let observer = LogProgress;
    let aggregator = Aggregator::new(&client, &observer);

    let rows = match aggregator.run(&query, scope).await {
        Ok(rows) => rows,
        Err(e) => {
            // Partial results are never saved; the run either completes or fails
            tracing::error!("Aggregation failed: {}", e);
            return Err(e.into());
        }
    };

    let stats = client.stats();
    tracing::info!(
        "API usage: {} calls, {} failures",
        stats.total_calls,
        stats.total_failures
    );
    if client.is_rate_limited() {
        tracing::warn!("Rate-limit headroom was low during this run");
    }

    // Save the dataset
    let now = chrono::Utc::now().to_rfc3339();
    let record = DatasetRecord {
        id: generate_dataset_id(),
        name: name.unwrap_or_else(|| {
            format!("Aggregation {}", chrono::Utc::now().format("%Y-%m-%d %H:%M"))
        }),
        metadata: DatasetMetadata {
            from_date: config.fetch.from_date.clone(),
            to_date: config.fetch.to_date.clone(),
            bid_limit: config.fetch.bid_limit,
            row_count: rows.len() as u64,
            saved_at: now.clone(),
            last_modified: now,
            config_hash: config_hash.to_string(),
        },
        rows,
    };

    let mut store = SqliteStore::new(std::path::Path::new(&config.output.database_path))?;
    store.save_dataset(&record)?;

    println!(
        "✓ Saved dataset '{}' ({}) with {} rows",
        record.name, record.id, record.metadata.row_count
    );

    print_statistics(&compute_statistics(&record.rows));

    Ok(())
}

/// Handles the --list-datasets mode
fn handle_list_datasets(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(std::path::Path::new(&config.output.database_path))?;
    let datasets = store.list_datasets()?;

    if datasets.is_empty() {
        println!("No datasets saved yet.");
        return Ok(());
    }

    println!("{} dataset(s):\n", datasets.len());
    for summary in datasets {
        println!(
            "  {}  {:<30}  {} rows  saved {}",
            summary.id, summary.name, summary.metadata.row_count, summary.metadata.saved_at
        );
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics for a saved dataset
fn handle_stats(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(std::path::Path::new(&config.output.database_path))?;

    let record = store
        .get_dataset(id)?
        .ok_or_else(|| bidscope::BidscopeError::DatasetNotFound(id.to_string()))?;

    println!("Dataset: {} ({})\n", record.name, record.id);
    print_statistics(&compute_statistics(&record.rows));

    Ok(())
}

/// Handles the --export-summary mode: generates a markdown summary
fn handle_export_summary(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(std::path::Path::new(&config.output.database_path))?;

    let record = store
        .get_dataset(id)?
        .ok_or_else(|| bidscope::BidscopeError::DatasetNotFound(id.to_string()))?;

    let path = std::path::Path::new(&config.output.summary_path);
    generate_markdown_summary(&record, path)?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the --delete-dataset mode
fn handle_delete_dataset(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::new(std::path::Path::new(&config.output.database_path))?;

    if store.delete_dataset(id)? {
        println!("✓ Deleted dataset {}", id);
        Ok(())
    } else {
        Err(bidscope::BidscopeError::DatasetNotFound(id.to_string()).into())
    }
}
