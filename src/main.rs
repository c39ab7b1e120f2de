//! rustcoauthors - OpenAlex coauthorship collector
//!
//! ## Usage
//!
//! ```bash
//! rustcoauthors collect --input participants.csv --column "Full Name" --years 2017-2023
//! rustcoauthors collect --input participants.csv --column full_name --sample 88 --seed 35
//! rustcoauthors resolve "John P. Doe, MD"
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use rustcoauthors::{
    config::{parse_years, CollectConfig, OPENALEX_API_BASE},
    names::clean_author_name,
    pipeline::Pipeline,
    table,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Collect per-publication coauthor rows for a list of researchers from OpenAlex
#[derive(Parser)]
#[command(name = "rustcoauthors")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// OpenAlex API base URL
    #[arg(long, global = true, default_value = OPENALEX_API_BASE)]
    api_base: String,

    /// Email for the OpenAlex polite pool
    #[arg(long, global = true)]
    mailto: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect rows for every author named in a CSV column
    Collect {
        /// Input CSV with author names
        #[arg(short, long)]
        input: PathBuf,

        /// Column holding the author names
        #[arg(short, long)]
        column: String,

        /// Output CSV (default: ./output/papers_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Years that produce rows (e.g., "2017-2023" or "2017,2023")
        #[arg(long, default_value = "2017-2023")]
        years: String,

        /// Process a random sample of this many authors
        #[arg(long)]
        sample: Option<usize>,

        /// Seed for the random sample
        #[arg(long)]
        seed: Option<u64>,

        /// Authors processed concurrently
        #[arg(long, default_value = "1")]
        workers: usize,

        /// Maximum attempts per request
        #[arg(long, default_value = "5")]
        max_attempts: u32,
    },

    /// Resolve a single name and print the matched OpenAlex author
    Resolve {
        /// Author name (credentials are stripped)
        name: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let base = CollectConfig {
        api_base: cli.api_base,
        mailto: cli.mailto,
        ..CollectConfig::default()
    };

    match cli.command {
        Commands::Collect {
            input,
            column,
            output,
            years,
            sample,
            seed,
            workers,
            max_attempts,
        } => {
            let config = CollectConfig {
                years_of_interest: parse_years(&years).context("Invalid --years format")?,
                sample_size: sample,
                seed: Some(seed.unwrap_or_else(rand::random)),
                workers,
                max_attempts,
                ..base
            };
            run_collect(config, input, column, output).await
        }
        Commands::Resolve { name } => run_resolve(base, name).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_collect(
    config: CollectConfig,
    input: PathBuf,
    column: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from("./output").join(format!("papers_{}.csv", timestamp))
    });

    let names = table::read_author_names_from_path(&input, &column)
        .with_context(|| format!("Failed to read names from {}", input.display()))?;
    println!("Loaded {} distinct names from {}", names.len(), input.display());

    if let (Some(size), Some(seed)) = (config.sample_size, config.seed) {
        info!(sample = size, seed = seed, "Sampling enabled");
        println!("Sampling {} authors (seed {})", size.min(names.len()), seed);
    }

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let report = pipeline.run(&names).await;

    table::write_rows_to_path(&output, &report.rows)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let stats = report.stats;
    println!(
        "\n✓ {} rows from {} / {} authors ({} not found, {} without dated works, {} failed)",
        report.rows.len(),
        stats.resolved,
        stats.names,
        stats.not_found,
        stats.no_usable_data,
        stats.failed
    );
    println!(
        "  Dropped publications: {} outside years, {} by title, {} malformed",
        stats.rows.outside_window, stats.rows.excluded_title, stats.rows.malformed
    );
    println!("  Saved: {}", output.display());
    Ok(())
}

async fn run_resolve(config: CollectConfig, name: String) -> Result<()> {
    let cleaned = clean_author_name(&name);
    let pipeline = Pipeline::new(config).context("Invalid configuration")?;

    match pipeline.resolver().resolve(&cleaned).await? {
        Some(resolution) => {
            println!("Query:     {}", cleaned);
            println!("Author:    {}", resolution.author.display_name);
            println!("OpenAlex:  {}", resolution.author.id);
            println!("Matched:   {:?} via {:?}", resolution.rule, resolution.strategy);
            if !resolution.author.alternate_names.is_empty() {
                let alternates: Vec<&str> = resolution
                    .author
                    .alternate_names
                    .iter()
                    .map(String::as_str)
                    .collect();
                println!("Also known as: {}", alternates.join("; "));
            }
        }
        None => println!("No author found for {:?}", cleaned),
    }
    Ok(())
}
