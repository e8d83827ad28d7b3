//! ChurnForge: Customer churn segmentation CLI
//!
//! This is the main entrypoint that orchestrates loading, cleaning,
//! segmentation, reporting and visualization.

use anyhow::Result;
use churnforge::{clean, load_customers, print_segment_report, segment, viz, write_segments_csv, Args};
use clap::Parser;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    run_pipeline(&args)
}

/// Run the full segmentation pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Churn Segmentation Pipeline ===\n");

    let start_time = Instant::now();
    let policy = args.resolve_policy()?;
    info!(
        gross_margin = policy.gross_margin,
        churn_threshold = policy.churn_threshold,
        "policy resolved"
    );

    // Step 1: Load and clean data
    debug!(input = %args.input, "loading customers");
    let data_start = Instant::now();
    let raw = load_customers(&args.input)?;
    let customers = clean(raw)?;
    println!("✓ Data loaded: {} customers", customers.len());
    debug!(elapsed = ?data_start.elapsed(), "load and clean finished");

    // Step 2: Segment and rank
    let table = segment(&customers, policy.gross_margin, policy.churn_threshold)?;
    println!(
        "✓ Segmented into {} cohorts covering {} customers",
        table.len(),
        table.total_customers()
    );

    // Step 3: Report
    print_segment_report(&table, args.top_n);

    if let Some(ref path) = args.segments_csv {
        write_segments_csv(&table, path)?;
        println!("\nSegment table saved to: {}", path);
    }

    // Step 4: Charts
    if !args.no_plots {
        let viz_start = Instant::now();
        let written = viz::generate_visualization_report(&table, &args.output)?;
        println!("\n✓ {} charts generated", written.len());
        for path in &written {
            println!("  {}", path);
        }
        debug!(elapsed = ?viz_start.elapsed(), "charts finished");
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
