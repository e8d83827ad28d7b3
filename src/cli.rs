//! Command-line interface definitions and argument parsing

use crate::config::Policy;
use clap::Parser;

/// Customer churn segmentation CLI ranking cohorts by revenue at risk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Base output path for the chart PNGs
    #[arg(short, long, default_value = "segments.png")]
    pub output: String,

    /// Also write the ranked segment table to this CSV file
    #[arg(long)]
    pub segments_csv: Option<String>,

    /// JSON file with gross_margin and churn_threshold
    #[arg(long)]
    pub policy: Option<String>,

    /// Gross margin fraction, overrides the policy file
    #[arg(long)]
    pub gross_margin: Option<f64>,

    /// Churn rate threshold fraction, overrides the policy file
    #[arg(long)]
    pub churn_threshold: Option<f64>,

    /// Segments listed per priority quadrant
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    /// Skip chart generation
    #[arg(long)]
    pub no_plots: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve the policy: CLI flags over the policy file over defaults
    pub fn resolve_policy(&self) -> crate::Result<Policy> {
        let base = match self.policy {
            Some(ref path) => Policy::from_file(path)?,
            None => Policy::default(),
        };
        let policy = base.with_overrides(self.gross_margin, self.churn_threshold);
        policy.validate()?;
        Ok(policy)
    }
}
