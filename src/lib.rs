//! ChurnForge: A Rust CLI application for customer churn business-impact segmentation
//!
//! This library cleans a customer table, partitions it into cohorts by
//! contract, payment method, tenure band and senior-citizen flag, and ranks
//! the cohorts by revenue at risk.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::Policy;
pub use data::{clean, load_customers, Customer, RawCustomer};
pub use error::DataError;
pub use report::{print_segment_report, write_segments_csv};
pub use segment::{segment, Priority, Segment, SegmentTable, TenureGroup};
pub use viz::generate_visualization_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
