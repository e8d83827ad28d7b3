//! Textual report and tabular export of the ranked segment table

use crate::segment::{senior_label, Segment, SegmentTable};
use polars::prelude::*;
use std::fmt::Write as _;
use std::fs::File;
use tracing::info;

const TABLE_HEADER: &str = "  Contract         | PaymentMethod             | Tenure | Senior | Customers | Churn  | Revenue | Tenure(m) | Exp. LTV  | Ret. ROI  | Impact";

fn format_row(out: &mut String, segment: &Segment) {
    let _ = writeln!(
        out,
        "  {:16} | {:25} | {:6} | {:6} | {:9} | {:6.3} | {:7.2} | {:9.2} | {:9.2} | {:9.2} | {:.2}",
        segment.key.contract,
        segment.key.payment_method,
        segment.key.tenure_group.label(),
        senior_label(segment.key.senior_citizen),
        segment.customer_count,
        segment.churn_rate,
        segment.avg_revenue,
        segment.avg_tenure,
        segment.expected_ltv,
        segment.retention_roi,
        segment.impact,
    );
}

/// Render the top `top_n` segments of each priority quadrant and the
/// overall churn rate
pub fn format_segment_report(table: &SegmentTable, top_n: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== Top {} Segments per Priority Quadrant ===", top_n);
    if let Some(threshold) = table.value_threshold {
        let _ = writeln!(
            out,
            "Value threshold (median expected LTV): {:.2}, churn threshold: {:.3}",
            threshold, table.churn_threshold
        );
    }

    for (priority, members) in table.top_by_priority(top_n) {
        let _ = writeln!(out, "\n[{}]", priority);
        let _ = writeln!(out, "{}", TABLE_HEADER);
        for segment in members {
            format_row(&mut out, segment);
        }
    }

    let _ = writeln!(out, "\n=== Churn Rate ===");
    match table.mean_churn_rate() {
        Some(rate) => {
            let _ = writeln!(out, "Mean churn rate across segments: {:.4}", rate);
        }
        None => {
            let _ = writeln!(out, "No segments to report");
        }
    }

    out
}

/// Print the segment report to stdout
pub fn print_segment_report(table: &SegmentTable, top_n: usize) {
    print!("{}", format_segment_report(table, top_n));
}

/// Ranked segment table as a Polars DataFrame, one row per segment
pub fn segments_to_dataframe(table: &SegmentTable) -> crate::Result<DataFrame> {
    let contract: Vec<String> = table.iter().map(|s| s.key.contract.clone()).collect();
    let payment: Vec<String> = table.iter().map(|s| s.key.payment_method.clone()).collect();
    let tenure_group: Vec<&str> = table.iter().map(|s| s.key.tenure_group.label()).collect();
    let senior: Vec<i32> = table.iter().map(|s| i32::from(s.key.senior_citizen)).collect();
    let customers: Vec<u64> = table.iter().map(|s| s.customer_count as u64).collect();
    let churn_rate: Vec<f64> = table.iter().map(|s| s.churn_rate).collect();
    let avg_revenue: Vec<f64> = table.iter().map(|s| s.avg_revenue).collect();
    let avg_tenure: Vec<f64> = table.iter().map(|s| s.avg_tenure).collect();
    let expected_ltv: Vec<f64> = table.iter().map(|s| s.expected_ltv).collect();
    let retention_roi: Vec<f64> = table.iter().map(|s| s.retention_roi).collect();
    let risk_level: Vec<String> = table.iter().map(|s| s.risk_level.to_string()).collect();
    let value_level: Vec<String> = table.iter().map(|s| s.value_level.to_string()).collect();
    let priority: Vec<String> = table.iter().map(|s| s.priority.to_string()).collect();
    let impact: Vec<f64> = table.iter().map(|s| s.impact).collect();

    let df = DataFrame::new(vec![
        Series::new("Contract", contract),
        Series::new("PaymentMethod", payment),
        Series::new("TenureGroup", tenure_group),
        Series::new("SeniorCitizen", senior),
        Series::new("customer", customers),
        Series::new("churn_rate", churn_rate),
        Series::new("avg_revenue", avg_revenue),
        Series::new("avg_tenure", avg_tenure),
        Series::new("expected_ltv", expected_ltv),
        Series::new("retention_ROI", retention_roi),
        Series::new("risk_level", risk_level),
        Series::new("value_level", value_level),
        Series::new("priority", priority),
        Series::new("impact", impact),
    ])?;

    Ok(df)
}

/// Write the ranked segment table as CSV with a header row
pub fn write_segments_csv(table: &SegmentTable, output_path: &str) -> crate::Result<()> {
    let mut df = segments_to_dataframe(table)?;
    let mut file = File::create(output_path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    info!(path = output_path, rows = df.height(), "wrote segment table");
    Ok(())
}
