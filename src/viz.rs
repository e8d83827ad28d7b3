//! Visualization functions using Plotters for segment impact analysis

use crate::segment::{Dimension, Priority, RiskLevel, SegmentTable, TenureGroup};
use ndarray::Array2;
use plotters::prelude::*;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Bar colors for each priority quadrant, in `Priority::ALL` order
const PRIORITY_COLORS: [RGBColor; 4] = [RED, BLUE, GREEN, MAGENTA];

const RISK_COLORS: [(RiskLevel, RGBColor); 2] = [(RiskLevel::High, RED), (RiskLevel::Low, BLUE)];

/// How expected LTV values sharing a pivot cell are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotAgg {
    /// Sum per cell, empty cells are 0
    Sum,
    /// Mean per cell, empty cells are NaN
    Mean,
}

/// Expected LTV cross-tabulated by two cohort dimensions
#[derive(Debug, Clone)]
pub struct Pivot {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    /// Shape (rows, cols)
    pub values: Array2<f64>,
}

/// Distinct values of a dimension in display order
///
/// Tenure groups always list every band, observed or not.
pub fn categories(table: &SegmentTable, dimension: Dimension) -> Vec<String> {
    if dimension == Dimension::TenureGroup {
        return TenureGroup::ALL.iter().map(|g| g.label().to_string()).collect();
    }
    table
        .iter()
        .map(|s| dimension.value(&s.key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Pivot expected LTV with `rows` down the side and `cols` across the top
pub fn pivot_ltv(table: &SegmentTable, rows: Dimension, cols: Dimension, agg: PivotAgg) -> Pivot {
    let row_labels = categories(table, rows);
    let col_labels = categories(table, cols);
    let shape = (row_labels.len(), col_labels.len());

    let mut sums = Array2::<f64>::zeros(shape);
    let mut counts = Array2::<usize>::zeros(shape);

    for segment in table.iter() {
        let row = row_labels.iter().position(|l| *l == rows.value(&segment.key));
        let col = col_labels.iter().position(|l| *l == cols.value(&segment.key));
        if let (Some(i), Some(j)) = (row, col) {
            sums[[i, j]] += segment.expected_ltv;
            counts[[i, j]] += 1;
        }
    }

    let values = match agg {
        PivotAgg::Sum => sums,
        PivotAgg::Mean => Array2::from_shape_fn(shape, |(i, j)| {
            if counts[[i, j]] == 0 {
                f64::NAN
            } else {
                sums[[i, j]] / counts[[i, j]] as f64
            }
        }),
    };

    Pivot {
        rows: row_labels,
        cols: col_labels,
        values,
    }
}

/// One series of a grouped bar chart: a value (or gap) per category
struct BarGroup {
    label: String,
    color: RGBColor,
    values: Vec<Option<f64>>,
}

/// Label for an integer tick; fractional ticks stay blank
fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn draw_grouped_bars(
    output_path: &str,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    categories: &[String],
    groups: &[BarGroup],
) -> crate::Result<()> {
    if categories.is_empty() || groups.is_empty() {
        anyhow::bail!("Nothing to plot for '{}'", title);
    }

    let all_values = groups.iter().flat_map(|g| g.values.iter().flatten().copied());
    let (y_min, y_max) = all_values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let y_max = if y_max > y_min { y_max * 1.15 } else { y_min + 1.0 };

    let n_categories = categories.len();
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n_categories as f64 - 0.5), y_min..y_max)?;

    let x_formatter = |x: &f64| category_label(categories, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_categories)
        .x_label_formatter(&x_formatter)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let bar_width = 0.8 / groups.len() as f64;
    for (g, group) in groups.iter().enumerate() {
        let color = group.color;
        let bars: Vec<(f64, f64, f64)> = group
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                value.map(|v| {
                    let x0 = i as f64 - 0.4 + g as f64 * bar_width;
                    (x0, x0 + bar_width, v)
                })
            })
            .collect();

        chart
            .draw_series(
                bars.iter()
                    .map(|&(x0, x1, v)| Rectangle::new([(x0, 0.0), (x1, v)], color.filled())),
            )?
            .label(group.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));

        chart.draw_series(bars.iter().map(|&(x0, _, v)| {
            Text::new(format!("{:.2}", v), (x0, v), ("sans-serif", 10).into_font())
        }))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!(path = output_path, "chart saved");

    Ok(())
}

/// Bar chart of mean impact per category of `dimension`, one bar per
/// priority quadrant
pub fn create_impact_chart(
    table: &SegmentTable,
    dimension: Dimension,
    output_path: &str,
) -> crate::Result<()> {
    let cats = categories(table, dimension);

    let groups: Vec<BarGroup> = Priority::ALL
        .iter()
        .zip(PRIORITY_COLORS.iter())
        .filter(|(priority, _)| table.iter().any(|s| s.priority == **priority))
        .map(|(priority, color)| BarGroup {
            label: priority.to_string(),
            color: *color,
            values: cats
                .iter()
                .map(|cat| {
                    let impacts: Vec<f64> = table
                        .iter()
                        .filter(|s| s.priority == *priority && dimension.value(&s.key) == *cat)
                        .map(|s| s.impact)
                        .collect();
                    if impacts.is_empty() {
                        None
                    } else {
                        Some(impacts.iter().sum::<f64>() / impacts.len() as f64)
                    }
                })
                .collect(),
        })
        .collect();

    let title = format!("Impact by Priority and {}", dimension.title());
    draw_grouped_bars(output_path, &title, dimension.title(), "Mean Impact", &cats, &groups)
}

/// Bar chart of total impact per contract type, split by risk level
pub fn create_risk_impact_chart(table: &SegmentTable, output_path: &str) -> crate::Result<()> {
    let cats = categories(table, Dimension::Contract);

    let groups: Vec<BarGroup> = RISK_COLORS
        .iter()
        .filter(|(risk, _)| table.iter().any(|s| s.risk_level == *risk))
        .map(|(risk, color)| BarGroup {
            label: risk.to_string(),
            color: *color,
            values: cats
                .iter()
                .map(|cat| {
                    let total: f64 = table
                        .iter()
                        .filter(|s| s.risk_level == *risk && s.key.contract == *cat)
                        .map(|s| s.impact)
                        .sum();
                    Some(total)
                })
                .collect(),
        })
        .collect();

    draw_grouped_bars(
        output_path,
        "Impact by Contract Type and Risk Level",
        "Contract",
        "Total Impact",
        &cats,
        &groups,
    )
}

/// Yellow-orange-red ramp for `t` in [0, 1]
fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let lerp = |a: u8, b: u8, f: f64| (a as f64 + (b as f64 - a as f64) * f) as u8;
    if t < 0.5 {
        let f = t * 2.0;
        RGBColor(lerp(255, 253, f), lerp(255, 141, f), lerp(178, 60, f))
    } else {
        let f = (t - 0.5) * 2.0;
        RGBColor(lerp(253, 189, f), lerp(141, 0, f), lerp(60, 38, f))
    }
}

/// Purple-teal-yellow ramp for `t` in [0, 1]
fn impact_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let lerp = |a: u8, b: u8, f: f64| (a as f64 + (b as f64 - a as f64) * f) as u8;
    if t < 0.5 {
        let f = t * 2.0;
        RGBColor(lerp(68, 33, f), lerp(1, 145, f), lerp(84, 140, f))
    } else {
        let f = (t - 0.5) * 2.0;
        RGBColor(lerp(33, 253, f), lerp(145, 231, f), lerp(140, 37, f))
    }
}

/// Annotated heatmap of an expected LTV pivot; NaN cells are left blank
pub fn create_ltv_heatmap(
    pivot: &Pivot,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    output_path: &str,
) -> crate::Result<()> {
    let (n_rows, n_cols) = pivot.values.dim();
    if n_rows == 0 || n_cols == 0 {
        anyhow::bail!("Nothing to plot for '{}'", title);
    }

    let (lo, hi) = pivot
        .values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = if hi > lo { hi - lo } else { 1.0 };

    let root = BitMapBackend::new(output_path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(120)
        .build_cartesian_2d(
            -0.5f64..(n_cols as f64 - 0.5),
            -0.5f64..(n_rows as f64 - 0.5),
        )?;

    let x_formatter = |x: &f64| category_label(&pivot.cols, *x);
    let y_formatter = |y: &f64| category_label(&pivot.rows, *y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_cols)
        .y_labels(n_rows)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let cells: Vec<(f64, f64, f64)> = pivot
        .values
        .indexed_iter()
        .map(|((i, j), &v)| (j as f64, i as f64, v))
        .collect();

    chart.draw_series(cells.iter().map(|&(x, y, v)| {
        let style = if v.is_finite() {
            heat_color((v - lo) / span).filled()
        } else {
            WHITE.filled()
        };
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], style)
    }))?;

    chart.draw_series(cells.iter().filter(|(_, _, v)| v.is_finite()).map(|&(x, y, v)| {
        Text::new(format!("{:.2}", v), (x - 0.2, y + 0.1), ("sans-serif", 14).into_font())
    }))?;

    root.present()?;
    info!(path = output_path, "heatmap saved");

    Ok(())
}

/// Scatter of expected LTV against churn rate; bubble area and color follow impact
pub fn create_impact_bubble_chart(table: &SegmentTable, output_path: &str) -> crate::Result<()> {
    if table.is_empty() {
        anyhow::bail!("No segments to plot");
    }

    let ltv_min = table.iter().map(|s| s.expected_ltv).fold(f64::INFINITY, f64::min);
    let ltv_max = table.iter().map(|s| s.expected_ltv).fold(f64::NEG_INFINITY, f64::max);
    let churn_max = table.iter().map(|s| s.churn_rate).fold(0.0, f64::max);
    let impact_max = table.iter().map(|s| s.impact).fold(0.0, f64::max);

    let pad = ((ltv_max - ltv_min) * 0.1).max(1.0);
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Impact Bubble Chart (Size = Impact)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (ltv_min - pad)..(ltv_max + pad),
            0f64..(churn_max * 1.1).max(0.05),
        )?;

    chart
        .configure_mesh()
        .x_desc("Expected LTV")
        .y_desc("Churn Rate")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(table.iter().map(|s| {
        let share = if impact_max > 0.0 {
            (s.impact / impact_max).max(0.0)
        } else {
            0.0
        };
        let radius = (3.0 + 27.0 * share.sqrt()) as i32;
        Circle::new(
            (s.expected_ltv, s.churn_rate),
            radius,
            impact_color(share).mix(0.6).filled(),
        )
    }))?;

    root.present()?;
    info!(path = output_path, "bubble chart saved");

    Ok(())
}

/// `segments.png` + `risk` -> `segments_risk.png`
fn derived_path(base_output_path: &str, suffix: &str) -> String {
    let stem = base_output_path
        .strip_suffix(".png")
        .unwrap_or(base_output_path);
    format!("{}_{}.png", stem, suffix)
}

/// Generate every chart of the report
///
/// The contract impact chart is written to `base_output_path`; the others
/// get a suffix derived from it.
///
/// # Returns
/// * Paths of the written images
pub fn generate_visualization_report(
    table: &SegmentTable,
    base_output_path: &str,
) -> crate::Result<Vec<String>> {
    if table.is_empty() {
        warn!("segment table is empty, skipping charts");
        return Ok(Vec::new());
    }

    let mut written = Vec::new();

    for dimension in Dimension::ALL {
        let path = if dimension == Dimension::Contract {
            base_output_path.to_string()
        } else {
            derived_path(base_output_path, &format!("impact_{}", dimension.slug()))
        };
        create_impact_chart(table, dimension, &path)?;
        written.push(path);
    }

    let risk_path = derived_path(base_output_path, "risk");
    create_risk_impact_chart(table, &risk_path)?;
    written.push(risk_path);

    let heatmaps = [
        (
            Dimension::TenureGroup,
            Dimension::PaymentMethod,
            PivotAgg::Sum,
            "Expected LTV by Tenure and Payment Method",
            "ltv_tenure_payment",
        ),
        (
            Dimension::Contract,
            Dimension::TenureGroup,
            PivotAgg::Mean,
            "Lifetime Value by Tenure and Contract",
            "ltv_contract_tenure",
        ),
        (
            Dimension::Contract,
            Dimension::PaymentMethod,
            PivotAgg::Mean,
            "Lifetime Value by Payment Method and Contract",
            "ltv_contract_payment",
        ),
        (
            Dimension::Contract,
            Dimension::SeniorCitizen,
            PivotAgg::Mean,
            "Lifetime Value by Age and Contract",
            "ltv_contract_senior",
        ),
    ];
    for (rows, cols, agg, title, suffix) in heatmaps {
        let pivot = pivot_ltv(table, rows, cols, agg);
        let path = derived_path(base_output_path, suffix);
        create_ltv_heatmap(&pivot, title, cols.title(), rows.title(), &path)?;
        written.push(path);
    }

    let bubble_path = derived_path(base_output_path, "bubble");
    create_impact_bubble_chart(table, &bubble_path)?;
    written.push(bubble_path);

    Ok(written)
}
