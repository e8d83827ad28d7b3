//! Cohort segmentation: aggregation, value/risk classification and impact ranking

use crate::data::{median, Customer};
use crate::error::DataError;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Fixed tenure bands with bin edges (-1, 12, 24, 60, +inf], right-inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenureGroup {
    UpToOneYear,
    OneToTwoYears,
    TwoToFiveYears,
    OverFiveYears,
}

impl TenureGroup {
    pub const ALL: [TenureGroup; 4] = [
        TenureGroup::UpToOneYear,
        TenureGroup::OneToTwoYears,
        TenureGroup::TwoToFiveYears,
        TenureGroup::OverFiveYears,
    ];

    /// Band for a tenure in months; month 0 falls in the first band
    pub fn from_months(months: u32) -> Self {
        match months {
            0..=12 => TenureGroup::UpToOneYear,
            13..=24 => TenureGroup::OneToTwoYears,
            25..=60 => TenureGroup::TwoToFiveYears,
            _ => TenureGroup::OverFiveYears,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TenureGroup::UpToOneYear => "0-1yr",
            TenureGroup::OneToTwoYears => "1-2yrs",
            TenureGroup::TwoToFiveYears => "2-5yrs",
            TenureGroup::OverFiveYears => "5+yrs",
        }
    }
}

impl fmt::Display for TenureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Encoded churn outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Churn {
    Retained,
    Churned,
}

impl Churn {
    /// Only the exact labels "No" and "Yes" are accepted
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "No" => Some(Churn::Retained),
            "Yes" => Some(Churn::Churned),
            _ => None,
        }
    }

    pub fn encoded(self) -> f64 {
        match self {
            Churn::Retained => 0.0,
            Churn::Churned => 1.0,
        }
    }
}

/// Partition key shared by every customer of a cohort
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CohortKey {
    pub contract: String,
    pub payment_method: String,
    pub tenure_group: TenureGroup,
    pub senior_citizen: bool,
}

impl CohortKey {
    /// `None` when any categorical part of the key is missing
    pub fn from_customer(customer: &Customer) -> Option<Self> {
        Some(CohortKey {
            contract: customer.contract.clone()?,
            payment_method: customer.payment_method.clone()?,
            tenure_group: TenureGroup::from_months(customer.tenure),
            senior_citizen: customer.senior_citizen?,
        })
    }
}

/// The cohort key components, used to slice the segment table for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Contract,
    PaymentMethod,
    TenureGroup,
    SeniorCitizen,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Contract,
        Dimension::PaymentMethod,
        Dimension::TenureGroup,
        Dimension::SeniorCitizen,
    ];

    pub fn value(&self, key: &CohortKey) -> String {
        match self {
            Dimension::Contract => key.contract.clone(),
            Dimension::PaymentMethod => key.payment_method.clone(),
            Dimension::TenureGroup => key.tenure_group.label().to_string(),
            Dimension::SeniorCitizen => senior_label(key.senior_citizen).to_string(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Contract => "Contract",
            Dimension::PaymentMethod => "Payment Method",
            Dimension::TenureGroup => "Tenure Group",
            Dimension::SeniorCitizen => "Senior Citizen",
        }
    }

    /// File-name friendly identifier
    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::Contract => "contract",
            Dimension::PaymentMethod => "payment_method",
            Dimension::TenureGroup => "tenure_group",
            Dimension::SeniorCitizen => "senior_citizen",
        }
    }
}

pub fn senior_label(senior_citizen: bool) -> &'static str {
    if senior_citizen {
        "1"
    } else {
        "0"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    High,
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => f.write_str("High Risk"),
            RiskLevel::Low => f.write_str("Low Risk"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueLevel {
    High,
    Low,
}

impl fmt::Display for ValueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLevel::High => f.write_str("High Value"),
            ValueLevel::Low => f.write_str("Low Value"),
        }
    }
}

/// Value/risk quadrant of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority {
    pub value: ValueLevel,
    pub risk: RiskLevel,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority { value: ValueLevel::High, risk: RiskLevel::High },
        Priority { value: ValueLevel::High, risk: RiskLevel::Low },
        Priority { value: ValueLevel::Low, risk: RiskLevel::High },
        Priority { value: ValueLevel::Low, risk: RiskLevel::Low },
    ];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}&{}", self.value, self.risk)
    }
}

/// Aggregated statistics and classification of one cohort
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub key: CohortKey,
    pub customer_count: usize,
    pub churn_rate: f64,
    pub avg_revenue: f64,
    pub avg_tenure: f64,
    pub expected_ltv: f64,
    pub retention_roi: f64,
    pub risk_level: RiskLevel,
    pub value_level: ValueLevel,
    pub priority: Priority,
    pub impact: f64,
}

/// Segments ranked by descending impact
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTable {
    pub segments: Vec<Segment>,
    /// Median expected LTV across segments; `None` for an empty table
    pub value_threshold: Option<f64>,
    pub gross_margin: f64,
    pub churn_threshold: f64,
}

impl SegmentTable {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn total_customers(&self) -> usize {
        self.segments.iter().map(|s| s.customer_count).sum()
    }

    /// Unweighted mean of the per-segment churn rates
    pub fn mean_churn_rate(&self) -> Option<f64> {
        if self.segments.is_empty() {
            return None;
        }
        let total: f64 = self.segments.iter().map(|s| s.churn_rate).sum();
        Some(total / self.segments.len() as f64)
    }

    /// First `n` ranked segments of each quadrant, quadrants ordered by
    /// their first appearance in the ranking
    pub fn top_by_priority(&self, n: usize) -> Vec<(Priority, Vec<&Segment>)> {
        let mut groups: Vec<(Priority, Vec<&Segment>)> = Vec::new();
        for segment in &self.segments {
            match groups.iter_mut().find(|(p, _)| *p == segment.priority) {
                Some((_, members)) => {
                    if members.len() < n {
                        members.push(segment);
                    }
                }
                None => {
                    let members = if n > 0 { vec![segment] } else { Vec::new() };
                    groups.push((segment.priority, members));
                }
            }
        }
        groups
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    churn_sum: f64,
    revenue_sum: f64,
    tenure_sum: f64,
}

impl Accumulator {
    fn add(&mut self, churn: Churn, customer: &Customer) {
        self.count += 1;
        self.churn_sum += churn.encoded();
        self.revenue_sum += customer.monthly_charges;
        self.tenure_sum += f64::from(customer.tenure);
    }

    fn finish(&self) -> CohortStats {
        let n = self.count as f64;
        CohortStats {
            customer_count: self.count,
            churn_rate: self.churn_sum / n,
            avg_revenue: self.revenue_sum / n,
            avg_tenure: self.tenure_sum / n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CohortStats {
    customer_count: usize,
    churn_rate: f64,
    avg_revenue: f64,
    avg_tenure: f64,
}

pub fn expected_ltv(avg_revenue: f64, avg_tenure: f64, gross_margin: f64) -> f64 {
    avg_revenue * avg_tenure * gross_margin
}

pub fn retention_roi(expected_ltv: f64, churn_rate: f64) -> f64 {
    expected_ltv * (1.0 - churn_rate)
}

pub fn impact_score(customer_count: usize, expected_ltv: f64, churn_rate: f64) -> f64 {
    customer_count as f64 * expected_ltv * churn_rate
}

pub fn classify_risk(churn_rate: f64, churn_threshold: f64) -> RiskLevel {
    if churn_rate >= churn_threshold {
        RiskLevel::High
    } else {
        RiskLevel::Low
    }
}

pub fn classify_value(expected_ltv: f64, value_threshold: f64) -> ValueLevel {
    if expected_ltv >= value_threshold {
        ValueLevel::High
    } else {
        ValueLevel::Low
    }
}

/// Build the ranked segment table from cleaned customers
///
/// # Arguments
/// * `customers` - Cleaned customer rows
/// * `gross_margin` - Fraction of revenue counted as profit
/// * `churn_threshold` - Churn rate at or above which a segment is high risk
///
/// # Returns
/// * `SegmentTable` sorted by descending impact
pub fn segment(
    customers: &[Customer],
    gross_margin: f64,
    churn_threshold: f64,
) -> crate::Result<SegmentTable> {
    let mut cohorts: BTreeMap<CohortKey, Accumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for customer in customers {
        let churn = Churn::parse(&customer.churn).ok_or_else(|| DataError::InvalidChurnLabel {
            line: customer.line,
            value: customer.churn.clone(),
        })?;

        match CohortKey::from_customer(customer) {
            Some(key) => cohorts.entry(key).or_default().add(churn, customer),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "rows with an incomplete cohort key were left out");
    }

    let stats: Vec<(CohortKey, CohortStats)> = cohorts
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect();

    let mut ltvs: Vec<f64> = stats
        .iter()
        .map(|(_, s)| expected_ltv(s.avg_revenue, s.avg_tenure, gross_margin))
        .collect();
    let value_threshold = median(&mut ltvs);
    debug!(?value_threshold, "expected LTV median");

    let mut segments: Vec<Segment> = stats
        .into_iter()
        .map(|(key, s)| {
            let ltv = expected_ltv(s.avg_revenue, s.avg_tenure, gross_margin);
            let risk_level = classify_risk(s.churn_rate, churn_threshold);
            // a non-empty stats list always yields a threshold
            let value_level = classify_value(ltv, value_threshold.unwrap_or(ltv));
            Segment {
                key,
                customer_count: s.customer_count,
                churn_rate: s.churn_rate,
                avg_revenue: s.avg_revenue,
                avg_tenure: s.avg_tenure,
                expected_ltv: ltv,
                retention_roi: retention_roi(ltv, s.churn_rate),
                risk_level,
                value_level,
                priority: Priority {
                    value: value_level,
                    risk: risk_level,
                },
                impact: impact_score(s.customer_count, ltv, s.churn_rate),
            }
        })
        .collect();

    segments.sort_by(|a, b| b.impact.total_cmp(&a.impact));

    info!(
        segments = segments.len(),
        customers = customers.len() - skipped,
        "segmented customers"
    );

    Ok(SegmentTable {
        segments,
        value_threshold,
        gross_margin,
        churn_threshold,
    })
}
