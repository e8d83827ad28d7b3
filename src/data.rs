//! Data loading and TotalCharges cleaning using Polars

use crate::error::DataError;
use polars::prelude::*;
use tracing::{debug, warn};

pub const CUSTOMER_ID: &str = "customerID";
pub const CONTRACT: &str = "Contract";
pub const PAYMENT_METHOD: &str = "PaymentMethod";
pub const SENIOR_CITIZEN: &str = "SeniorCitizen";
pub const TENURE: &str = "tenure";
pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
pub const TOTAL_CHARGES: &str = "TotalCharges";
pub const CHURN: &str = "Churn";

/// Columns the pipeline reads; everything else in the file is ignored
pub const REQUIRED_COLUMNS: [&str; 8] = [
    CUSTOMER_ID,
    CONTRACT,
    PAYMENT_METHOD,
    SENIOR_CITIZEN,
    TENURE,
    MONTHLY_CHARGES,
    TOTAL_CHARGES,
    CHURN,
];

/// One input row as read from the file, before cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct RawCustomer {
    /// 1-based line in the source file (header is line 1)
    pub line: usize,
    pub customer_id: String,
    pub contract: Option<String>,
    pub payment_method: Option<String>,
    pub senior_citizen: Option<bool>,
    /// Tenure in months
    pub tenure: u32,
    pub monthly_charges: f64,
    /// Untouched TotalCharges text; may be blank or non-numeric
    pub total_charges: Option<String>,
    /// Untouched churn label, validated by the segmenter
    pub churn: String,
}

/// A customer row whose TotalCharges is numeric and present
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub line: usize,
    pub customer_id: String,
    pub contract: Option<String>,
    pub payment_method: Option<String>,
    pub senior_citizen: Option<bool>,
    pub tenure: u32,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub churn: String,
}

impl RawCustomer {
    fn into_customer(self, total_charges: f64) -> Customer {
        Customer {
            line: self.line,
            customer_id: self.customer_id,
            contract: self.contract,
            payment_method: self.payment_method,
            senior_citizen: self.senior_citizen,
            tenure: self.tenure,
            monthly_charges: self.monthly_charges,
            total_charges,
            churn: self.churn,
        }
    }
}

/// Load the customer CSV into raw records
///
/// Schema inference is disabled so every column is read as text and each
/// numeric field goes through an explicit parse.
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * One `RawCustomer` per data row, in file order
pub fn load_customers(file_path: &str) -> crate::Result<Vec<RawCustomer>> {
    let df = LazyCsvReader::new(file_path)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    let names = df.get_column_names();
    for column in REQUIRED_COLUMNS.iter() {
        if !names.contains(column) {
            return Err(DataError::MissingColumn(column.to_string()).into());
        }
    }

    let ids = text_column(&df, CUSTOMER_ID)?;
    let contracts = text_column(&df, CONTRACT)?;
    let payments = text_column(&df, PAYMENT_METHOD)?;
    let seniors = text_column(&df, SENIOR_CITIZEN)?;
    let tenures = text_column(&df, TENURE)?;
    let monthly = text_column(&df, MONTHLY_CHARGES)?;
    let totals = text_column(&df, TOTAL_CHARGES)?;
    let churns = text_column(&df, CHURN)?;

    let mut customers = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let line = row + 2;

        let tenure_text = required(tenures[row], line, TENURE)?;
        let tenure: u32 = tenure_text.parse().map_err(|_| DataError::InvalidNumber {
            line,
            column: TENURE,
            value: tenure_text.to_string(),
        })?;

        let monthly_text = required(monthly[row], line, MONTHLY_CHARGES)?;
        let monthly_charges = monthly_text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DataError::InvalidNumber {
                line,
                column: MONTHLY_CHARGES,
                value: monthly_text.to_string(),
            })?;

        let senior_citizen = match optional(seniors[row]) {
            Some(flag) => {
                Some(parse_flag(&flag).ok_or(DataError::InvalidFlag { line, value: flag })?)
            }
            None => None,
        };

        customers.push(RawCustomer {
            line,
            customer_id: required(ids[row], line, CUSTOMER_ID)?.to_string(),
            contract: optional(contracts[row]),
            payment_method: optional(payments[row]),
            senior_citizen,
            tenure,
            monthly_charges,
            total_charges: totals[row].map(str::to_string),
            churn: required(churns[row], line, CHURN)?.to_string(),
        });
    }

    debug!(rows = customers.len(), path = file_path, "loaded customer rows");
    Ok(customers)
}

/// Coerce TotalCharges to numeric and impute gaps with the column median
///
/// Blank and unparseable values are treated as missing; the median is taken
/// over the values that did parse.
pub fn clean(raw: Vec<RawCustomer>) -> crate::Result<Vec<Customer>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let parsed: Vec<Option<f64>> = raw
        .iter()
        .map(|customer| parse_total_charges(customer.total_charges.as_deref()))
        .collect();

    let mut present: Vec<f64> = parsed.iter().flatten().copied().collect();
    let fill = median(&mut present).ok_or(DataError::NoTotalCharges)?;

    let missing = parsed.len() - present.len();
    if missing > 0 {
        let unparseable = raw
            .iter()
            .zip(&parsed)
            .filter(|(customer, value)| {
                value.is_none()
                    && customer
                        .total_charges
                        .as_deref()
                        .is_some_and(|text| !text.trim().is_empty())
            })
            .count();
        warn!(
            missing,
            unparseable,
            median = fill,
            "imputed missing TotalCharges with column median"
        );
    }

    Ok(raw
        .into_iter()
        .zip(parsed)
        .map(|(customer, value)| customer.into_customer(value.unwrap_or(fill)))
        .collect())
}

/// Parse a raw TotalCharges cell; `None` marks the value as missing
pub fn parse_total_charges(raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Median of the given values (mean of the middle pair for an even count)
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> crate::Result<Vec<Option<&'a str>>> {
    Ok(df.column(name)?.str()?.into_iter().collect())
}

fn required<'a>(
    value: Option<&'a str>,
    line: usize,
    column: &'static str,
) -> std::result::Result<&'a str, DataError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(DataError::MissingValue { line, column })
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "Yes" | "yes" | "true" | "True" => Some(true),
        "0" | "No" | "no" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "customerID,gender,SeniorCitizen,tenure,Contract,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

    fn create_test_csv(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    fn raw(total_charges: Option<&str>) -> RawCustomer {
        RawCustomer {
            line: 2,
            customer_id: "0001-A".to_string(),
            contract: Some("Month-to-month".to_string()),
            payment_method: Some("Electronic check".to_string()),
            senior_citizen: Some(false),
            tenure: 5,
            monthly_charges: 50.0,
            total_charges: total_charges.map(str::to_string),
            churn: "No".to_string(),
        }
    }

    #[test]
    fn test_load_customers() {
        let file = create_test_csv(&[
            "7590-VHVEG,Female,0,1,Month-to-month,Electronic check,29.85,29.85,No",
            "5575-GNVDE,Male,1,34,One year,Mailed check,56.95,1889.5,Yes",
            "4472-LVYGI,Female,0,0,Two year,Bank transfer (automatic),52.55, ,No",
        ]);

        let customers = load_customers(file.path().to_str().unwrap()).unwrap();
        assert_eq!(customers.len(), 3);

        assert_eq!(customers[0].line, 2);
        assert_eq!(customers[0].customer_id, "7590-VHVEG");
        assert_eq!(customers[0].senior_citizen, Some(false));
        assert_eq!(customers[1].senior_citizen, Some(true));
        assert_eq!(customers[1].tenure, 34);
        assert_eq!(customers[1].churn, "Yes");
        assert_eq!(customers[2].tenure, 0);
        assert_eq!(customers[2].total_charges.as_deref(), Some(" "));
        assert_eq!(
            customers[2].payment_method.as_deref(),
            Some("Bank transfer (automatic)")
        );
    }

    #[test]
    fn test_load_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "customerID,tenure,Churn").unwrap();
        writeln!(file, "0001,3,No").unwrap();

        let err = load_customers(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_tenure() {
        let file = create_test_csv(&["0001,Male,0,abc,One year,Mailed check,20.0,20.0,No"]);

        let err = load_customers(file.path().to_str().unwrap()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::InvalidNumber {
                line: 2,
                column: TENURE,
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn test_load_rejects_bad_senior_flag() {
        let file = create_test_csv(&["0001,Male,maybe,3,One year,Mailed check,20.0,60.0,No"]);

        let err = load_customers(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::InvalidFlag { line: 2, .. })
        ));
    }

    #[test]
    fn test_clean_imputes_median() {
        let customers = clean(vec![
            raw(Some("100.0")),
            raw(Some(" 300.0 ")),
            raw(Some(" ")),
            raw(None),
            raw(Some("n/a")),
            raw(Some("200")),
        ])
        .unwrap();

        let totals: Vec<f64> = customers.iter().map(|c| c.total_charges).collect();
        assert_eq!(totals, vec![100.0, 300.0, 200.0, 200.0, 200.0, 200.0]);
        assert!(customers.iter().all(|c| c.total_charges.is_finite()));
    }

    #[test]
    fn test_clean_leaves_other_fields() {
        let input = raw(Some("42.5"));
        let customers = clean(vec![input.clone()]).unwrap();

        assert_eq!(customers[0].total_charges, 42.5);
        assert_eq!(customers[0].customer_id, input.customer_id);
        assert_eq!(customers[0].tenure, input.tenure);
        assert_eq!(customers[0].churn, input.churn);
    }

    #[test]
    fn test_clean_without_numeric_totals() {
        let err = clean(vec![raw(Some("")), raw(None)]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::NoTotalCharges)
        );

        assert!(clean(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_parse_total_charges() {
        assert_eq!(parse_total_charges(Some(" 19.5 ")), Some(19.5));
        assert_eq!(parse_total_charges(Some("   ")), None);
        assert_eq!(parse_total_charges(Some("NaN")), None);
        assert_eq!(parse_total_charges(None), None);
    }
}
