//! Integration tests for ChurnForge

use churnforge::segment::{RiskLevel, ValueLevel};
use churnforge::{clean, load_customers, segment, write_segments_csv, DataError, Policy};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,tenure,PhoneService,Contract,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

/// Create a test CSV file with sample telco data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    // Month-to-month, electronic check, first year: churn heavy
    writeln!(file, "7590-VHVEG,Female,0,Yes,1,No,Month-to-month,Electronic check,29.85,29.85,Yes").unwrap();
    writeln!(file, "3668-QPYBK,Male,0,No,2,Yes,Month-to-month,Electronic check,53.85,108.15,Yes").unwrap();
    writeln!(file, "9237-HQITU,Female,0,No,8,Yes,Month-to-month,Electronic check,70.70,151.65,No").unwrap();
    writeln!(file, "4472-LVYGI,Female,0,Yes,0,No,Month-to-month,Electronic check,52.55, ,No").unwrap();

    // One year, mailed check, two to five years
    writeln!(file, "5575-GNVDE,Male,0,No,34,Yes,One year,Mailed check,56.95,1889.5,No").unwrap();
    writeln!(file, "7795-CFOCW,Male,0,No,45,No,One year,Mailed check,42.30,1840.75,No").unwrap();
    writeln!(file, "1452-KIOVK,Male,0,No,40,Yes,One year,Mailed check,89.10,n/a,Yes").unwrap();

    // Two year, credit card, senior, long tenure
    writeln!(file, "6388-TABGU,Male,1,Yes,72,Yes,Two year,Credit card (automatic),104.80,7546.0,No").unwrap();
    writeln!(file, "9305-CDSKC,Female,1,No,66,Yes,Two year,Credit card (automatic),99.65,6576.9,No").unwrap();

    // Missing payment method: no cohort
    writeln!(file, "6713-OKOMC,Female,0,No,10,No,Month-to-month,,29.75,301.9,No").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let file_path = test_file.path().to_str().unwrap();
    let policy = Policy::default();

    let raw = load_customers(file_path).unwrap();
    assert_eq!(raw.len(), 10);

    let customers = clean(raw).unwrap();
    assert!(customers.iter().all(|c| c.total_charges.is_finite()));

    let table = segment(&customers, policy.gross_margin, policy.churn_threshold).unwrap();

    // One cohort per distinct key; the row without a payment method is left out
    assert_eq!(table.len(), 3);
    assert_eq!(table.total_customers(), 9);

    for pair in table.segments.windows(2) {
        assert!(pair[0].impact >= pair[1].impact);
    }

    let senior = table.iter().find(|s| s.key.senior_citizen).unwrap();
    assert_eq!(senior.customer_count, 2);
    assert_eq!(senior.churn_rate, 0.0);
    assert_eq!(senior.risk_level, RiskLevel::Low);
    assert_eq!(senior.value_level, ValueLevel::High);
    assert_eq!(senior.impact, 0.0);

    let monthly = table
        .iter()
        .find(|s| s.key.contract == "Month-to-month")
        .unwrap();
    assert_eq!(monthly.customer_count, 4);
    assert!((monthly.churn_rate - 0.5).abs() < 1e-12);
    assert_eq!(monthly.risk_level, RiskLevel::High);
}

#[test]
fn test_cleaning_imputes_median() {
    let test_file = create_test_csv();
    let customers = clean(load_customers(test_file.path().to_str().unwrap()).unwrap()).unwrap();

    // Eight numeric totals; median of the middle pair (301.9, 1840.75)
    let expected = (301.9 + 1840.75) / 2.0;
    let blank = customers.iter().find(|c| c.customer_id == "4472-LVYGI").unwrap();
    let invalid = customers.iter().find(|c| c.customer_id == "1452-KIOVK").unwrap();
    assert!((blank.total_charges - expected).abs() < 1e-9);
    assert!((invalid.total_charges - expected).abs() < 1e-9);
}

#[test]
fn test_pipeline_is_idempotent() {
    let test_file = create_test_csv();
    let customers = clean(load_customers(test_file.path().to_str().unwrap()).unwrap()).unwrap();

    let first = segment(&customers, 0.7, 0.04).unwrap();
    let second = segment(&customers, 0.7, 0.04).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_invalid_churn_label_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "0001-AAAAA,Male,0,No,5,Yes,One year,Mailed check,20.0,100.0,No").unwrap();
    writeln!(file, "0002-BBBBB,Male,0,No,5,Yes,One year,Mailed check,20.0,100.0,Unknown").unwrap();

    let customers = clean(load_customers(file.path().to_str().unwrap()).unwrap()).unwrap();
    let err = segment(&customers, 0.7, 0.04).unwrap_err();

    assert_eq!(
        err.downcast_ref::<DataError>(),
        Some(&DataError::InvalidChurnLabel {
            line: 3,
            value: "Unknown".to_string(),
        })
    );
}

#[test]
fn test_missing_tenure_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "0001-AAAAA,Male,0,No,,Yes,One year,Mailed check,20.0,100.0,No").unwrap();

    let err = load_customers(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DataError>(),
        Some(DataError::MissingValue { line: 2, column: "tenure" })
    ));
}

#[test]
fn test_segment_table_export() {
    let test_file = create_test_csv();
    let customers = clean(load_customers(test_file.path().to_str().unwrap()).unwrap()).unwrap();
    let table = segment(&customers, 0.7, 0.04).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("segments.csv");
    write_segments_csv(&table, path.to_str().unwrap()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), table.len() + 1);
}
