//! Policy constants supplied by the upstream churn model

use crate::error::DataError;
use serde::Deserialize;
use std::fs;

pub const DEFAULT_GROSS_MARGIN: f64 = 0.7;
/// Profit-optimal churn cut-off found by the churn model
pub const DEFAULT_CHURN_THRESHOLD: f64 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Fraction of revenue counted as profit
    pub gross_margin: f64,
    /// Churn rate at or above which a segment is high risk
    pub churn_threshold: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            gross_margin: DEFAULT_GROSS_MARGIN,
            churn_threshold: DEFAULT_CHURN_THRESHOLD,
        }
    }
}

impl Policy {
    /// Read a JSON policy file; absent keys keep their defaults
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        let policy: Policy = serde_json::from_str(&content)?;
        Ok(policy)
    }

    pub fn with_overrides(mut self, gross_margin: Option<f64>, churn_threshold: Option<f64>) -> Self {
        if let Some(margin) = gross_margin {
            self.gross_margin = margin;
        }
        if let Some(threshold) = churn_threshold {
            self.churn_threshold = threshold;
        }
        self
    }

    /// Both constants are fractions in [0, 1]
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("gross_margin", self.gross_margin),
            ("churn_threshold", self.churn_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DataError::InvalidPolicy(format!(
                    "{} must be a fraction between 0 and 1, got {}",
                    name, value
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_policy_file_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "churn_threshold": 0.1 }}"#).unwrap();

        let policy = Policy::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(policy.gross_margin, DEFAULT_GROSS_MARGIN);
        assert_eq!(policy.churn_threshold, 0.1);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let policy = Policy::default().with_overrides(Some(0.5), None);
        assert_eq!(policy.gross_margin, 0.5);
        assert_eq!(policy.churn_threshold, DEFAULT_CHURN_THRESHOLD);
    }

    #[test]
    fn test_validate() {
        assert!(Policy::default().validate().is_ok());

        let bad = Policy::default().with_overrides(Some(1.5), None);
        let err = bad.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::InvalidPolicy(_))
        ));

        let nan = Policy::default().with_overrides(None, Some(f64::NAN));
        assert!(nan.validate().is_err());
    }
}
