//! Linear pricing model loaded once at startup.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coefficient used when a platform has no coefficient of its own.
pub const DEFAULT_COEFFICIENT_KEY: &str = "default";

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("pricing model not found: {0}")]
    NotFound(String),

    #[error("failed to parse pricing model: {0}")]
    Parse(String),

    #[error("pricing model has no \"default\" coefficient")]
    MissingDefault,

    #[error("pricing model value for {0} is not a finite number")]
    NonFinite(String),
}

/// Static coefficient table. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingModel {
    /// Baseline CPC per platform, plus the mandatory `default` entry.
    pub coefficients: HashMap<String, f64>,
    /// Carried for future use; the current scoring path does not apply it.
    pub intercept: f64,
}

impl PricingModel {
    /// Parse and validate a model from its JSON document.
    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        let model: PricingModel =
            serde_json::from_str(json).map_err(|e| PricingError::Parse(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if !self.coefficients.contains_key(DEFAULT_COEFFICIENT_KEY) {
            return Err(PricingError::MissingDefault);
        }
        if let Some((platform, _)) = self.coefficients.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PricingError::NonFinite(format!("coefficient {:?}", platform)));
        }
        if !self.intercept.is_finite() {
            return Err(PricingError::NonFinite("intercept".to_string()));
        }
        Ok(())
    }

    /// The `default` coefficient.
    pub fn default_coefficient(&self) -> f64 {
        self.coefficients
            .get(DEFAULT_COEFFICIENT_KEY)
            .copied()
            .unwrap_or(0.0)
    }

    /// Platform coefficient, falling back to `default`.
    pub fn baseline_cpc(&self, platform: &str) -> f64 {
        self.coefficients
            .get(platform)
            .copied()
            .unwrap_or_else(|| self.default_coefficient())
    }
}

/// Load the pricing model document from disk.
pub fn load_pricing_model(path: &Path) -> Result<PricingModel, PricingError> {
    if !path.exists() {
        return Err(PricingError::NotFound(path.display().to_string()));
    }
    let json = std::fs::read_to_string(path).map_err(|e| PricingError::Parse(e.to_string()))?;
    PricingModel::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MODEL: &str = r#"{
        "coefficients": {"google": 2.5, "meta": 1.1, "default": 1.75},
        "intercept": 0.3
    }"#;

    #[test]
    fn test_parse_valid_model() {
        let model = PricingModel::from_json(MODEL).unwrap();
        assert_eq!(model.coefficients.len(), 3);
        assert_eq!(model.intercept, 0.3);
        assert_eq!(model.default_coefficient(), 1.75);
    }

    #[test]
    fn test_baseline_prefers_platform_coefficient() {
        let model = PricingModel::from_json(MODEL).unwrap();
        assert_eq!(model.baseline_cpc("google"), 2.5);
        assert_eq!(model.baseline_cpc("tiktok"), 1.75);
    }

    #[test]
    fn test_missing_default_rejected() {
        let err = PricingModel::from_json(r#"{"coefficients": {"google": 2.0}, "intercept": 0}"#)
            .unwrap_err();
        assert!(matches!(err, PricingError::MissingDefault));
    }

    #[test]
    fn test_missing_intercept_rejected() {
        let err = PricingModel::from_json(r#"{"coefficients": {"default": 2.0}}"#).unwrap_err();
        assert!(matches!(err, PricingError::Parse(_)));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = PricingModel::from_json("coefficients = 1").unwrap_err();
        assert!(matches!(err, PricingError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", MODEL).unwrap();
        let model = load_pricing_model(file.path()).unwrap();
        assert_eq!(model.baseline_cpc("meta"), 1.1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_pricing_model(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, PricingError::NotFound(_)));
    }
}
