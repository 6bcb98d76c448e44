//! Domain model for standing-posture risk assessments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighting-score cut points for risk classification
const MEDIUM_RISK_FLOOR: f64 = 40.0;
const HIGH_RISK_FLOOR: f64 = 70.0;

/// Risk level derived from the weighting-question score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "bajo")]
    Low,
    #[serde(rename = "medio")]
    Medium,
    #[serde(rename = "alto")]
    High,
    #[default]
    #[serde(rename = "desconocido")]
    Unknown,
    #[serde(rename = "no_aplica")]
    NotApplicable,
}

impl RiskLevel {
    /// Classify a weighting-question total.
    ///
    /// Scores below 40 are Low, below 70 Medium, and 70 or above High.
    /// Negative or non-finite totals cannot come from a completed
    /// questionnaire and classify as Unknown.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() || score < 0.0 {
            RiskLevel::Unknown
        } else if score < MEDIUM_RISK_FLOOR {
            RiskLevel::Low
        } else if score < HIGH_RISK_FLOOR {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// One completed or in-progress risk assessment.
///
/// The six identity fields (business unit through flow) determine the
/// record's natural key; everything else is assessment payload. Field
/// names on the wire match the persisted draft format (`businessUnit`,
/// `flujo`, `initialAnswers`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    #[serde(default)]
    pub business_unit: String,
    #[serde(default)]
    pub plant: String,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub position: String,
    /// Workflow/path identifier for the questionnaire branch taken
    #[serde(default, rename = "flujo")]
    pub flow: String,

    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,

    /// Initial screening answers, keyed by question index
    #[serde(default)]
    pub initial_answers: BTreeMap<u32, String>,
    /// Weighting answers, keyed by question index
    #[serde(default)]
    pub weighting_answers: BTreeMap<u32, f64>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_cut_points() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(39.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(120.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_invalid_scores() {
        assert_eq!(RiskLevel::from_score(-1.0), RiskLevel::Unknown);
        assert_eq!(RiskLevel::from_score(f64::NAN), RiskLevel::Unknown);
        assert_eq!(RiskLevel::from_score(f64::INFINITY), RiskLevel::Unknown);
    }

    #[test]
    fn test_record_wire_names() {
        let record = AnalysisRecord {
            business_unit: "FX".to_string(),
            plant: "2".to_string(),
            shift: "A001".to_string(),
            area: "Ensamble".to_string(),
            position: "Operador".to_string(),
            flow: "flujo1".to_string(),
            score: 42.0,
            risk_level: RiskLevel::Medium,
            initial_answers: BTreeMap::new(),
            weighting_answers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["businessUnit"], "FX");
        assert_eq!(json["flujo"], "flujo1");
        assert_eq!(json["riskLevel"], "medio");
    }

    #[test]
    fn test_record_missing_fields_default() {
        // Partial payloads still deserialize; identity gaps become empty
        // strings and the natural-key layer substitutes the sentinel.
        let record: AnalysisRecord =
            serde_json::from_str(r#"{"businessUnit":"FX","score":10}"#).unwrap();
        assert_eq!(record.business_unit, "FX");
        assert_eq!(record.plant, "");
        assert_eq!(record.score, 10.0);
        assert_eq!(record.risk_level, RiskLevel::Unknown);
    }
}
