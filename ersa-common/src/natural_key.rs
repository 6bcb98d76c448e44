//! Natural-key derivation for assessment records
//!
//! Two records with the same six normalized identity fields always produce
//! the same key. The key is the local draft dedup key and the seed for the
//! remote document identifier.

use crate::model::AnalysisRecord;

/// Sentinel substituted for identity fields left blank by the user
pub const UNSPECIFIED: &str = "Sin especificar";

/// Field separator; not expected to occur in any identity field value
pub const KEY_SEPARATOR: &str = "|";

/// Normalize one identity field: trim, and substitute the sentinel when
/// nothing remains. Case and diacritics are preserved verbatim.
pub fn normalize_field(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNSPECIFIED
    } else {
        trimmed
    }
}

/// Derive the composite natural key for a record.
///
/// The six identity fields are normalized independently and joined in
/// fixed order: business unit, plant, shift, area, position, flow.
/// Total function: any record produces a key, even with every field blank.
pub fn natural_key(record: &AnalysisRecord) -> String {
    [
        normalize_field(&record.business_unit),
        normalize_field(&record.plant),
        normalize_field(&record.shift),
        normalize_field(&record.area),
        normalize_field(&record.position),
        normalize_field(&record.flow),
    ]
    .join(KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskLevel;
    use chrono::Utc;

    fn record(unit: &str, plant: &str, shift: &str, area: &str, pos: &str, flow: &str) -> AnalysisRecord {
        AnalysisRecord {
            business_unit: unit.to_string(),
            plant: plant.to_string(),
            shift: shift.to_string(),
            area: area.to_string(),
            position: pos.to_string(),
            flow: flow.to_string(),
            score: 0.0,
            risk_level: RiskLevel::Unknown,
            initial_answers: Default::default(),
            weighting_answers: Default::default(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_key_fixed_order() {
        let r = record("FX", "2", "A001", "Ensamble", "Operador", "flujo1");
        assert_eq!(natural_key(&r), "FX|2|A001|Ensamble|Operador|flujo1");
    }

    #[test]
    fn test_key_deterministic() {
        let r = record("FX", "2", "A001", "Ensamble", "Operador", "flujo1");
        assert_eq!(natural_key(&r), natural_key(&r.clone()));
    }

    #[test]
    fn test_empty_field_gets_sentinel() {
        let r = record("FX", "", "A001", "Ensamble", "Operador", "flujo1");
        assert_eq!(
            natural_key(&r),
            "FX|Sin especificar|A001|Ensamble|Operador|flujo1"
        );
    }

    #[test]
    fn test_whitespace_only_field_gets_sentinel() {
        let r = record("FX", "   ", "A001", "Ensamble", "Operador", "flujo1");
        assert_eq!(
            natural_key(&r),
            "FX|Sin especificar|A001|Ensamble|Operador|flujo1"
        );
    }

    #[test]
    fn test_all_fields_blank() {
        let r = record("", "", "", "", "", "");
        let expected = std::iter::repeat(UNSPECIFIED)
            .take(6)
            .collect::<Vec<_>>()
            .join("|");
        assert_eq!(natural_key(&r), expected);
    }

    #[test]
    fn test_fields_are_trimmed_not_case_folded() {
        let r = record("  FX ", "2", "A001", "Ensamble", "Operador", "flujo1");
        assert_eq!(natural_key(&r), "FX|2|A001|Ensamble|Operador|flujo1");

        let upper = record("fx", "2", "A001", "Ensamble", "Operador", "flujo1");
        assert_ne!(natural_key(&upper), natural_key(&r));
    }
}
