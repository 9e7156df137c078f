use serde::Serialize;

use super::types::DiagnosisResult;

/// One display row: a suggested diagnosis and its confidence as a whole percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRow {
    pub diagnosis: String,
    pub confidence: f64,
    pub confidence_percent: u8,
}

/// Pair every diagnosis with its confidence, keeping backend order.
pub fn suggestion_rows(result: &DiagnosisResult) -> Vec<SuggestionRow> {
    result
        .potential_diagnoses
        .iter()
        .zip(&result.confidence_levels)
        .map(|(diagnosis, &confidence)| SuggestionRow {
            diagnosis: diagnosis.clone(),
            confidence,
            confidence_percent: to_percent(confidence),
        })
        .collect()
}

fn to_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pair_diagnoses_with_percentages() {
        let result = DiagnosisResult {
            potential_diagnoses: vec!["Bronchitis".into(), "Pneumonia".into()],
            confidence_levels: vec![0.7, 0.256],
            rationale: String::new(),
        };
        let rows = suggestion_rows(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].diagnosis, "Bronchitis");
        assert_eq!(rows[0].confidence_percent, 70);
        assert_eq!(rows[1].confidence_percent, 26);
    }

    #[test]
    fn percent_bounds() {
        assert_eq!(to_percent(0.0), 0);
        assert_eq!(to_percent(1.0), 100);
        assert_eq!(to_percent(0.004), 0);
    }

    #[test]
    fn row_serializes_camel_case() {
        let row = SuggestionRow {
            diagnosis: "Influenza".into(),
            confidence: 0.5,
            confidence_percent: 50,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["confidencePercent"], 50);
    }
}
