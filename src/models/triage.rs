use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{RiskTier, Uncertainty};

/// Fixed legal text attached to every triage result. Never empty,
/// never overridden by backend output.
pub const DISCLAIMER: &str = "This is not a diagnosis. Seek professional medical care.";

/// Intermediate assessment shape every inference backend (and the
/// rule engine) normalizes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAssessment {
    pub risk_tier: RiskTier,
    pub danger_signs: BTreeSet<String>,
    pub uncertainty: Uncertainty,
    pub recommended_next_steps: Vec<String>,
    pub watch_outs: Vec<String>,
    pub referral_recommended: bool,
    pub reasoning: String,
}

/// Final, persisted decision — exactly one per encounter.
///
/// A superset of [`AiAssessment`] carrying the fallback flag, measured
/// backend latency and the fixed disclaimer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub risk_tier: RiskTier,
    pub danger_signs: BTreeSet<String>,
    pub uncertainty: Uncertainty,
    pub recommended_next_steps: Vec<String>,
    pub watch_outs: Vec<String>,
    pub referral_recommended: bool,
    pub disclaimer: String,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    pub ai_latency_ms: u64,
    pub used_fallback: bool,
}

impl TriageResult {
    /// Assemble the final result from a merged assessment.
    pub fn assemble(assessment: AiAssessment, used_fallback: bool, ai_latency_ms: u64) -> Self {
        Self {
            risk_tier: assessment.risk_tier,
            danger_signs: assessment.danger_signs,
            uncertainty: assessment.uncertainty,
            recommended_next_steps: assessment.recommended_next_steps,
            watch_outs: assessment.watch_outs,
            referral_recommended: assessment.referral_recommended,
            disclaimer: DISCLAIMER.to_string(),
            reasoning: assessment.reasoning,
            timestamp: Utc::now(),
            ai_latency_ms,
            used_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> TriageResult {
        TriageResult {
            risk_tier: RiskTier::Red,
            danger_signs: ["severe chest pain", "difficulty breathing"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            uncertainty: Uncertainty::Medium,
            recommended_next_steps: vec![
                "Seek emergency care immediately.".into(),
                "Do not travel alone if possible.".into(),
            ],
            watch_outs: vec!["Loss of consciousness".into()],
            referral_recommended: true,
            disclaimer: DISCLAIMER.into(),
            reasoning: "Danger signs present in symptom description.".into(),
            timestamp: Utc::now(),
            ai_latency_ms: 742,
            used_fallback: false,
        }
    }

    #[test]
    fn result_round_trips_exactly() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let back: TriageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        // ordered list survives with order intact
        assert_eq!(
            back.recommended_next_steps[0],
            "Seek emergency care immediately."
        );
    }

    #[test]
    fn wire_shape_matches_contract() {
        let json = serde_json::to_value(sample_result()).unwrap();
        for field in [
            "riskTier",
            "dangerSigns",
            "uncertainty",
            "recommendedNextSteps",
            "watchOuts",
            "referralRecommended",
            "disclaimer",
            "reasoning",
            "timestamp",
            "aiLatencyMs",
            "usedFallback",
        ] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
        assert!(json["aiLatencyMs"].is_u64());
    }

    #[test]
    fn assemble_pins_the_disclaimer() {
        let assessment = AiAssessment {
            risk_tier: RiskTier::Green,
            danger_signs: BTreeSet::new(),
            uncertainty: Uncertainty::Low,
            recommended_next_steps: vec!["Home care and monitor symptoms.".into()],
            watch_outs: vec![],
            referral_recommended: false,
            reasoning: "No concerning findings.".into(),
        };
        let result = TriageResult::assemble(assessment, true, 0);
        assert_eq!(result.disclaimer, DISCLAIMER);
        assert!(result.used_fallback);
        assert_eq!(result.ai_latency_ms, 0);
    }
}
