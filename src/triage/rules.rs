//! Deterministic fallback classifier.
//!
//! Produces a minimal viable assessment whenever the configured inference
//! backend fails, times out, or is administratively disabled. Zero I/O,
//! constant time, always a non-empty next-step list.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AiAssessment, Demographics, RiskTier, Uncertainty};

/// Emergency keywords — any hit classifies RED.
static RED_TERMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bchest\s+pain\b",
        r"(?i)\b(?:cannot|can't|unable\s+to)\s+breathe\b",
        r"(?i)\b(?:difficulty|trouble)\s+breathing\b",
        r"(?i)\bunconscious(?:ness)?\b",
        r"(?i)\bseizures?\b",
        r"(?i)\bconvulsions?\b",
        r"(?i)\bsevere\s+bleeding\b",
    ])
});

/// Concerning-but-not-emergent keywords — classify YELLOW.
static YELLOW_TERMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bfevers?\b",
        r"(?i)\bvomit(?:ing)?\b",
        r"(?i)\bdiarrh?oea\b",
        r"(?i)\bpain\b",
        r"(?i)\bcough(?:ing)?\b",
        r"(?i)\bweakness\b",
        r"(?i)\bdizz(?:y|iness)\b",
        r"(?i)\brash\b",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("Invalid rule-engine regex pattern"))
        .collect()
}

/// Ages outside this band get one tier of extra caution on the GREEN path.
const YOUNG_AGE_CUTOFF: u8 = 5;
const ELDERLY_AGE_CUTOFF: u8 = 75;

/// Classify symptoms with deterministic heuristics.
pub fn classify(symptom_text: &str, demographics: &Demographics) -> AiAssessment {
    if RED_TERMS.iter().any(|r| r.is_match(symptom_text)) {
        return AiAssessment {
            risk_tier: RiskTier::Red,
            danger_signs: BTreeSet::from(["critical symptom pattern".to_string()]),
            uncertainty: Uncertainty::Low,
            recommended_next_steps: vec![
                "Seek emergency care immediately.".into(),
                "Have someone accompany the patient if possible.".into(),
            ],
            watch_outs: vec![
                "Breathing difficulty".into(),
                "Loss of consciousness".into(),
            ],
            referral_recommended: true,
            reasoning: "Rule evaluation found emergency red-flag symptoms.".into(),
        };
    }

    let yellow_hit = YELLOW_TERMS.iter().any(|r| r.is_match(symptom_text));
    let age_caution =
        demographics.age < YOUNG_AGE_CUTOFF || demographics.age > ELDERLY_AGE_CUTOFF;

    if yellow_hit || age_caution {
        let reasoning = if yellow_hit {
            "Rule evaluation found moderate-risk symptoms.".to_string()
        } else {
            format!(
                "No high-risk terms, but age {} warrants in-person review.",
                demographics.age
            )
        };
        return AiAssessment {
            risk_tier: RiskTier::Yellow,
            danger_signs: BTreeSet::new(),
            uncertainty: Uncertainty::Medium,
            recommended_next_steps: vec![
                "Visit a clinic within 24 hours.".into(),
                "Monitor symptoms closely.".into(),
            ],
            watch_outs: vec![
                "Worsening fever".into(),
                "Persistent vomiting".into(),
                "New danger signs".into(),
            ],
            referral_recommended: true,
            reasoning,
        };
    }

    AiAssessment {
        risk_tier: RiskTier::Green,
        danger_signs: BTreeSet::new(),
        uncertainty: Uncertainty::Medium,
        recommended_next_steps: vec!["Home care and monitor symptoms.".into()],
        watch_outs: vec!["If symptoms worsen, seek care promptly.".into()],
        referral_recommended: false,
        reasoning: "No high-risk symptom terms detected.".into(),
    }
}
