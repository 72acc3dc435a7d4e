//! Deterministic danger-sign detection.
//!
//! Runs unconditionally on every encounter, before and independent of any
//! inference backend. Pure text/vitals matching, no I/O, sub-millisecond.
//! An empty result set is a valid, common outcome.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Vitals;

/// A compiled lexicon entry: one pattern, one canonical sign label.
struct DangerPattern {
    regex: Regex,
    label: &'static str,
}

fn pattern(regex_str: &str, label: &'static str) -> DangerPattern {
    DangerPattern {
        regex: Regex::new(regex_str).expect("Invalid danger-sign regex pattern"),
        label,
    }
}

/// Maintained danger-sign lexicon. Matching is case-insensitive and
/// word-bounded; several surface forms map to one canonical label.
static DANGER_PATTERNS: LazyLock<Vec<DangerPattern>> = LazyLock::new(|| {
    vec![
        pattern(r"(?i)\bsevere\s+chest\s+pain\b", "severe chest pain"),
        pattern(r"(?i)\bchest\s+pain\b", "chest pain"),
        pattern(
            r"(?i)\b(?:difficulty|trouble)\s+breathing\b",
            "difficulty breathing",
        ),
        pattern(
            r"(?i)\b(?:cannot|can't|can\s+not|unable\s+to)\s+breathe\b",
            "difficulty breathing",
        ),
        pattern(r"(?i)\bshort(?:ness)?\s+of\s+breath\b", "difficulty breathing"),
        pattern(r"(?i)\bunconscious(?:ness)?\b", "unconsciousness"),
        pattern(
            r"(?i)\b(?:not|won't|will\s+not)\s+wak(?:e|ing)(?:\s+up)?\b",
            "unconsciousness",
        ),
        pattern(r"(?i)\bunresponsive\b", "unconsciousness"),
        pattern(r"(?i)\bseizures?\b", "seizure or convulsion"),
        pattern(r"(?i)\bconvulsions?\b", "seizure or convulsion"),
        pattern(r"(?i)\bfitting\b", "seizure or convulsion"),
        pattern(r"(?i)\bsevere\s+bleeding\b", "severe bleeding"),
        pattern(
            r"(?i)\bbleeding\s+(?:that\s+)?(?:won't|will\s+not|does\s+not|doesn't)\s+stop\b",
            "severe bleeding",
        ),
        pattern(r"(?i)\b(?:coughing|vomiting)\s+(?:up\s+)?blood\b", "bleeding internally"),
        pattern(r"(?i)\bstiff\s+neck\b", "stiff neck"),
        pattern(r"(?i)\bsevere\s+(?:abdominal|stomach|belly)\s+pain\b", "severe abdominal pain"),
        pattern(r"(?i)\bblue\s+(?:lips|face|fingertips)\b", "cyanosis"),
        pattern(r"(?i)\bsevere\s+dehydration\b", "severe dehydration"),
        pattern(
            r"(?i)\b(?:no|not)\s+(?:passing\s+)?urine\s+(?:for|in)\b",
            "severe dehydration",
        ),
        pattern(r"(?i)\bsudden\s+confusion\b", "sudden confusion"),
        pattern(r"(?i)\bsudden\s+(?:severe\s+)?weakness\s+(?:on\s+)?one\s+side\b", "one-sided weakness"),
        pattern(r"(?i)\bslurred\s+speech\b", "slurred speech"),
    ]
});

/// Detect danger signs in free-text symptoms plus optional structured
/// vitals. Deterministic for a fixed lexicon; never touches the network.
pub fn detect(symptom_text: &str, vitals: Option<&Vitals>) -> BTreeSet<String> {
    let mut signs = BTreeSet::new();

    for dp in DANGER_PATTERNS.iter() {
        if dp.regex.is_match(symptom_text) {
            signs.insert(dp.label.to_string());
        }
    }

    if let Some(vitals) = vitals {
        detect_vital_signals(vitals, &mut signs);
    }

    signs
}

/// Threshold rules over structured vitals. Each is a red-flag reading on
/// its own, independent of what the patient typed.
fn detect_vital_signals(vitals: &Vitals, signs: &mut BTreeSet<String>) {
    if let Some(spo2) = vitals.spo2_percent {
        if spo2 < 90 {
            signs.insert("oxygen saturation below 90%".to_string());
        }
    }
    if let Some(systolic) = vitals.systolic_bp {
        if systolic < 90 {
            signs.insert("systolic blood pressure below 90".to_string());
        }
    }
    if let Some(temp) = vitals.temperature_c {
        if temp >= 40.0 {
            signs.insert("temperature 40\u{b0}C or above".to_string());
        }
    }
    if let Some(rate) = vitals.respiratory_rate {
        if rate >= 30 {
            signs.insert("respiratory rate 30 or above".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_spec_example_phrases() {
        let signs = detect("severe chest pain and difficulty breathing", None);
        assert!(signs.contains("severe chest pain"));
        assert!(signs.contains("difficulty breathing"));
    }

    #[test]
    fn detection_is_case_insensitive() {
        let lower = detect("severe bleeding from the wound", None);
        let upper = detect("SEVERE BLEEDING from the wound", None);
        let mixed = detect("Severe Bleeding from the wound", None);
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
        assert!(lower.contains("severe bleeding"));
    }

    #[test]
    fn surface_forms_map_to_canonical_label() {
        for text in [
            "she cannot breathe properly",
            "can't breathe when lying down",
            "trouble breathing since morning",
            "shortness of breath on walking",
        ] {
            let signs = detect(text, None);
            assert!(
                signs.contains("difficulty breathing"),
                "missed canonical label for: {text}"
            );
        }
    }

    #[test]
    fn empty_set_for_benign_text() {
        assert!(detect("mild headache since yesterday", None).is_empty());
        assert!(detect("", None).is_empty());
    }

    #[test]
    fn word_boundaries_prevent_substring_hits() {
        // "fitting" matches; "outfitting" must not
        assert!(detect("the child is fitting", None).contains("seizure or convulsion"));
        assert!(detect("outfitting the clinic", None).is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "unconscious after a seizure, severe bleeding";
        assert_eq!(detect(text, None), detect(text, None));
    }

    #[test]
    fn vitals_thresholds_fire_independently() {
        let vitals = Vitals {
            temperature_c: Some(40.5),
            heart_rate_bpm: Some(110),
            respiratory_rate: Some(32),
            systolic_bp: Some(85),
            spo2_percent: Some(88),
        };
        let signs = detect("feeling unwell", Some(&vitals));
        assert!(signs.contains("oxygen saturation below 90%"));
        assert!(signs.contains("systolic blood pressure below 90"));
        assert!(signs.contains("temperature 40\u{b0}C or above"));
        assert!(signs.contains("respiratory rate 30 or above"));
    }

    #[test]
    fn normal_vitals_add_nothing() {
        let vitals = Vitals {
            temperature_c: Some(37.1),
            heart_rate_bpm: Some(72),
            respiratory_rate: Some(16),
            systolic_bp: Some(118),
            spo2_percent: Some(98),
        };
        assert!(detect("routine check", Some(&vitals)).is_empty());
    }

    #[test]
    fn multiple_mentions_yield_one_label() {
        let signs = detect("chest pain, really bad chest pain", None);
        assert_eq!(
            signs.iter().filter(|s| s.as_str() == "chest pain").count(),
            1
        );
    }
}
