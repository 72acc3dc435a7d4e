//! Normalization of backend output into the common assessment shape.
//!
//! Generative models wrap JSON in prose and code fences, drop optional
//! fields, and invent severity spellings. Everything here is lenient
//! about that — but an output with no parsable JSON object at all is a
//! `ProviderError`, never a silently substituted default.

use std::collections::BTreeSet;

use serde_json::Value;

use super::ProviderError;
use crate::models::{AiAssessment, RiskTier, Uncertainty};

/// Next step used when a non-GREEN assessment arrives without one.
const FALLBACK_NEXT_STEP: &str = "Seek medical evaluation.";

/// Parse raw model text: strip fences, locate the first JSON object,
/// normalize it into an assessment.
pub fn parse_assessment(raw: &str) -> Result<AiAssessment, ProviderError> {
    let block = extract_json_block(raw)?;
    let value: Value = serde_json::from_str(&block)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;
    assessment_from_value(&value)
}

/// Extract the first `{…}` object from model output, tolerating
/// ```json fences and surrounding prose.
pub fn extract_json_block(raw: &str) -> Result<String, ProviderError> {
    let text = raw.trim();
    let start = text
        .find('{')
        .ok_or_else(|| ProviderError::MalformedResponse("no JSON object in output".into()))?;

    // Walk to the matching close brace, ignoring braces inside strings.
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    Err(ProviderError::MalformedResponse("unclosed JSON object".into()))
}

/// Normalize an already-parsed JSON object into an assessment, applying
/// the defaulting rules for missing optional fields.
pub fn assessment_from_value(value: &Value) -> Result<AiAssessment, ProviderError> {
    if !value.is_object() {
        return Err(ProviderError::MalformedResponse(
            "backend payload is not a JSON object".into(),
        ));
    }

    let risk_tier = coerce_risk_tier(value.get("riskTier").and_then(Value::as_str));
    let uncertainty = coerce_uncertainty(value.get("uncertainty").and_then(Value::as_str));
    let danger_signs: BTreeSet<String> = string_array(value.get("dangerSigns"))
        .into_iter()
        .collect();

    let mut recommended_next_steps = string_array(value.get("recommendedNextSteps"));
    if recommended_next_steps.is_empty() && risk_tier != RiskTier::Green {
        recommended_next_steps.push(FALLBACK_NEXT_STEP.to_string());
    }
    if recommended_next_steps.is_empty() {
        recommended_next_steps.push("Home care and monitor symptoms.".to_string());
    }

    let mut watch_outs = string_array(value.get("watchOuts"));
    if watch_outs.is_empty() {
        watch_outs.push("If symptoms worsen, seek care promptly.".to_string());
    }

    let referral_recommended = value
        .get("referralRecommended")
        .and_then(Value::as_bool)
        .unwrap_or(risk_tier != RiskTier::Green);

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("Model inference completed.")
        .to_string();

    Ok(AiAssessment {
        risk_tier,
        danger_signs,
        uncertainty,
        recommended_next_steps,
        watch_outs,
        referral_recommended,
        reasoning,
    })
}

/// Coerce any textual severity into the 3-value enum. Unknown or
/// missing values land on YELLOW: the middle tier is the safe default
/// for an answer we could not read.
pub fn coerce_risk_tier(raw: Option<&str>) -> RiskTier {
    let Some(raw) = raw else {
        return RiskTier::Yellow;
    };
    let upper = raw.trim().to_uppercase();
    match upper.as_str() {
        "RED" => RiskTier::Red,
        "YELLOW" => RiskTier::Yellow,
        "GREEN" => RiskTier::Green,
        _ if upper.contains("RED") || upper.contains("EMERGENCY") => RiskTier::Red,
        _ if upper.contains("GREEN") || upper.contains("ROUTINE") => RiskTier::Green,
        _ => RiskTier::Yellow,
    }
}

fn coerce_uncertainty(raw: Option<&str>) -> Uncertainty {
    match raw.map(|s| s.trim().to_uppercase()) {
        Some(ref s) if s == "LOW" => Uncertainty::Low,
        Some(ref s) if s == "HIGH" => Uncertainty::High,
        _ => Uncertainty::Medium,
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_with_prose() {
        let raw = r#"Here is my assessment:

```json
{
  "riskTier": "RED",
  "referralRecommended": true,
  "recommendedNextSteps": ["Seek emergency care immediately."],
  "watchOuts": ["Breathing difficulty"],
  "dangerSigns": ["severe chest pain"],
  "uncertainty": "LOW",
  "reasoning": "Classic emergency presentation."
}
```

Let me know if you need anything else."#;
        let assessment = parse_assessment(raw).unwrap();
        assert_eq!(assessment.risk_tier, RiskTier::Red);
        assert_eq!(assessment.uncertainty, Uncertainty::Low);
        assert!(assessment.danger_signs.contains("severe chest pain"));
        assert!(assessment.referral_recommended);
    }

    #[test]
    fn parses_bare_json() {
        let raw = r#"{"riskTier":"GREEN","recommendedNextSteps":["Rest at home."]}"#;
        let assessment = parse_assessment(raw).unwrap();
        assert_eq!(assessment.risk_tier, RiskTier::Green);
        assert!(!assessment.referral_recommended);
    }

    #[test]
    fn nested_braces_and_strings_do_not_truncate() {
        let raw = r#"{"riskTier":"YELLOW","reasoning":"note: braces {} and \"quotes\" inside"}"#;
        let assessment = parse_assessment(raw).unwrap();
        assert!(assessment.reasoning.contains("braces {}"));
    }

    #[test]
    fn missing_fields_get_defaults() {
        let assessment = parse_assessment(r#"{"riskTier":"YELLOW"}"#).unwrap();
        assert_eq!(assessment.uncertainty, Uncertainty::Medium);
        assert!(assessment.danger_signs.is_empty());
        // non-GREEN never gets an empty step list
        assert_eq!(assessment.recommended_next_steps, vec![FALLBACK_NEXT_STEP]);
        assert!(assessment.referral_recommended);
        assert!(!assessment.watch_outs.is_empty());
    }

    #[test]
    fn unknown_severity_coerces_to_yellow() {
        assert_eq!(coerce_risk_tier(Some("AMBER")), RiskTier::Yellow);
        assert_eq!(coerce_risk_tier(Some("")), RiskTier::Yellow);
        assert_eq!(coerce_risk_tier(None), RiskTier::Yellow);
    }

    #[test]
    fn severity_spellings_coerce() {
        assert_eq!(coerce_risk_tier(Some("red")), RiskTier::Red);
        assert_eq!(coerce_risk_tier(Some(" Red ")), RiskTier::Red);
        assert_eq!(coerce_risk_tier(Some("RED (emergency)")), RiskTier::Red);
        assert_eq!(coerce_risk_tier(Some("green/routine")), RiskTier::Green);
    }

    #[test]
    fn output_without_json_is_an_error() {
        let err = parse_assessment("I cannot help with that request.").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn unclosed_object_is_an_error() {
        let err = parse_assessment(r#"{"riskTier":"RED""#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn non_string_array_items_are_skipped() {
        let raw = r#"{"riskTier":"GREEN","recommendedNextSteps":["Rest.", 42, null]}"#;
        let assessment = parse_assessment(raw).unwrap();
        assert_eq!(assessment.recommended_next_steps, vec!["Rest."]);
    }
}
