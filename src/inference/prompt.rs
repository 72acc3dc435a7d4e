//! Triage prompt construction shared by every text-generation backend.

use std::fmt::Write;

use super::InferenceRequest;

/// System instruction for chat-style backends.
pub const SYSTEM_PROMPT: &str = "You are a clinical triage assistant for a community health \
service. You classify presentations, you never diagnose. Return ONLY valid JSON.";

/// Build the triage prompt: patient block, guideline context, and the
/// exact JSON schema the response parser expects.
pub fn build_triage_prompt(request: &InferenceRequest<'_>) -> String {
    let encounter = request.encounter;
    let demographics = &encounter.demographics;

    let mut responses: Vec<String> = request
        .followups
        .iter()
        .map(|pair| format!("{} -> {}", pair.question, pair.answer))
        .collect();
    responses.extend(request.extra_responses.iter().cloned());
    let responses = if responses.is_empty() {
        "None".to_string()
    } else {
        responses.join("; ")
    };

    let mut prompt = String::new();
    let _ = writeln!(prompt, "You are a clinical triage assistant. Return ONLY valid JSON.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Clinical guideline context:");
    let _ = writeln!(prompt, "{}", request.protocol_text);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Patient:");
    let _ = writeln!(prompt, "- Age: {}", demographics.age);
    let _ = writeln!(prompt, "- Sex: {}", demographics.sex.as_str());
    let _ = writeln!(
        prompt,
        "- Location: {}",
        demographics.location.as_deref().unwrap_or("Unknown")
    );
    let _ = writeln!(prompt, "- Symptoms: {}", encounter.symptoms);
    let _ = writeln!(prompt, "- Follow-up responses: {responses}");
    if let Some(labs) = &encounter.lab_results {
        let _ = writeln!(prompt, "- Lab results: {labs}");
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Return JSON with this exact schema:");
    prompt.push_str(
        r#"{
  "riskTier": "RED|YELLOW|GREEN",
  "referralRecommended": true,
  "recommendedNextSteps": ["..."],
  "watchOuts": ["..."],
  "dangerSigns": ["..."],
  "uncertainty": "LOW|MEDIUM|HIGH",
  "reasoning": "Brief clinical reasoning"
}"#,
    );
    prompt
}
