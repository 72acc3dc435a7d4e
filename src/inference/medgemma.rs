//! Self-hosted MedGemma relay backend.
//!
//! Talks to a GPU notebook or on-prem box running the MedGemma triage
//! server, whose `/infer` endpoint builds its own prompt and already
//! returns the assessment field set as JSON.

use serde::Serialize;
use serde_json::Value;

use super::{parser, InferenceRequest, ProviderError};
use crate::models::AiAssessment;

pub struct MedGemmaClient {
    base_url: String,
    client: reqwest::Client,
}

/// Request body for the relay's `/infer` endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferBody<'a> {
    symptoms: &'a str,
    age: u8,
    sex: &'a str,
    location: Option<&'a str>,
    followup_responses: Vec<String>,
    task: &'a str,
}

impl MedGemmaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn invoke(
        &self,
        request: &InferenceRequest<'_>,
    ) -> Result<AiAssessment, ProviderError> {
        let encounter = request.encounter;
        let mut followup_responses: Vec<String> = request
            .followups
            .iter()
            .map(|pair| format!("{}: {}", pair.question, pair.answer))
            .collect();
        followup_responses.extend(request.extra_responses.iter().cloned());

        let body = InferBody {
            symptoms: &encounter.symptoms,
            age: encounter.demographics.age,
            sex: encounter.demographics.sex.as_str(),
            location: encounter.demographics.location.as_deref(),
            followup_responses,
            task: "triage",
        };

        let url = format!("{}/infer", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        // The relay answers in the assessment shape directly; normalize
        // it through the same defaulting rules as everything else.
        parser::assessment_from_value(&payload)
    }
}
