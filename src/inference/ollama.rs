//! Local Ollama backend — `/api/generate` with a MedGemma-class model.

use serde::{Deserialize, Serialize};

use super::{parser, prompt, InferenceRequest, ProviderError};
use crate::models::AiAssessment;

pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn invoke(
        &self,
        request: &InferenceRequest<'_>,
    ) -> Result<AiAssessment, ProviderError> {
        let triage_prompt = prompt::build_triage_prompt(request);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &triage_prompt,
            system: prompt::SYSTEM_PROMPT,
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
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

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        parser::parse_assessment(&parsed.response)
    }
}
