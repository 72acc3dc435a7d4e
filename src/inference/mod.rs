//! Inference backend port.
//!
//! One capability surface over four concrete backends, selected purely by
//! configuration — no runtime type inspection, no per-request retry chain.
//! Every backend normalizes into [`AiAssessment`] or raises a typed
//! [`ProviderError`]; the decision to fall back belongs to the
//! orchestrator, never to a backend.

pub mod gemini;
pub mod medgemma;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod scripted;

pub use gemini::GeminiClient;
pub use medgemma::MedGemmaClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;

use std::time::Duration;

use thiserror::Error;

use crate::models::{AiAssessment, Encounter, FollowupResponse};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Backend unreachable at {0}")]
    Connection(String),

    #[error("Backend transport error: {0}")]
    Transport(String),

    #[error("Backend returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Map a reqwest failure into the taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_connect() {
            Self::Connection(base_url.to_string())
        } else if err.is_timeout() {
            Self::Transport("request timed out".into())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Everything a backend may use to assess one encounter.
pub struct InferenceRequest<'a> {
    pub encounter: &'a Encounter,
    pub followups: &'a [FollowupResponse],
    /// Free-text answers supplied with the triage call itself.
    pub extra_responses: &'a [String],
    pub protocol_text: &'a str,
}

/// The active backend, resolved once at startup from configuration.
pub enum InferenceBackend {
    MedGemma(MedGemmaClient),
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    Scripted(ScriptedClient),
}

impl InferenceBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MedGemma(_) => "medgemma",
            Self::Ollama(_) => "ollama",
            Self::OpenAi(_) => "openai",
            Self::Gemini(_) => "gemini",
            Self::Scripted(_) => "scripted",
        }
    }

    /// Per-backend deadline used unless configuration overrides it.
    /// The self-hosted large-model backends get the long budget; the
    /// hosted APIs answer well inside a minute or not at all.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::MedGemma(_) | Self::Ollama(_) => Duration::from_secs(120),
            Self::OpenAi(_) | Self::Gemini(_) => Duration::from_secs(60),
            Self::Scripted(_) => Duration::from_secs(5),
        }
    }

    /// Run one inference call. The caller enforces the deadline; this
    /// method performs exactly one backend request.
    pub async fn invoke(
        &self,
        request: &InferenceRequest<'_>,
    ) -> Result<AiAssessment, ProviderError> {
        match self {
            Self::MedGemma(client) => client.invoke(request).await,
            Self::Ollama(client) => client.invoke(request).await,
            Self::OpenAi(client) => client.invoke(request).await,
            Self::Gemini(client) => client.invoke(request).await,
            Self::Scripted(client) => client.invoke(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_favor_self_hosted_models() {
        let relay = InferenceBackend::MedGemma(MedGemmaClient::new("http://localhost:8000"));
        let hosted = InferenceBackend::OpenAi(OpenAiClient::new(
            "https://api.openai.com",
            "sk-test",
            "gpt-4o-mini",
        ));
        assert!(relay.default_timeout() > hosted.default_timeout());
        assert_eq!(relay.default_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn backend_names_are_stable() {
        let backend = InferenceBackend::Ollama(OllamaClient::new(
            "http://localhost:11434",
            "medgemma:4b",
        ));
        assert_eq!(backend.name(), "ollama");
    }
}
