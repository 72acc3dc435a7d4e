//! Process configuration, resolved once at startup from the environment.
//!
//! Misconfiguration is a startup failure, not a per-request surprise: a
//! selected backend missing its credentials refuses to boot.

use std::time::Duration;

use thiserror::Error;

use crate::inference::{
    GeminiClient, InferenceBackend, MedGemmaClient, OllamaClient, OpenAiClient,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which inference backend serves triage requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    MedGemma,
    Ollama,
    OpenAi,
    Gemini,
    /// No model at all; every request takes the rule-engine path.
    Disabled,
}

#[derive(Debug)]
pub struct EngineConfig {
    pub backend: BackendSelection,
    pub medgemma_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Overrides the backend's own default deadline when set.
    pub inference_timeout: Option<Duration>,
    pub bind_addr: String,
    pub db_path: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Testable resolution over any name-to-value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("CARELINE_BACKEND").as_deref() {
            None | Some("medgemma") => BackendSelection::MedGemma,
            Some("ollama") => BackendSelection::Ollama,
            Some("openai") => BackendSelection::OpenAi,
            Some("gemini") => BackendSelection::Gemini,
            Some("disabled") => BackendSelection::Disabled,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "CARELINE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let inference_timeout = match lookup("CARELINE_INFERENCE_TIMEOUT_SECS") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "CARELINE_INFERENCE_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
        };

        let config = Self {
            backend,
            medgemma_url: lookup("CARELINE_MEDGEMMA_URL")
                .unwrap_or_else(|| "http://localhost:8000".into()),
            ollama_url: lookup("CARELINE_OLLAMA_URL")
                .unwrap_or_else(|| "http://localhost:11434".into()),
            ollama_model: lookup("CARELINE_OLLAMA_MODEL")
                .unwrap_or_else(|| "medgemma:4b".into()),
            openai_url: lookup("CARELINE_OPENAI_URL")
                .unwrap_or_else(|| "https://api.openai.com".into()),
            openai_api_key: lookup("CARELINE_OPENAI_API_KEY"),
            openai_model: lookup("CARELINE_OPENAI_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".into()),
            gemini_url: lookup("CARELINE_GEMINI_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
            gemini_api_key: lookup("CARELINE_GEMINI_API_KEY"),
            gemini_model: lookup("CARELINE_GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash".into()),
            inference_timeout,
            bind_addr: lookup("CARELINE_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            db_path: lookup("CARELINE_DB_PATH").unwrap_or_else(|| "careline.db".into()),
        };

        // Hosted backends cannot run without their key.
        match config.backend {
            BackendSelection::OpenAi if config.openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar("CARELINE_OPENAI_API_KEY"));
            }
            BackendSelection::Gemini if config.gemini_api_key.is_none() => {
                return Err(ConfigError::MissingVar("CARELINE_GEMINI_API_KEY"));
            }
            _ => {}
        }

        Ok(config)
    }

    /// Construct the selected backend, or `None` when disabled.
    pub fn build_backend(&self) -> Option<InferenceBackend> {
        match self.backend {
            BackendSelection::MedGemma => Some(InferenceBackend::MedGemma(MedGemmaClient::new(
                &self.medgemma_url,
            ))),
            BackendSelection::Ollama => Some(InferenceBackend::Ollama(OllamaClient::new(
                &self.ollama_url,
                &self.ollama_model,
            ))),
            BackendSelection::OpenAi => {
                let key = self.openai_api_key.as_deref()?;
                Some(InferenceBackend::OpenAi(OpenAiClient::new(
                    &self.openai_url,
                    key,
                    &self.openai_model,
                )))
            }
            BackendSelection::Gemini => {
                let key = self.gemini_api_key.as_deref()?;
                Some(InferenceBackend::Gemini(GeminiClient::new(
                    &self.gemini_url,
                    key,
                    &self.gemini_model,
                )))
            }
            BackendSelection::Disabled => None,
        }
    }

    /// The deadline the orchestrator enforces on each inference attempt.
    pub fn resolve_deadline(&self, backend: Option<&InferenceBackend>) -> Duration {
        if let Some(timeout) = self.inference_timeout {
            return timeout;
        }
        backend
            .map(|b| b.default_timeout())
            .unwrap_or(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_select_medgemma_relay() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.backend, BackendSelection::MedGemma);
        assert_eq!(config.medgemma_url, "http://localhost:8000");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.build_backend().is_some());
    }

    #[test]
    fn disabled_backend_builds_none() {
        let config =
            EngineConfig::from_lookup(lookup_from(&[("CARELINE_BACKEND", "disabled")])).unwrap();
        assert!(config.build_backend().is_none());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("CARELINE_BACKEND", "llamacpp")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "CARELINE_BACKEND",
                ..
            }
        ));
    }

    #[test]
    fn openai_without_key_refuses_to_boot() {
        let err = EngineConfig::from_lookup(lookup_from(&[("CARELINE_BACKEND", "openai")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar("CARELINE_OPENAI_API_KEY")
        ));
    }

    #[test]
    fn gemini_with_key_boots() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("CARELINE_BACKEND", "gemini"),
            ("CARELINE_GEMINI_API_KEY", "test-key"),
        ]))
        .unwrap();
        let backend = config.build_backend().unwrap();
        assert_eq!(backend.name(), "gemini");
    }

    #[test]
    fn timeout_override_beats_backend_default() {
        let config = EngineConfig::from_lookup(lookup_from(&[(
            "CARELINE_INFERENCE_TIMEOUT_SECS",
            "15",
        )]))
        .unwrap();
        let backend = config.build_backend();
        assert_eq!(
            config.resolve_deadline(backend.as_ref()),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = EngineConfig::from_lookup(lookup_from(&[(
            "CARELINE_INFERENCE_TIMEOUT_SECS",
            "0",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn default_deadline_follows_backend() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        let backend = config.build_backend();
        assert_eq!(
            config.resolve_deadline(backend.as_ref()),
            Duration::from_secs(120)
        );
    }
}
