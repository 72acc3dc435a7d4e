//! Scripted in-process backend for tests.
//!
//! Returns a configured assessment or failure, optionally after a fixed
//! delay, and counts invocations — timeout and no-retry behavior become
//! testable without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{InferenceRequest, ProviderError};
use crate::models::AiAssessment;

enum Outcome {
    Assessment(AiAssessment),
    Failure(String),
}

pub struct ScriptedClient {
    outcome: Outcome,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClient {
    /// Always answer with the given assessment.
    pub fn answering(assessment: AiAssessment) -> Self {
        Self {
            outcome: Outcome::Assessment(assessment),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fail with a transport error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Outcome::Failure(message.to_string()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long before answering — long enough, and the caller's
    /// deadline fires first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared invocation counter, usable after the client is moved into
    /// a backend.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub async fn invoke(
        &self,
        _request: &InferenceRequest<'_>,
    ) -> Result<AiAssessment, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Outcome::Assessment(assessment) => Ok(assessment.clone()),
            Outcome::Failure(message) => Err(ProviderError::Transport(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::{
        Channel, Demographics, Encounter, RiskTier, Sex, Uncertainty,
    };

    fn green_assessment() -> AiAssessment {
        AiAssessment {
            risk_tier: RiskTier::Green,
            danger_signs: BTreeSet::new(),
            uncertainty: Uncertainty::Low,
            recommended_next_steps: vec!["Home care and monitor symptoms.".into()],
            watch_outs: vec![],
            referral_recommended: false,
            reasoning: "scripted".into(),
        }
    }

    #[tokio::test]
    async fn answers_and_counts_calls() {
        let encounter = Encounter::new(
            Channel::App,
            Demographics {
                age: 20,
                sex: Sex::Unknown,
                location: None,
            },
            "mild cough".into(),
        );
        let client = ScriptedClient::answering(green_assessment());
        let calls = client.call_counter();

        let request = InferenceRequest {
            encounter: &encounter,
            followups: &[],
            extra_responses: &[],
            protocol_text: "",
        };
        let assessment = client.invoke(&request).await.unwrap();
        assert_eq!(assessment.risk_tier, RiskTier::Green);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_a_provider_error() {
        let encounter = Encounter::new(
            Channel::App,
            Demographics {
                age: 20,
                sex: Sex::Unknown,
                location: None,
            },
            "mild cough".into(),
        );
        let client = ScriptedClient::failing("connection reset");
        let request = InferenceRequest {
            encounter: &encounter,
            followups: &[],
            extra_responses: &[],
            protocol_text: "",
        };
        let err = client.invoke(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
