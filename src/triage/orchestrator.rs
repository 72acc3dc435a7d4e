//! The triage decision core.
//!
//! One safety-checked, idempotent decision per encounter: danger-sign
//! detection always runs, the inference backend gets exactly one bounded
//! attempt, the rule engine answers when it cannot, and the merge only
//! ever moves severity upward.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::{danger_signs, rules, TriageError};
use crate::inference::{InferenceBackend, InferenceRequest};
use crate::models::{
    AiAssessment, Encounter, FollowupResponse, RiskTier, TriageResult, Uncertainty,
};
use crate::protocol::ProtocolProvider;
use crate::store::{StoreError, TriageStore};

pub struct TriageOrchestrator {
    store: Arc<dyn TriageStore>,
    protocols: Arc<ProtocolProvider>,
    /// `None` when inference is administratively disabled; every
    /// request then takes the fallback path.
    backend: Option<InferenceBackend>,
    deadline: Duration,
}

impl TriageOrchestrator {
    pub fn new(
        store: Arc<dyn TriageStore>,
        protocols: Arc<ProtocolProvider>,
        backend: Option<InferenceBackend>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            protocols,
            backend,
            deadline,
        }
    }

    /// Produce and persist the one triage decision for this encounter.
    pub async fn perform_triage(
        &self,
        encounter_id: Uuid,
        followup_responses: &[String],
    ) -> Result<TriageResult, TriageError> {
        let encounter = self.store.get_encounter(encounter_id).map_err(|e| match e {
            StoreError::NotFound { .. } => TriageError::NotFound(encounter_id),
            other => other.into(),
        })?;
        if !encounter.status.is_triage_eligible() {
            return Err(TriageError::AlreadyTriaged(encounter_id));
        }

        // The detector runs on every encounter, whatever happens to the
        // inference attempt below.
        let detector_signs = danger_signs::detect(&encounter.symptoms, encounter.vitals.as_ref());

        let followups = self.store.followups(encounter_id)?;
        let (baseline, used_fallback, ai_latency_ms) = self
            .attempt_inference(&encounter, &followups, followup_responses)
            .await;

        let merged = merge(baseline, &detector_signs);
        let result = TriageResult::assemble(merged, used_fallback, ai_latency_ms);

        // Re-verify right before the write; the store's own uniqueness
        // guarantee settles any remaining race.
        if self.store.get_triage_result(encounter_id)?.is_some() {
            return Err(TriageError::AlreadyTriaged(encounter_id));
        }
        self.store.put_triage_result(encounter_id, &result)?;

        tracing::info!(
            encounter_id = %encounter_id,
            risk_tier = result.risk_tier.as_str(),
            used_fallback,
            ai_latency_ms,
            danger_signs = result.danger_signs.len(),
            "Triage decision persisted"
        );
        Ok(result)
    }

    /// One bounded backend attempt; any failure is recovered locally by
    /// the rule engine and never surfaced to the caller.
    async fn attempt_inference(
        &self,
        encounter: &Encounter,
        followups: &[FollowupResponse],
        extra_responses: &[String],
    ) -> (AiAssessment, bool, u64) {
        let Some(backend) = &self.backend else {
            tracing::info!(encounter_id = %encounter.id, "Inference disabled; using rule engine");
            return (self.rule_baseline(encounter), true, 0);
        };

        let protocol = match self.protocols.active_protocol() {
            Ok(protocol) => protocol,
            Err(err) => {
                tracing::warn!(error = %err, "Protocol read failed; using built-in baseline");
                Arc::new(ProtocolProvider::builtin())
            }
        };

        let request = InferenceRequest {
            encounter,
            followups,
            extra_responses,
            protocol_text: &protocol.content,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.deadline, backend.invoke(&request)).await;
        let ai_latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(assessment)) => {
                tracing::debug!(
                    encounter_id = %encounter.id,
                    backend = backend.name(),
                    ai_latency_ms,
                    "Inference succeeded"
                );
                (assessment, false, ai_latency_ms)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    encounter_id = %encounter.id,
                    backend = backend.name(),
                    error = %err,
                    "Inference failed; using rule engine"
                );
                (self.rule_baseline(encounter), true, ai_latency_ms)
            }
            Err(_) => {
                tracing::warn!(
                    encounter_id = %encounter.id,
                    backend = backend.name(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Inference deadline exceeded; using rule engine"
                );
                (self.rule_baseline(encounter), true, ai_latency_ms)
            }
        }
    }

    fn rule_baseline(&self, encounter: &Encounter) -> AiAssessment {
        rules::classify(&encounter.symptoms, &encounter.demographics)
    }
}

/// Merge the baseline assessment with the detector's findings.
///
/// Severity is only ever clamped upward; danger signs are the union of
/// both sources; an upgrade forced past the baseline tier raises
/// uncertainty to at least MEDIUM.
fn merge(baseline: AiAssessment, detector_signs: &BTreeSet<String>) -> AiAssessment {
    let mut merged = baseline;
    merged
        .danger_signs
        .extend(detector_signs.iter().cloned());

    if !detector_signs.is_empty() && merged.risk_tier < RiskTier::Red {
        merged.risk_tier = RiskTier::Red;
        merged.uncertainty = merged.uncertainty.max(Uncertainty::Medium);
    }

    merged.referral_recommended =
        merged.referral_recommended || merged.risk_tier != RiskTier::Green;
    merged
}
