use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One versioned revision of the clinical guideline text used as
/// inference context. Owned by the protocol collaborator; the triage
/// engine only ever reads the active revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolVersion {
    pub version: i64,
    pub description: String,
    pub content: String,
    pub active: bool,
    pub published_at: DateTime<Utc>,
}

/// Guideline text shipped with the engine so triage never runs without
/// protocol context, even on a fresh deployment.
pub const DEFAULT_PROTOCOL: &str = "\
Community triage guideline (baseline revision).
- RED: emergency referral now. Any danger sign (severe chest pain, breathing \
difficulty, unconsciousness, convulsions, severe bleeding) mandates RED.
- YELLOW: clinic visit within 24 hours for persistent fever, dehydration, \
moderate pain, or symptoms lasting more than 3 days.
- GREEN: home care with safety-net advice; return if symptoms worsen.
Always state next steps the patient can act on from home.";
