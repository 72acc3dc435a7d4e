use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Channel, EncounterStatus, Sex};

/// Upper bound accepted for patient age in years.
pub const MAX_AGE_YEARS: u8 = 120;

/// One patient interaction record, created by a channel adapter and
/// read-only to the triage engine except for the status transition
/// to `triaged`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: Uuid,
    pub channel: Channel,
    pub demographics: Demographics,
    /// Free-text symptom description as collected by the channel.
    pub symptoms: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
    /// Optional lab-results text supplied as extra inference context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_results: Option<String>,
    pub status: EncounterStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    /// Age in years, 0..=120.
    pub age: u8,
    pub sex: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Structured vital signs, all optional — most low-bandwidth channels
/// never collect them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2_percent: Option<u8>,
}

/// One answered follow-up question. Pairs are ordered by `position`
/// and immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupResponse {
    pub question: String,
    pub answer: String,
}

impl Encounter {
    pub fn new(channel: Channel, demographics: Demographics, symptoms: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            demographics,
            symptoms,
            vitals: None,
            lab_results: None,
            status: EncounterStatus::Created,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_encounter_starts_created() {
        let enc = Encounter::new(
            Channel::Sms,
            Demographics {
                age: 34,
                sex: Sex::Female,
                location: Some("Kisumu".into()),
            },
            "fever and headache".into(),
        );
        assert_eq!(enc.status, EncounterStatus::Created);
        assert!(enc.vitals.is_none());
        assert!(enc.status.is_triage_eligible());
    }

    #[test]
    fn encounter_wire_shape_is_camel_case() {
        let enc = Encounter::new(
            Channel::App,
            Demographics {
                age: 7,
                sex: Sex::Male,
                location: None,
            },
            "cough".into(),
        );
        let json = serde_json::to_value(&enc).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["channel"], "app");
        assert_eq!(json["demographics"]["age"], 7);
        // absent optionals are omitted, not null
        assert!(json.get("vitals").is_none());
    }
}
