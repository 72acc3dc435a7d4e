//! HTTP surface of the triage engine.
//!
//! Thin handlers: validate, call the store/orchestrator, render. All
//! decision logic lives below this layer.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::error::ApiError;
use crate::models::{
    Channel, Demographics, Encounter, FollowupResponse, ProtocolVersion, TriageResult, Vitals,
    MAX_AGE_YEARS,
};
use crate::protocol::ProtocolProvider;
use crate::store::TriageStore;
use crate::triage::TriageOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TriageStore>,
    pub protocols: Arc<ProtocolProvider>,
    pub orchestrator: Arc<TriageOrchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/encounters", post(create_encounter))
        .route("/encounters/:id", get(get_encounter))
        .route("/encounters/:id/followups", post(append_followups))
        .route("/encounters/:id/triage", post(triage_encounter))
        .route("/protocol", get(get_protocol).put(publish_protocol))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEncounterRequest {
    channel: Channel,
    demographics: Demographics,
    symptoms: String,
    #[serde(default)]
    vitals: Option<Vitals>,
    #[serde(default)]
    lab_results: Option<String>,
}

async fn create_encounter(
    State(state): State<AppState>,
    Json(payload): Json<CreateEncounterRequest>,
) -> Result<(StatusCode, Json<Encounter>), ApiError> {
    if payload.symptoms.trim().is_empty() {
        return Err(ApiError::BadRequest("symptoms must not be empty".into()));
    }
    if payload.demographics.age > MAX_AGE_YEARS {
        return Err(ApiError::BadRequest(format!(
            "age must be at most {MAX_AGE_YEARS}"
        )));
    }

    let mut encounter = Encounter::new(payload.channel, payload.demographics, payload.symptoms);
    encounter.vitals = payload.vitals;
    encounter.lab_results = payload.lab_results;

    state.store.insert_encounter(&encounter)?;
    tracing::info!(encounter_id = %encounter.id, channel = encounter.channel.as_str(), "Encounter created");
    Ok((StatusCode::CREATED, Json(encounter)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncounterView {
    encounter: Encounter,
    followups: Vec<FollowupResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triage: Option<TriageResult>,
}

async fn get_encounter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EncounterView>, ApiError> {
    let id = parse_encounter_id(&id)?;
    let encounter = state.store.get_encounter(id)?;
    let followups = state.store.followups(id)?;
    let triage = state.store.get_triage_result(id)?;
    Ok(Json(EncounterView {
        encounter,
        followups,
        triage,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendFollowupsRequest {
    responses: Vec<FollowupResponse>,
}

async fn append_followups(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AppendFollowupsRequest>,
) -> Result<Json<Vec<FollowupResponse>>, ApiError> {
    let id = parse_encounter_id(&id)?;
    if payload.responses.is_empty() {
        return Err(ApiError::BadRequest(
            "responses must contain at least one answered question".into(),
        ));
    }
    // confirm the encounter exists for a clean 404
    state.store.get_encounter(id)?;
    state.store.append_followups(id, &payload.responses)?;
    let all = state.store.followups(id)?;
    Ok(Json(all))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TriageRequest {
    /// Free-text answers gathered by the channel for this triage call.
    #[serde(default)]
    followup_responses: Vec<String>,
}

async fn triage_encounter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TriageResult>, ApiError> {
    let id = parse_encounter_id(&id)?;
    // An absent body means "no extra answers"; a present but unparsable
    // one must fail before the one-and-only decision is made.
    let request: TriageRequest = if body.is_empty() {
        TriageRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?
    };
    let result = state
        .orchestrator
        .perform_triage(id, &request.followup_responses)
        .await?;
    Ok(Json(result))
}

async fn get_protocol(
    State(state): State<AppState>,
) -> Result<Json<ProtocolVersion>, ApiError> {
    let version = state
        .protocols
        .active_protocol()
        .map_err(ApiError::from)?;
    Ok(Json(version.as_ref().clone()))
}

#[derive(Deserialize)]
struct PublishProtocolRequest {
    description: String,
    content: String,
}

async fn publish_protocol(
    State(state): State<AppState>,
    Json(payload): Json<PublishProtocolRequest>,
) -> Result<Json<ProtocolVersion>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content must not be empty".into()));
    }
    let version = state
        .protocols
        .publish(&payload.description, &payload.content)?;
    tracing::info!(version = version.version, "Protocol revision published");
    Ok(Json(version))
}

fn parse_encounter_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid encounter id: {raw}")))
}
