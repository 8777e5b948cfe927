use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, CandidateId, ContactDetails, LeadId, LeadKind, LeadSource, LeadStage};
use super::repository::{CandidateDirectory, LeadStore, NotificationSink};
use super::service::{CreateLeadInput, LeadRoutingError, LeadRoutingService};

/// Router builder exposing the four public routing operations.
pub fn lead_router<S, D, N>(service: Arc<LeadRoutingService<S, D, N>>) -> Router
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/leads", post(create_handler::<S, D, N>))
        .route(
            "/api/v1/leads/:lead_id/assign",
            post(assign_handler::<S, D, N>),
        )
        .route(
            "/api/v1/leads/:lead_id/transition",
            post(transition_handler::<S, D, N>),
        )
        .route("/api/v1/leads/queue", get(queue_handler::<S, D, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateLeadRequest {
    #[serde(default)]
    pub(crate) kind: LeadKind,
    pub(crate) source: LeadSource,
    pub(crate) contact: ContactDetails,
    pub(crate) actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) candidate_id: CandidateId,
    #[serde(default)]
    pub(crate) note: Option<String>,
    pub(crate) actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) stage: LeadStage,
    #[serde(default)]
    pub(crate) reason: Option<String>,
    pub(crate) actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueQuery {
    #[serde(default)]
    pub(crate) stage: Option<LeadStage>,
}

pub(crate) async fn create_handler<S, D, N>(
    State(service): State<Arc<LeadRoutingService<S, D, N>>>,
    axum::Json(request): axum::Json<CreateLeadRequest>,
) -> Response
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    let input = CreateLeadInput {
        kind: request.kind,
        source: request.source,
        contact: request.contact,
    };

    match service.create_lead(input, &request.actor, Utc::now()) {
        Ok(lead) => (StatusCode::CREATED, axum::Json(lead.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<S, D, N>(
    State(service): State<Arc<LeadRoutingService<S, D, N>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    let lead_id = LeadId(lead_id);
    match service.assign(
        &lead_id,
        &request.candidate_id,
        &request.actor,
        request.note.as_deref(),
        Utc::now(),
    ) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<S, D, N>(
    State(service): State<Arc<LeadRoutingService<S, D, N>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    let lead_id = LeadId(lead_id);
    match service.transition(
        &lead_id,
        request.stage,
        &request.actor,
        request.reason.as_deref(),
        Utc::now(),
    ) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn queue_handler<S, D, N>(
    State(service): State<Arc<LeadRoutingService<S, D, N>>>,
    Query(query): Query<QueueQuery>,
) -> Response
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.list_queue(query.stage, Utc::now()) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &LeadRoutingError) -> StatusCode {
    match error {
        LeadRoutingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeadRoutingError::NotFound => StatusCode::NOT_FOUND,
        LeadRoutingError::TerminalStage
        | LeadRoutingError::InvalidTransition { .. }
        | LeadRoutingError::ReasonRequired
        | LeadRoutingError::Conflict => StatusCode::CONFLICT,
        LeadRoutingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(error: LeadRoutingError) -> Response {
    let status = status_for(&error);
    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (status, axum::Json(payload)).into_response()
}
