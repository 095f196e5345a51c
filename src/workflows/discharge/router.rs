use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dashboard::DashboardQuery;
use super::domain::{
    EncounterId, FacilityId, NewTask, NewTransportOrder, PlacementId, SignalId, SignalStatus,
    TaskId, TaskStatus, TransportOrderId, TransportStatus, UserRole,
};
use super::error::{DischargeError, ErrorKind};
use super::permissions::Action;
use super::repository::EncounterRepository;
use super::service::{DischargeService, DischargeServiceError};
use crate::workflows::directory::FacilityDirectory;

/// Header carrying the caller's role; sessions and tokens live upstream.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Router builder exposing the discharge workflow over HTTP.
pub fn discharge_router<R, F>(service: Arc<DischargeService<R, F>>) -> Router
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    Router::new()
        .route("/api/v1/encounters", get(dashboard_handler::<R, F>))
        .route(
            "/api/v1/encounters/:encounter_id",
            get(encounter_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/signals",
            get(signals_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/signals/:signal_id/status",
            post(transition_signal_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/education",
            post(education_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/score",
            post(score_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/score/history",
            get(score_history_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/tasks",
            post(create_task_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/tasks/:task_id/status",
            post(transition_task_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/placements",
            post(send_placement_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/placements/:placement_id/response",
            post(placement_response_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/placements/:placement_id/accept",
            post(accept_placement_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/placements/:placement_id/decline",
            post(decline_placement_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/transport",
            post(schedule_transport_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/transport/:order_id/pickup",
            post(transport_pickup_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/transport/:order_id/status",
            post(advance_transport_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/discharge/start",
            post(start_discharge_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/discharge/ready",
            post(mark_ready_handler::<R, F>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/discharge/complete",
            post(mark_discharged_handler::<R, F>),
        )
        .route("/api/v1/facilities", get(facilities_handler::<R, F>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendPlacementRequest {
    pub facility_id: FacilityId,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PickupRequest {
    pub pickup_ts: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DischargeMilestone {
    encounter_id: EncounterId,
    milestone: &'static str,
    at: DateTime<Utc>,
}

type Service<R, F> = State<Arc<DischargeService<R, F>>>;

impl IntoResponse for DischargeServiceError {
    fn into_response(self) -> Response {
        match self {
            DischargeServiceError::Discharge(error) => {
                let status = match error.kind() {
                    ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidState => StatusCode::CONFLICT,
                    ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
                };
                let mut payload = serde_json::to_value(&error).unwrap_or_else(|_| json!({}));
                if let Some(fields) = payload.as_object_mut() {
                    fields.insert("error".to_string(), json!(error.to_string()));
                }
                (status, axum::Json(payload)).into_response()
            }
            DischargeServiceError::Repository(error) => {
                let payload = json!({
                    "kind": "repository",
                    "error": error.to_string(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
            }
        }
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, DischargeServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A missing or unrecognized role is denied for the requested action.
pub(crate) fn actor_role(headers: &HeaderMap, action: Action) -> Result<UserRole, DischargeServiceError> {
    let raw = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    raw.parse::<UserRole>().map_err(|_| {
        let role = if raw.is_empty() { "anonymous" } else { raw };
        DischargeError::PermissionDenied {
            role: role.to_string(),
            action,
        }
        .into()
    })
}

fn parse_status<T>(value: &str) -> Result<T, DischargeServiceError>
where
    T: std::str::FromStr<Err = DischargeError>,
{
    value.parse::<T>().map_err(DischargeServiceError::from)
}

pub(crate) async fn dashboard_handler<R, F>(
    State(service): Service<R, F>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = DashboardQuery::from_params(&params)
        .map_err(DischargeServiceError::from)
        .and_then(|query| service.dashboard(&query));
    respond(StatusCode::OK, result)
}

pub(crate) async fn encounter_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    respond(StatusCode::OK, service.encounter(&EncounterId(encounter_id)))
}

pub(crate) async fn signals_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    respond(StatusCode::OK, service.list_signals(&EncounterId(encounter_id)))
}

pub(crate) async fn transition_signal_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, signal_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::CompleteSignal).and_then(|actor| {
        let status = parse_status::<SignalStatus>(&request.status)?;
        service.transition_signal(
            &EncounterId(encounter_id),
            &SignalId(signal_id),
            status,
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn education_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::PatientEducation)
        .and_then(|actor| service.record_patient_education(&EncounterId(encounter_id), actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn score_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    respond(StatusCode::OK, service.current_score(&EncounterId(encounter_id)))
}

pub(crate) async fn score_history_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    respond(StatusCode::OK, service.score_history(&EncounterId(encounter_id)))
}

pub(crate) async fn create_task_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
    axum::Json(new_task): axum::Json<NewTask>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::CreateTask)
        .and_then(|actor| service.create_task(&EncounterId(encounter_id), new_task, actor));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn transition_task_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, task_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::CompleteTask).and_then(|actor| {
        let status = parse_status::<TaskStatus>(&request.status)?;
        service.transition_task(&EncounterId(encounter_id), &TaskId(task_id), status, actor)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn send_placement_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SendPlacementRequest>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::SendPlacement).and_then(|actor| {
        service.send_placement(
            &EncounterId(encounter_id),
            &request.facility_id,
            request.notes,
            actor,
        )
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn placement_response_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, placement_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::SendPlacement).and_then(|actor| {
        service.record_placement_response(
            &EncounterId(encounter_id),
            &PlacementId(placement_id),
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn accept_placement_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, placement_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::AcceptPlacement).and_then(|actor| {
        service.accept_placement(
            &EncounterId(encounter_id),
            &PlacementId(placement_id),
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn decline_placement_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, placement_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::AcceptPlacement).and_then(|actor| {
        service.decline_placement(
            &EncounterId(encounter_id),
            &PlacementId(placement_id),
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn schedule_transport_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
    axum::Json(order): axum::Json<NewTransportOrder>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::ScheduleTransport)
        .and_then(|actor| service.schedule_transport(&EncounterId(encounter_id), order, actor));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn transport_pickup_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, order_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<PickupRequest>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::ScheduleTransport).and_then(|actor| {
        service.set_transport_pickup(
            &EncounterId(encounter_id),
            &TransportOrderId(order_id),
            request.pickup_ts,
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn advance_transport_handler<R, F>(
    State(service): Service<R, F>,
    Path((encounter_id, order_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let result = actor_role(&headers, Action::ScheduleTransport).and_then(|actor| {
        let next = parse_status::<TransportStatus>(&request.status)?;
        service.advance_transport(
            &EncounterId(encounter_id),
            &TransportOrderId(order_id),
            next,
            actor,
        )
    });
    respond(StatusCode::OK, result)
}

type MilestoneFn<R, F> =
    fn(&DischargeService<R, F>, &EncounterId, UserRole) -> Result<DateTime<Utc>, DischargeServiceError>;

fn milestone<R, F>(
    service: &DischargeService<R, F>,
    encounter_id: String,
    headers: &HeaderMap,
    name: &'static str,
    apply: MilestoneFn<R, F>,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    let encounter_id = EncounterId(encounter_id);
    let result = actor_role(headers, Action::StartDischarge)
        .and_then(|actor| apply(service, &encounter_id, actor))
        .map(|at| DischargeMilestone {
            encounter_id: encounter_id.clone(),
            milestone: name,
            at,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn start_discharge_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    milestone(
        &service,
        encounter_id,
        &headers,
        "started_discharge",
        DischargeService::<R, F>::start_discharge,
    )
}

pub(crate) async fn mark_ready_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    milestone(
        &service,
        encounter_id,
        &headers,
        "discharge_ready",
        DischargeService::<R, F>::mark_ready,
    )
}

pub(crate) async fn mark_discharged_handler<R, F>(
    State(service): Service<R, F>,
    Path(encounter_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    milestone(
        &service,
        encounter_id,
        &headers,
        "left_unit",
        DischargeService::<R, F>::mark_discharged,
    )
}

pub(crate) async fn facilities_handler<R, F>(State(service): Service<R, F>) -> Response
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    (StatusCode::OK, axum::Json(service.facilities())).into_response()
}
