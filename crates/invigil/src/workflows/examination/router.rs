use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AssignmentId, Department, ExamId, ExamStatus, ExaminationView, NewAssignment, NewExamination,
    NewRoom, RoomId, Session, StaffId,
};
use super::repository::{InvigilationStore, RepositoryError};
use super::service::{InvigilationService, InvigilationServiceError, RequirementInput};
use crate::workflows::allocation::AllocationError;

type SharedService<S> = State<Arc<InvigilationService<S>>>;

/// Router exposing examination setup, staffing, approval, and allocation
/// endpoints.
pub fn invigilation_router<S>(service: Arc<InvigilationService<S>>) -> Router
where
    S: InvigilationStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/examinations",
            post(create_examination_handler::<S>).get(list_examinations_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id",
            get(get_examination_handler::<S>).delete(delete_examination_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/requirements",
            get(list_requirements_handler::<S>).put(save_requirement_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/requirements/coverage",
            get(coverage_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/assignments",
            post(assign_handler::<S>).get(list_assignments_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/assignments/:assignment_id",
            delete(unassign_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/rooms",
            post(register_room_handler::<S>).get(list_rooms_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/rooms/:room_id",
            delete(remove_room_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/approvals",
            get(approved_dates_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/approvals/:date",
            post(approve_handler::<S>).get(approval_status_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/allocations/:date/generate",
            post(generate_handler::<S>),
        )
        .route(
            "/api/v1/examinations/:exam_id/allocations/:date",
            get(allocations_handler::<S>),
        )
        .route(
            "/api/v1/staff/:staff_id/duties",
            get(duties_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExaminationQuery {
    pub status: Option<ExamStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoverageQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssignmentQuery {
    pub date: Option<NaiveDate>,
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RoomQuery {
    pub date: Option<NaiveDate>,
    pub session: Option<Session>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateQuery {
    pub session: Option<Session>,
}

pub(crate) async fn create_examination_handler<S>(
    State(service): SharedService<S>,
    axum::Json(request): axum::Json<NewExamination>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.create_examination(request) {
        Ok(examination) => (StatusCode::CREATED, axum::Json(examination)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_examinations_handler<S>(
    State(service): SharedService<S>,
    Query(query): Query<ExaminationQuery>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let today = Local::now().date_naive();
    match service.list_examinations(query.status, today) {
        Ok(examinations) => (StatusCode::OK, axum::Json(examinations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_examination_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let today = Local::now().date_naive();
    match service.get_examination(&ExamId(exam_id)) {
        Ok(examination) => (
            StatusCode::OK,
            axum::Json(ExaminationView::new(examination, today)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_examination_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.delete_examination(&ExamId(exam_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_requirement_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    axum::Json(input): axum::Json<RequirementInput>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.save_requirement(&ExamId(exam_id), input) {
        Ok(requirement) => (StatusCode::OK, axum::Json(requirement)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_requirements_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.requirements(&ExamId(exam_id)) {
        Ok(requirements) => (StatusCode::OK, axum::Json(requirements)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn coverage_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    Query(query): Query<CoverageQuery>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.requirement_coverage(&ExamId(exam_id), query.date) {
        Ok(coverage) => (StatusCode::OK, axum::Json(coverage)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    axum::Json(request): axum::Json<NewAssignment>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let now = Local::now().naive_local();
    match service.assign_staff(&ExamId(exam_id), request, now) {
        Ok(assignment) => (StatusCode::CREATED, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_assignments_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    Query(query): Query<AssignmentQuery>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let department = query.department.map(Department);
    match service.assignments(&ExamId(exam_id), query.date, department.as_ref()) {
        Ok(assignments) => (StatusCode::OK, axum::Json(assignments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn unassign_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, assignment_id)): Path<(String, String)>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let now = Local::now().naive_local();
    match service.unassign_staff(&ExamId(exam_id), &AssignmentId(assignment_id), now) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_room_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    axum::Json(request): axum::Json<NewRoom>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.register_room(&ExamId(exam_id), request) {
        Ok(room) => (StatusCode::CREATED, axum::Json(room)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_rooms_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
    Query(query): Query<RoomQuery>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.rooms(&ExamId(exam_id), query.date, query.session) {
        Ok(rooms) => (StatusCode::OK, axum::Json(rooms)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_room_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, room_id)): Path<(String, String)>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.remove_room(&ExamId(exam_id), &RoomId(room_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, date)): Path<(String, NaiveDate)>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.approve_date(&ExamId(exam_id.clone()), date) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({
                "exam_id": exam_id,
                "date": date,
                "approved": true,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approval_status_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, date)): Path<(String, NaiveDate)>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.is_date_approved(&ExamId(exam_id.clone()), date) {
        Ok(approved) => (
            StatusCode::OK,
            axum::Json(json!({
                "exam_id": exam_id,
                "date": date,
                "approved": approved,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approved_dates_handler<S>(
    State(service): SharedService<S>,
    Path(exam_id): Path<String>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.approved_dates(&ExamId(exam_id)) {
        Ok(dates) => (StatusCode::OK, axum::Json(dates)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Runs one session when `?session=` is given, otherwise both.
pub(crate) async fn generate_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, date)): Path<(String, NaiveDate)>,
    Query(query): Query<GenerateQuery>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    let exam_id = ExamId(exam_id);
    let result = match query.session {
        Some(session) => service
            .generate_session_plan(&exam_id, date, session)
            .map(|plan| axum::Json(plan).into_response()),
        None => service
            .generate_day_plan(&exam_id, date)
            .map(|plan| axum::Json(plan).into_response()),
    };

    match result {
        Ok(response) => response,
        Err(error) => error_response(error),
    }
}

pub(crate) async fn allocations_handler<S>(
    State(service): SharedService<S>,
    Path((exam_id, date)): Path<(String, NaiveDate)>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.allocations_for_date(&ExamId(exam_id), date) {
        Ok(allocations) => (StatusCode::OK, axum::Json(allocations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn duties_handler<S>(
    State(service): SharedService<S>,
    Path(staff_id): Path<String>,
) -> Response
where
    S: InvigilationStore + 'static,
{
    match service.duties_for_staff(&StaffId(staff_id)) {
        Ok(duties) => (StatusCode::OK, axum::Json(duties)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &InvigilationServiceError) -> StatusCode {
    match error {
        InvigilationServiceError::ExaminationNotFound(_)
        | InvigilationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        InvigilationServiceError::Repository(RepositoryError::Conflict)
        | InvigilationServiceError::DuplicateAssignment { .. }
        | InvigilationServiceError::DuplicateRoom { .. }
        | InvigilationServiceError::Allocation(AllocationError::NotApproved { .. }) => {
            StatusCode::CONFLICT
        }
        InvigilationServiceError::InvalidExamination(_)
        | InvigilationServiceError::DateOutsideExam { .. }
        | InvigilationServiceError::Allocation(AllocationError::NoStaff { .. })
        | InvigilationServiceError::Allocation(AllocationError::NoRooms { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        InvigilationServiceError::ChangeWindowClosed { .. } => StatusCode::LOCKED,
        InvigilationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: InvigilationServiceError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "invigilation request failed");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
