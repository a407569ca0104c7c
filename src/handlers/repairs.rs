use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use super::common::{paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::repairs::{AssignRepairInput, CompleteRepairInput, RepairQueueFilter},
    AppState,
};

pub async fn repair_queue(
    State(state): State<AppState>,
    Query(filter): Query<RepairQueueFilter>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (jobs, total) = state
        .services
        .repairs
        .list_queue(filter, page, per_page)
        .await?;
    Ok(paginated_response(jobs, total, page, per_page))
}

/// Open jobs whose TAT due date has passed.
pub async fn overdue_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.repairs.list_overdue(Utc::now()).await?,
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.repairs.get_job(id).await?))
}

pub async fn assign_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRepairInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.repairs.assign(id, payload).await?,
    ))
}

pub async fn start_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.repairs.start(id, user.user_id).await?,
    ))
}

pub async fn complete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRepairInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .repairs
            .complete(id, payload, user.user_id)
            .await?,
    ))
}

/// Retry issuing spares for a job parked on a shortage.
pub async fn issue_spares(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.repairs.issue_spares(id, user.user_id).await?,
    ))
}

pub fn repair_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(repair_queue))
        .route("/overdue", get(overdue_jobs))
        .route("/{id}", get(get_job))
        .route("/{id}/assign", post(assign_job))
        .route("/{id}/start", post(start_job))
        .route("/{id}/complete", post(complete_job))
        .route("/{id}/issue-spares", post(issue_spares))
}
