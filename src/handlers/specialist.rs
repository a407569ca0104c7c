use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::specialist::{
        CompleteSpecialistJobInput, CreateSpecialistJobInput, SpecialistQueueFilter,
    },
    AppState,
};

/// Escalate part of a repair job to the L3, display or battery bench.
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<CreateSpecialistJobInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.specialist.create(payload).await?,
    ))
}

pub async fn specialist_queue(
    State(state): State<AppState>,
    Query(filter): Query<SpecialistQueueFilter>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (jobs, total) = state
        .services
        .specialist
        .list_queue(filter, page, per_page)
        .await?;
    Ok(paginated_response(jobs, total, page, per_page))
}

pub async fn start_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.specialist.start(id, &user).await?,
    ))
}

pub async fn complete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteSpecialistJobInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .specialist
            .complete(id, payload, &user)
            .await?,
    ))
}

pub fn specialist_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_job).get(specialist_queue))
        .route("/{id}/start", post(start_job))
        .route("/{id}/complete", post(complete_job))
}
