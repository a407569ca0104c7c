use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::common::{created_response, paginated_response, success_response, PaginationParams};
use crate::{
    entities::UserRole, errors::ApiError, services::users::CreateUserInput, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.users.create_user(payload).await?;
    info!(user_id = %user.id, role = %user.role, "user created");
    Ok(created_response(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserListQuery>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (users, total) = state
        .services
        .users
        .list_users(filter.role, page, per_page)
        .await?;
    Ok(paginated_response(users, total, page, per_page))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.users.get_user(id).await?))
}

pub async fn activate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.users.set_active(id, true).await?,
    ))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.users.set_active(id, false).await?,
    ))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/{id}", get(get_user))
        .route("/{id}/activate", post(activate_user))
        .route("/{id}/deactivate", post(deactivate_user))
}
