use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{auth::AuthUser, errors::ApiError, services::qc::SubmitQcInput, AppState};

pub async fn submit_qc(
    State(state): State<AppState>,
    user: AuthUser,
    Path(device_id): Path<Uuid>,
    Json(payload): Json<SubmitQcInput>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .qc
        .submit_qc(device_id, payload, user.user_id)
        .await?;
    info!(%device_id, status = %outcome.device.status, "qc recorded");
    Ok(created_response(outcome))
}

pub async fn qc_history(
    State(state): State<AppState>,
    Path(device_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.qc.history(device_id).await?))
}

pub fn qc_routes() -> Router<AppState> {
    Router::new().route("/{device_id}", post(submit_qc).get(qc_history))
}
