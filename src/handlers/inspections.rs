use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::common::created_response;
use crate::{
    auth::AuthUser, errors::ApiError, services::inspection::SubmitInspectionInput, AppState,
};

/// L1 inspection of an inwarded device. Opens repair, specialist and paint
/// work as the findings require.
pub async fn submit_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(device_id): Path<Uuid>,
    Json(payload): Json<SubmitInspectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .inspection
        .submit_inspection(device_id, payload, user.user_id)
        .await?;
    info!(%device_id, status = %result.device.status, "inspection recorded");
    Ok(created_response(result))
}

pub fn inspection_routes() -> Router<AppState> {
    Router::new().route("/{device_id}", post(submit_inspection))
}
