use axum::{extract::State, response::IntoResponse, routing::get, Router};

use super::common::success_response;
use crate::{errors::ApiError, AppState};

/// Floor-wide counts for the manager's dashboard.
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.reports.dashboard().await?))
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}
