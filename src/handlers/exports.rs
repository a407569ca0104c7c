use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::file_response;
use crate::{entities::DeviceStatus, errors::ApiError, export::CSV_CONTENT_TYPE, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct DeviceExportQuery {
    pub status: Option<DeviceStatus>,
}

/// Dispatch window, both ends inclusive and optional.
#[derive(Debug, Default, Deserialize)]
pub struct OutwardExportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn export_devices(
    State(state): State<AppState>,
    Query(query): Query<DeviceExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.services.exports.devices_csv(query.status).await?;
    Ok(file_response(CSV_CONTENT_TYPE, "devices.csv", body))
}

pub async fn export_outward_register(
    State(state): State<AppState>,
    Query(query): Query<OutwardExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::BadRequest(
                "`from` must not be after `to`".to_string(),
            ));
        }
    }
    let body = state
        .services
        .exports
        .outward_register_csv(query.from, query.to)
        .await?;
    Ok(file_response(CSV_CONTENT_TYPE, "outward-register.csv", body))
}

pub async fn export_spares(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.services.exports.spares_csv().await?;
    Ok(file_response(CSV_CONTENT_TYPE, "spares-stock.csv", body))
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/devices.csv", get(export_devices))
        .route("/outward-register.csv", get(export_outward_register))
        .route("/spares.csv", get(export_spares))
}
