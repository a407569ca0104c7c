use axum::{
    extract::{Json, Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use super::common::{
    created_response, file_response, no_content_response, paginated_response, success_response,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    errors::{ApiError, ServiceError},
    services::{
        attachments::NewAttachment,
        devices::{DeviceFilter, RackLocationInput, UpdateDeviceInput},
    },
    AppState,
};

pub async fn list_devices(
    State(state): State<AppState>,
    Query(filter): Query<DeviceFilter>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (devices, total) = state
        .services
        .devices
        .list_devices(filter, page, per_page)
        .await?;
    Ok(paginated_response(devices, total, page, per_page))
}

/// Device with its inspections, jobs, panels, QC records and attachments.
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.devices.get_device(id).await?))
}

/// Barcode scan lookup.
pub async fn get_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.devices.get_by_barcode(&barcode).await?,
    ))
}

pub async fn device_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.devices.history(id).await?))
}

pub async fn status_counts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.devices.status_counts().await?))
}

pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeviceInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.devices.update_details(id, payload).await?,
    ))
}

pub async fn set_rack_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RackLocationInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .devices
            .set_rack_location(id, payload, user.user_id)
            .await?,
    ))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.attachments.list(id).await?))
}

/// Multipart upload; the file goes in the `file` field.
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("attachment").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ServiceError::PayloadTooLarge(format!("Could not read upload: {}", e))
        })?;
        upload = Some(NewAttachment {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = upload.ok_or_else(|| ApiError::BadRequest("Missing `file` field".to_string()))?;
    let row = state
        .services
        .attachments
        .upload(id, file, user.user_id)
        .await?;
    Ok(created_response(row))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (row, bytes) = state
        .services
        .attachments
        .download(id, attachment_id)
        .await?;
    Ok(file_response(&row.content_type, &row.file_name, bytes))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .attachments
        .delete(id, attachment_id)
        .await?;
    Ok(no_content_response())
}

/// Reads open to every signed-in user.
pub fn device_read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_devices))
        .route("/status-counts", get(status_counts))
        .route("/barcode/{barcode}", get(get_by_barcode))
        .route("/{id}", get(get_device))
        .route("/{id}/history", get(device_history))
        .route(
            "/{id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route("/{id}/attachments/{attachment_id}", get(download_attachment))
}

/// Record edits, rack moves and attachment removal.
pub fn device_write_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(update_device))
        .route("/{id}/rack-location", put(set_rack_location))
        .route(
            "/{id}/attachments/{attachment_id}",
            axum::routing::delete(delete_attachment),
        )
}
