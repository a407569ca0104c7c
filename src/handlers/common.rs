use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    config::AppConfig, errors::ApiError, services::page_bounds, ApiResponse, PaginatedResponse,
};

/// 200 with the standard envelope.
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 201 with the standard envelope.
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// 201 with the standard envelope and a confirmation message.
pub fn created_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(data).with_message(message)),
    )
        .into_response()
}

pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(ApiError::from)
}

/// Raw download with a suggested file name.
pub fn file_response(content_type: &str, file_name: &str, body: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\'], "_")
    );
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Page and page size, defaulted and clamped by configuration.
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        page_bounds(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(config.api_default_page_size),
            config.api_max_page_size,
        )
    }
}

pub fn paginated_response<T: Serialize>(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Response {
    success_response(PaginatedResponse::new(items, total, page, per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_come_from_config() {
        let config = AppConfig::new("sqlite::memory:", "x".repeat(64), "test");
        let (page, per_page) = PaginationParams::default().resolve(&config);
        assert_eq!(page, 1);
        assert_eq!(per_page, config.api_default_page_size);

        let params = PaginationParams {
            page: Some(0),
            per_page: Some(100_000),
        };
        assert_eq!(params.resolve(&config), (1, config.api_max_page_size));
    }

    #[test]
    fn file_response_sets_download_headers() {
        let response = file_response("text/csv", "devices.csv", b"a,b\n".to_vec());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"devices.csv\""
        );
    }
}
