use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;

use super::common::{success_response, validate_input};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    errors::ApiError,
    services::users::LoginInput,
    AppState,
};

/// Exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = state
        .auth
        .generate_token(&user)
        .map_err(crate::errors::ServiceError::from)?;
    info!(user_id = %user.id, role = %user.role, "login");
    Ok(success_response(token))
}

/// The caller's identity as carried by the token.
pub async fn me(user: AuthUser) -> impl IntoResponse {
    success_response(user)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .merge(Router::new().route("/me", get(me)).with_auth())
}
