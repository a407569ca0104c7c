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
    auth::AuthUser,
    entities::PurchaseOrderStatus,
    errors::ApiError,
    services::purchase_orders::CreatePurchaseOrderInput,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderListQuery {
    pub status: Option<PurchaseOrderStatus>,
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .create(payload, user.user_id)
        .await?;
    info!(po_number = %order.po_number, "purchase order created");
    Ok(created_response(order))
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderListQuery>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (orders, total) = state
        .services
        .purchase_orders
        .list(filter.status, page, per_page)
        .await?;
    Ok(paginated_response(orders, total, page, per_page))
}

/// Order with the inward batches received against it.
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchase_orders.get(id).await?))
}

pub async fn close_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchase_orders.close(id).await?))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/{id}", get(get_purchase_order))
        .route("/{id}/close", post(close_purchase_order))
}
