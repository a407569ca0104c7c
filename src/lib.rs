//! Refurb Ops
//!
//! Shop-floor tracker for a refurbished-electronics warehouse: devices are
//! received, inspected, repaired, painted, quality-checked, stocked and
//! dispatched, with every station working through the JSON API exposed here.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod export;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;
pub mod uploads;
pub mod workflow;

#[cfg(test)]
mod test_support;

use axum::{routing::get, Extension, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::UserRole;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<AuthService>,
    pub services: services::AppServices,
}

impl AppState {
    /// Wires every service over one connection pool and event channel.
    pub fn new(
        db: Arc<db::DbPool>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from(&config)));
        let services = services::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Success with a short confirmation a front end can show as-is.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


/// Every `/api/v1` route, each workstation group behind its role gate.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        devices, exports, health, inspections, inward, outward, paint, purchase_orders, qc,
        repairs, reports, spares, specialist, users,
    };
    use UserRole::*;

    let devices = devices::device_read_routes()
        .with_auth()
        .merge(devices::device_write_routes().with_roles(&[WarehouseManager, InwardExecutive]));

    Router::new()
        .merge(health::health_routes())
        .route("/openapi.json", get(crate::openapi::openapi_json))
        .nest(
            "/inward",
            inward::inward_routes().with_roles(&[InwardExecutive, WarehouseManager]),
        )
        .nest(
            "/purchase-orders",
            purchase_orders::purchase_order_routes()
                .with_roles(&[InwardExecutive, WarehouseManager]),
        )
        .nest("/devices", devices)
        .nest(
            "/inspections",
            inspections::inspection_routes().with_roles(&[InspectionEngineer]),
        )
        .nest(
            "/repairs",
            repairs::repair_routes().with_roles(&[L2Engineer, WarehouseManager]),
        )
        .nest(
            "/specialist",
            specialist::specialist_routes().with_roles(&[
                L3Engineer,
                DisplayTechnician,
                BatteryTechnician,
                L2Engineer,
            ]),
        )
        .nest(
            "/paint",
            paint::paint_routes().with_roles(&[PaintTechnician, L2Engineer]),
        )
        .nest("/qc", qc::qc_routes().with_roles(&[QcEngineer]))
        .nest(
            "/spares",
            spares::spares_routes().with_roles(&[SparesManager, WarehouseManager]),
        )
        .nest(
            "/outward",
            outward::outward_routes().with_roles(&[DispatchExecutive, WarehouseManager]),
        )
        .nest(
            "/reports",
            reports::report_routes().with_roles(&[WarehouseManager]),
        )
        .nest(
            "/exports",
            exports::export_routes().with_roles(&[WarehouseManager]),
        )
        .nest("/users", users::user_routes().with_roles(&[Admin]))
}

/// The full application router: `/auth` plus `/api/v1`, with the token
/// service, HTTP tracing and request ids in place. The request-id layer sits
/// outside the trace layer so the request span carries the echoed id.
/// Transport layers are added by the binary.
pub fn app_router(state: AppState) -> Router {
    let auth = state.auth.clone();
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .layer(Extension(auth))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}
