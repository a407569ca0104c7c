use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::{auth, entities, errors, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Refurb Ops API",
        version = "1.0.0",
        description = r#"
Shop-floor tracker for refurbished laptops, desktops and peripherals.

Devices move inward → inspection → repair / specialist / paint → QC → stock → outward.
Every route under `/api/v1` except `status`, `health` and this document needs a
bearer token from `POST /auth/login`:

```
Authorization: Bearer <token>
```

Route groups are gated by workstation role; `ADMIN` passes every gate.
List endpoints take `page` (from 1) and `per_page`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080/api/v1", description = "Local development")),
    tags(
        (name = "Inward", description = "Receiving batches and purchase orders"),
        (name = "Devices", description = "Device records, history and attachments"),
        (name = "Workshop", description = "Inspection, repair, specialist, paint and QC"),
        (name = "Spares", description = "Spare part stock"),
        (name = "Outward", description = "Dispatch and gate passes"),
        (name = "Admin", description = "Users, reports and exports")
    ),
    components(
        schemas(
            errors::ErrorResponse,
            auth::TokenResponse,
            services::users::LoginInput,
            services::users::CreateUserInput,
            entities::DeviceStatus,
            entities::DeviceCategory,
            entities::Ownership,
            entities::Grade,
            entities::InwardType,
            entities::OutwardType,
            entities::PanelType,
            entities::PaintPanelStatus,
            entities::PurchaseOrderStatus,
            entities::QcResult,
            entities::RepairJobStatus,
            entities::SpareTransactionKind,
            entities::SpecialistJobStatus,
            entities::SpecialistKind,
            entities::UserRole,
            services::inward::NewDeviceInput,
            services::inward::CreateBatchInput,
            services::inward::AddDevicesInput,
            services::purchase_orders::CreatePurchaseOrderInput,
            services::devices::UpdateDeviceInput,
            services::devices::RackLocationInput,
            services::devices::StatusCount,
            services::inspection::SubmitInspectionInput,
            services::repairs::AssignRepairInput,
            services::repairs::CompleteRepairInput,
            services::specialist::CreateSpecialistJobInput,
            services::specialist::CompleteSpecialistJobInput,
            services::qc::SubmitQcInput,
            services::spares::CreateSparePartInput,
            services::spares::UpdateSparePartInput,
            services::spares::ReceiveStockInput,
            services::spares::AdjustStockInput,
            services::outward::DispatchInput,
            services::reports::SpecialistQueueCount,
            services::reports::DashboardSummary,
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document as JSON.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_request_schemas() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Refurb Ops API"));
        assert!(json.contains("DispatchInput"));
        assert!(json.contains("SubmitQcInput"));
    }
}
