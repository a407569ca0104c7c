use crate::{
    db::DbPool,
    entities::{
        attachment, device, device_history, inspection, paint_panel, qc_record, repair_job,
        DeviceCategory, DeviceStatus, Ownership,
    },
    errors::ServiceError,
    services::lifecycle::{find_device, record_history, Transition},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel, Iterable,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeviceFilter {
    pub status: Option<DeviceStatus>,
    pub category: Option<DeviceCategory>,
    pub ownership: Option<Ownership>,
    pub inward_batch_id: Option<Uuid>,
    /// Matches barcode, serial number, brand or model.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDeviceInput {
    pub category: Option<DeviceCategory>,
    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RackLocationInput {
    #[validate(length(min = 1, max = 64))]
    pub rack_location: String,
}

/// Everything recorded against one device.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub device: device::Model,
    #[schema(value_type = Vec<Object>)]
    pub inspections: Vec<inspection::Model>,
    #[schema(value_type = Vec<Object>)]
    pub repair_jobs: Vec<repair_job::Model>,
    #[schema(value_type = Vec<Object>)]
    pub paint_panels: Vec<paint_panel::Model>,
    #[schema(value_type = Vec<Object>)]
    pub qc_records: Vec<qc_record::Model>,
    #[schema(value_type = Vec<Object>)]
    pub attachments: Vec<attachment::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: DeviceStatus,
    pub count: u64,
}

pub struct DeviceService {
    db_pool: Arc<DbPool>,
}

impl DeviceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_device(&self, id: Uuid) -> Result<DeviceDetail, ServiceError> {
        let db = &*self.db_pool;
        let device = find_device(db, id).await?;

        let inspections = inspection::Entity::find()
            .filter(inspection::Column::DeviceId.eq(id))
            .order_by_asc(inspection::Column::CreatedAt)
            .all(db)
            .await?;
        let repair_jobs = repair_job::Entity::find()
            .filter(repair_job::Column::DeviceId.eq(id))
            .order_by_asc(repair_job::Column::CreatedAt)
            .all(db)
            .await?;
        let paint_panels = paint_panel::Entity::find()
            .filter(paint_panel::Column::DeviceId.eq(id))
            .order_by_asc(paint_panel::Column::CreatedAt)
            .all(db)
            .await?;
        let qc_records = qc_record::Entity::find()
            .filter(qc_record::Column::DeviceId.eq(id))
            .order_by_asc(qc_record::Column::CreatedAt)
            .all(db)
            .await?;
        let attachments = attachment::Entity::find()
            .filter(attachment::Column::DeviceId.eq(id))
            .order_by_asc(attachment::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(DeviceDetail {
            device,
            inspections,
            repair_jobs,
            paint_panels,
            qc_records,
            attachments,
        })
    }

    /// Barcode scan lookup.
    #[instrument(skip(self))]
    pub async fn get_by_barcode(&self, barcode: &str) -> Result<device::Model, ServiceError> {
        let barcode = barcode.trim();
        device::Entity::find()
            .filter(device::Column::Barcode.eq(barcode))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No device with barcode {}", barcode)))
    }

    #[instrument(skip(self))]
    pub async fn list_devices(
        &self,
        filter: DeviceFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<device::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = device::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(device::Column::Status.eq(status));
        }
        if let Some(category) = filter.category {
            query = query.filter(device::Column::Category.eq(category));
        }
        if let Some(ownership) = filter.ownership {
            query = query.filter(device::Column::Ownership.eq(ownership));
        }
        if let Some(batch_id) = filter.inward_batch_id {
            query = query.filter(device::Column::InwardBatchId.eq(batch_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(device::Column::Barcode.contains(search))
                    .add(device::Column::SerialNumber.contains(search))
                    .add(device::Column::Brand.contains(search))
                    .add(device::Column::Model.contains(search)),
            );
        }

        let paginator = query
            .order_by_desc(device::Column::UpdatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let devices = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((devices, total))
    }

    /// Activity log, oldest first.
    #[instrument(skip(self))]
    pub async fn history(&self, device_id: Uuid) -> Result<Vec<device_history::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_device(db, device_id).await?;
        Ok(device_history::Entity::find()
            .filter(device_history::Column::DeviceId.eq(device_id))
            .order_by_asc(device_history::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update_details(
        &self,
        id: Uuid,
        input: UpdateDeviceInput,
    ) -> Result<device::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let device = find_device(db, id).await?;
        if device.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Device {} is {} and can no longer be edited",
                device.barcode, device.status
            )));
        }

        let mut active = device.into_active_model();
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(brand) = input.brand {
            active.brand = Set(brand.trim().to_string());
        }
        if let Some(model) = input.model {
            active.model = Set(model.trim().to_string());
        }
        if input.serial_number.is_some() {
            active.serial_number = Set(input.serial_number);
        }
        if input.cpu.is_some() {
            active.cpu = Set(input.cpu);
        }
        if input.ram.is_some() {
            active.ram = Set(input.ram);
        }
        if input.storage.is_some() {
            active.storage = Set(input.storage);
        }
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        Ok(active.update(db).await?)
    }

    /// Records where the device sits on the racks; logged in the history.
    #[instrument(skip(self, input))]
    pub async fn set_rack_location(
        &self,
        id: Uuid,
        input: RackLocationInput,
        performed_by: Uuid,
    ) -> Result<device::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let device = find_device(db, id).await?;
        let location = input.rack_location.trim().to_string();
        let status = device.status;

        let mut active = device.into_active_model();
        active.rack_location = Set(Some(location.clone()));
        let device = active.update(db).await?;

        record_history(
            db,
            device.id,
            Some(status),
            status,
            &Transition::new("rack_location", performed_by).with_notes(Some(location)),
        )
        .await?;
        Ok(device)
    }

    /// Device count for every status, zeros included.
    #[instrument(skip(self))]
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, ServiceError> {
        count_by_status(&*self.db_pool).await
    }
}

/// Device count per status, zeros included, in lifecycle order.
pub(crate) async fn count_by_status<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<StatusCount>, ServiceError> {
    let rows: Vec<(String, i64)> = device::Entity::find()
        .select_only()
        .column(device::Column::Status)
        .column_as(device::Column::Id.count(), "count")
        .group_by(device::Column::Status)
        .into_tuple()
        .all(conn)
        .await?;

    let by_status: HashMap<DeviceStatus, u64> = rows
        .into_iter()
        .filter_map(|(status, count)| DeviceStatus::parse(&status).map(|s| (s, count.max(0) as u64)))
        .collect();

    Ok(DeviceStatus::iter()
        .map(|status| StatusCount {
            status,
            count: by_status.get(&status).copied().unwrap_or(0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{receive_device, test_db};
    use assert_matches::assert_matches;

    async fn setup() -> (Arc<DbPool>, DeviceService) {
        let db = Arc::new(test_db().await);
        (db.clone(), DeviceService::new(db))
    }

    #[tokio::test]
    async fn barcode_lookup_and_search() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "SCAN-001").await;
        receive_device(&db, "SCAN-002").await;

        let found = svc.get_by_barcode(" SCAN-001 ").await.unwrap();
        assert_eq!(found.id, device.id);
        assert_matches!(svc.get_by_barcode("missing").await, Err(ServiceError::NotFound(_)));

        let (rows, total) = svc
            .list_devices(
                DeviceFilter {
                    search: Some("SCAN-00".into()),
                    status: Some(DeviceStatus::PendingInspection),
                    ..Default::default()
                },
                1,
                1,
            )
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn rack_moves_are_logged() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "RACK-1").await;
        let actor = Uuid::new_v4();

        let moved = svc
            .set_rack_location(
                device.id,
                RackLocationInput {
                    rack_location: "B-04-2".into(),
                },
                actor,
            )
            .await
            .unwrap();
        assert_eq!(moved.rack_location.as_deref(), Some("B-04-2"));

        let history = svc.history(device.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, "received");
        assert_eq!(history[1].action, "rack_location");
        assert_eq!(history[1].performed_by, Some(actor));
    }

    #[tokio::test]
    async fn status_counts_include_every_status() {
        let (db, svc) = setup().await;
        receive_device(&db, "C-1").await;
        receive_device(&db, "C-2").await;

        let counts = svc.status_counts().await.unwrap();
        assert_eq!(counts.len(), DeviceStatus::iter().count());
        let pending = counts
            .iter()
            .find(|c| c.status == DeviceStatus::PendingInspection)
            .unwrap();
        assert_eq!(pending.count, 2);
        assert!(counts
            .iter()
            .filter(|c| c.status != DeviceStatus::PendingInspection)
            .all(|c| c.count == 0));
    }

    #[tokio::test]
    async fn update_details_edits_specs() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "UPD-1").await;
        let updated = svc
            .update_details(
                device.id,
                UpdateDeviceInput {
                    ram: Some("32GB".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.ram.as_deref(), Some("32GB"));
        assert_eq!(updated.brand, device.brand);

        let detail = svc.get_device(device.id).await.unwrap();
        assert_eq!(detail.device.ram.as_deref(), Some("32GB"));
        assert!(detail.repair_jobs.is_empty());
    }
}
