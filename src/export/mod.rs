//! CSV registers and printable dispatch documents.

mod gate_pass;

pub use gate_pass::GatePassRenderer;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{device, outward_item, outward_record, spare_part, DeviceStatus},
    errors::ServiceError,
    services::outward::devices_for,
};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Serialize)]
struct DeviceRow<'a> {
    barcode: &'a str,
    category: String,
    brand: &'a str,
    model: &'a str,
    serial_number: &'a str,
    cpu: &'a str,
    ram: &'a str,
    storage: &'a str,
    ownership: String,
    status: String,
    grade: String,
    rack_location: &'a str,
    received_at: String,
}

impl<'a> From<&'a device::Model> for DeviceRow<'a> {
    fn from(d: &'a device::Model) -> Self {
        Self {
            barcode: &d.barcode,
            category: serde_plain(&d.category),
            brand: &d.brand,
            model: &d.model,
            serial_number: d.serial_number.as_deref().unwrap_or_default(),
            cpu: d.cpu.as_deref().unwrap_or_default(),
            ram: d.ram.as_deref().unwrap_or_default(),
            storage: d.storage.as_deref().unwrap_or_default(),
            ownership: serde_plain(&d.ownership),
            status: d.status.to_string(),
            grade: d.grade.map(|g| serde_plain(&g)).unwrap_or_default(),
            rack_location: d.rack_location.as_deref().unwrap_or_default(),
            received_at: d.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutwardRow<'a> {
    outward_number: &'a str,
    outward_type: String,
    dispatched_at: String,
    customer_name: &'a str,
    reference_number: &'a str,
    barcode: &'a str,
    brand: &'a str,
    model: &'a str,
    serial_number: &'a str,
    grade: String,
}

#[derive(Debug, Serialize)]
struct SpareRow<'a> {
    part_code: &'a str,
    name: &'a str,
    category: &'a str,
    compatible_models: &'a str,
    current_stock: i32,
    min_stock_level: i32,
    low_stock: bool,
    rack_location: &'a str,
    unit_cost: String,
}

/// Enum values as they appear on the wire (`REFURB_STOCK`, `A`, ...).
fn serde_plain<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::ExportError(e.to_string()))
}

/// Produces downloadable registers from live data.
pub struct ExportService {
    db_pool: Arc<DbPool>,
    gate_pass: GatePassRenderer,
}

impl ExportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            gate_pass: GatePassRenderer::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn devices_csv(&self, status: Option<DeviceStatus>) -> Result<Vec<u8>, ServiceError> {
        let mut query = device::Entity::find();
        if let Some(status) = status {
            query = query.filter(device::Column::Status.eq(status));
        }
        let devices = query
            .order_by_asc(device::Column::Barcode)
            .all(&*self.db_pool)
            .await?;
        write_rows(devices.iter().map(DeviceRow::from))
    }

    /// One line per dispatched device, optionally limited to a window.
    #[instrument(skip(self))]
    pub async fn outward_register_csv(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = outward_record::Entity::find();
        if let Some(from) = from {
            query = query.filter(outward_record::Column::DispatchedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(outward_record::Column::DispatchedAt.lt(to));
        }
        let records = query
            .order_by_asc(outward_record::Column::DispatchedAt)
            .find_with_related(outward_item::Entity)
            .all(db)
            .await?;

        let device_ids: Vec<Uuid> = records
            .iter()
            .flat_map(|(_, items)| items.iter().map(|i| i.device_id))
            .collect();
        let devices: std::collections::HashMap<Uuid, device::Model> = device::Entity::find()
            .filter(device::Column::Id.is_in(device_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let rows = records.iter().flat_map(|(record, items)| {
            items.iter().filter_map(|item| {
                devices.get(&item.device_id).map(|d| OutwardRow {
                    outward_number: &record.outward_number,
                    outward_type: record.outward_type.to_string(),
                    dispatched_at: record.dispatched_at.to_rfc3339(),
                    customer_name: &record.customer_name,
                    reference_number: &record.reference_number,
                    barcode: &d.barcode,
                    brand: &d.brand,
                    model: &d.model,
                    serial_number: d.serial_number.as_deref().unwrap_or_default(),
                    grade: d.grade.map(|g| serde_plain(&g)).unwrap_or_default(),
                })
            })
        });
        write_rows(rows)
    }

    #[instrument(skip(self))]
    pub async fn spares_csv(&self) -> Result<Vec<u8>, ServiceError> {
        let parts = spare_part::Entity::find()
            .order_by_asc(spare_part::Column::PartCode)
            .all(&*self.db_pool)
            .await?;
        write_rows(parts.iter().map(|p| SpareRow {
            part_code: &p.part_code,
            name: &p.name,
            category: p.category.as_deref().unwrap_or_default(),
            compatible_models: p.compatible_models.as_deref().unwrap_or_default(),
            current_stock: p.current_stock,
            min_stock_level: p.min_stock_level,
            low_stock: p.is_low_stock(),
            rack_location: p.rack_location.as_deref().unwrap_or_default(),
            unit_cost: p.unit_cost.map(|c| c.to_string()).unwrap_or_default(),
        }))
    }

    /// Printable gate pass / delivery note for one dispatch, as HTML.
    #[instrument(skip(self))]
    pub async fn gate_pass_html(&self, outward_id: Uuid) -> Result<String, ServiceError> {
        let db = &*self.db_pool;
        let record = outward_record::Entity::find_by_id(outward_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Outward record {} not found", outward_id)))?;
        let devices = devices_for(db, record.id).await?;
        self.gate_pass.render(&record, &devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{receive_device, stock_part, test_db};

    fn lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn devices_csv_filters_by_status() {
        let db = Arc::new(test_db().await);
        receive_device(&db, "CSV-1").await;
        receive_device(&db, "CSV-2").await;
        let svc = ExportService::new(db);

        let all = lines(svc.devices_csv(None).await.unwrap());
        assert!(all[0].starts_with("barcode,category,brand"));
        assert_eq!(all.len(), 3);
        assert!(all[1].contains("PENDING_INSPECTION"));
        assert!(all[1].contains("RENTAL_RETURN"));

        let none = lines(svc.devices_csv(Some(DeviceStatus::ReadyForStock)).await.unwrap());
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn spares_csv_flags_low_stock() {
        let db = Arc::new(test_db().await);
        stock_part(&db, "KB-US", 0).await;
        stock_part(&db, "SSD-256", 5).await;
        let rows = lines(ExportService::new(db).spares_csv().await.unwrap());
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("KB-US,"));
        assert!(rows[1].contains(",true,"));
        assert!(rows[2].contains(",false,"));
    }

    #[tokio::test]
    async fn gate_pass_for_unknown_dispatch_is_not_found() {
        let db = Arc::new(test_db().await);
        let err = ExportService::new(db)
            .gate_pass_html(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
