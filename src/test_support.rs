//! Fixtures shared by the unit tests.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::{establish_connection, run_migrations, DbPool};
use crate::entities::{device, DeviceCategory, InwardType};
use crate::events::EventSender;
use crate::services::inward::{CreateBatchInput, InwardService, NewDeviceInput};
use crate::services::spares::{CreateSparePartInput, SparesService};

/// Fresh in-memory database with every migration applied.
pub async fn test_db() -> DbPool {
    let db = establish_connection("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    run_migrations(&db).await.expect("apply migrations");
    db
}

/// Sender whose receiver is gone; emitted events are logged and dropped.
pub fn test_events() -> Arc<EventSender> {
    let (tx, _rx) = mpsc::channel(1);
    Arc::new(EventSender::new(tx))
}

pub fn new_device(barcode: &str) -> NewDeviceInput {
    NewDeviceInput {
        barcode: barcode.to_string(),
        category: DeviceCategory::Laptop,
        brand: "Dell".to_string(),
        model: "Latitude 7490".to_string(),
        serial_number: Some(format!("SN-{}", barcode)),
        cpu: Some("i5-8350U".to_string()),
        ram: Some("16GB".to_string()),
        storage: Some("256GB SSD".to_string()),
        notes: None,
    }
}

/// Registers one device through a rental-return batch.
pub async fn receive_device(db: &Arc<DbPool>, barcode: &str) -> device::Model {
    let inward = InwardService::new(db.clone(), test_events());
    let mut detail = inward
        .create_batch(
            CreateBatchInput {
                inward_type: InwardType::RentalReturn,
                purchase_order_id: None,
                supplier_name: None,
                customer_name: Some("Initech".to_string()),
                rental_reference: Some(format!("RA-{}", barcode)),
                notes: None,
                devices: vec![new_device(barcode)],
            },
            Uuid::new_v4(),
        )
        .await
        .expect("receive device");
    detail.devices.remove(0)
}

pub async fn stock_part(db: &Arc<DbPool>, code: &str, stock: i32) {
    SparesService::new(db.clone(), test_events())
        .create_part(
            CreateSparePartInput {
                part_code: code.to_string(),
                name: format!("Part {}", code),
                category: None,
                compatible_models: None,
                initial_stock: stock,
                min_stock_level: 0,
                rack_location: None,
                unit_cost: None,
            },
            Uuid::new_v4(),
        )
        .await
        .expect("create spare part");
}
