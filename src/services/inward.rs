use crate::{
    db::DbPool,
    entities::{device, inward_batch, DeviceCategory, DeviceStatus, InwardType, Ownership},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        lifecycle::{next_document_number, record_history, Transition},
        purchase_orders::{find_order, record_receipt},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Upper bound on devices registered by one request.
pub const MAX_DEVICES_PER_BATCH: usize = 500;

/// A device scanned in at the inward desk.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewDeviceInput {
    #[validate(length(min = 1, max = 64))]
    pub barcode: String,
    pub category: DeviceCategory,
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub serial_number: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBatchInput {
    pub inward_type: InwardType,
    /// Required for refurb purchases.
    pub purchase_order_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    /// Required for rental returns.
    pub customer_name: Option<String>,
    /// Required for rental returns.
    pub rental_reference: Option<String>,
    pub notes: Option<String>,
    #[validate]
    pub devices: Vec<NewDeviceInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddDevicesInput {
    #[validate]
    pub devices: Vec<NewDeviceInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub batch: inward_batch::Model,
    #[schema(value_type = Vec<Object>)]
    pub devices: Vec<device::Model>,
}

/// Inward desk: receives batches of devices and registers them for inspection.
pub struct InwardService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InwardService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(inward_type = ?input.inward_type, devices = input.devices.len()))]
    pub async fn create_batch(
        &self,
        input: CreateBatchInput,
        received_by: Uuid,
    ) -> Result<BatchDetail, ServiceError> {
        input.validate()?;
        let device_count = check_device_list(&input.devices)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let mut supplier_name = blank_to_none(input.supplier_name);
        let customer_name = blank_to_none(input.customer_name);
        let rental_reference = blank_to_none(input.rental_reference);
        let mut purchase_order_id = None;

        match input.inward_type {
            InwardType::RefurbPurchase => {
                let po_id = input.purchase_order_id.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "purchase_order_id is required for refurb purchases".to_string(),
                    )
                })?;
                let order = find_order(&txn, po_id).await?;
                if supplier_name.is_none() {
                    supplier_name = Some(order.supplier_name.clone());
                }
                record_receipt(&txn, order, device_count).await?;
                purchase_order_id = Some(po_id);
            }
            InwardType::RentalReturn => {
                if customer_name.is_none() || rental_reference.is_none() {
                    return Err(ServiceError::ValidationError(
                        "customer_name and rental_reference are required for rental returns"
                            .to_string(),
                    ));
                }
            }
        }

        let batch_number = next_document_number::<inward_batch::Entity, _>(
            &txn,
            inward_batch::Column::BatchNumber,
            "INW",
        )
        .await?;

        let batch = inward_batch::ActiveModel {
            batch_number: Set(batch_number.clone()),
            inward_type: Set(input.inward_type),
            purchase_order_id: Set(purchase_order_id),
            supplier_name: Set(supplier_name),
            customer_name: Set(customer_name),
            rental_reference: Set(rental_reference),
            received_by: Set(received_by),
            device_count: Set(device_count),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Batch {} already exists", batch_number)))?;

        let devices = register_devices(&txn, &batch, input.devices, received_by).await?;
        txn.commit().await?;

        info!(batch_id = %batch.id, batch_number = %batch.batch_number, devices = devices.len(), "inward batch received");
        self.event_sender
            .send_or_log(Event::BatchReceived {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
                device_count: devices.len(),
            })
            .await;

        Ok(BatchDetail { batch, devices })
    }

    #[instrument(skip(self))]
    pub async fn get_batch(&self, id: Uuid) -> Result<BatchDetail, ServiceError> {
        let db = &*self.db_pool;
        let batch = find_batch(db, id).await?;
        let devices = device::Entity::find()
            .filter(device::Column::InwardBatchId.eq(id))
            .order_by_asc(device::Column::CreatedAt)
            .order_by_asc(device::Column::Barcode)
            .all(db)
            .await?;
        Ok(BatchDetail { batch, devices })
    }

    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        inward_type: Option<InwardType>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inward_batch::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = inward_batch::Entity::find();
        if let Some(kind) = inward_type {
            query = query.filter(inward_batch::Column::InwardType.eq(kind));
        }
        let paginator = query
            .order_by_desc(inward_batch::Column::ReceivedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let batches = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((batches, total))
    }

    /// Late arrivals for an existing batch.
    #[instrument(skip(self, input), fields(devices = input.devices.len()))]
    pub async fn add_devices_to_batch(
        &self,
        batch_id: Uuid,
        input: AddDevicesInput,
        received_by: Uuid,
    ) -> Result<BatchDetail, ServiceError> {
        input.validate()?;
        let added = check_device_list(&input.devices)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let batch = find_batch(&txn, batch_id).await?;

        if let Some(po_id) = batch.purchase_order_id {
            let order = find_order(&txn, po_id).await?;
            record_receipt(&txn, order, added).await?;
        }

        let count = batch.device_count.checked_add(added).ok_or_else(|| {
            ServiceError::InvalidInput(format!("Batch {} is full", batch.batch_number))
        })?;
        let mut active = batch.into_active_model();
        active.device_count = Set(count);
        let batch = active.update(&txn).await?;

        let registered = register_devices(&txn, &batch, input.devices, received_by).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BatchReceived {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
                device_count: registered.len(),
            })
            .await;

        self.get_batch(batch_id).await
    }
}

async fn find_batch<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<inward_batch::Model, ServiceError> {
    inward_batch::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Inward batch {} not found", id)))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// At least one device, and no barcode scanned twice.
/// Checks a batch's device list and returns its size.
fn check_device_list(devices: &[NewDeviceInput]) -> Result<i32, ServiceError> {
    if devices.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one device is required".to_string(),
        ));
    }
    if devices.len() > MAX_DEVICES_PER_BATCH {
        return Err(ServiceError::ValidationError(format!(
            "A batch takes at most {} devices",
            MAX_DEVICES_PER_BATCH
        )));
    }
    let mut seen = HashSet::new();
    for d in devices {
        if !seen.insert(d.barcode.trim()) {
            return Err(ServiceError::ValidationError(format!(
                "Barcode {} appears more than once",
                d.barcode.trim()
            )));
        }
    }
    i32::try_from(devices.len())
        .map_err(|_| ServiceError::ValidationError("Too many devices in one batch".to_string()))
}

async fn register_devices(
    txn: &DatabaseTransaction,
    batch: &inward_batch::Model,
    devices: Vec<NewDeviceInput>,
    received_by: Uuid,
) -> Result<Vec<device::Model>, ServiceError> {
    let barcodes: Vec<String> = devices.iter().map(|d| d.barcode.trim().to_string()).collect();
    let existing = device::Entity::find()
        .filter(device::Column::Barcode.is_in(barcodes))
        .all(txn)
        .await?;
    if !existing.is_empty() {
        let taken: Vec<&str> = existing.iter().map(|d| d.barcode.as_str()).collect();
        return Err(ServiceError::Conflict(format!(
            "Barcode already registered: {}",
            taken.join(", ")
        )));
    }

    let ownership = match batch.inward_type {
        InwardType::RefurbPurchase => Ownership::RefurbStock,
        InwardType::RentalReturn => Ownership::RentalReturn,
    };
    let transition = Transition::new("received", received_by)
        .with_notes(Some(format!("Inward batch {}", batch.batch_number)));

    let mut created = Vec::with_capacity(devices.len());
    for input in devices {
        let barcode = input.barcode.trim().to_string();
        let model = device::ActiveModel {
            barcode: Set(barcode.clone()),
            category: Set(input.category),
            brand: Set(input.brand.trim().to_string()),
            model: Set(input.model.trim().to_string()),
            serial_number: Set(input.serial_number),
            cpu: Set(input.cpu),
            ram: Set(input.ram),
            storage: Set(input.storage),
            ownership: Set(ownership),
            status: Set(DeviceStatus::PendingInspection),
            inward_batch_id: Set(batch.id),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Barcode {} already registered", barcode)))?;

        record_history(txn, model.id, None, DeviceStatus::PendingInspection, &transition).await?;
        created.push(model);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PurchaseOrderStatus;
    use crate::services::purchase_orders::{CreatePurchaseOrderInput, PurchaseOrderService};
    use crate::test_support::{new_device, test_db, test_events};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    async fn setup() -> (Arc<DbPool>, InwardService, PurchaseOrderService) {
        let db = Arc::new(test_db().await);
        (
            db.clone(),
            InwardService::new(db.clone(), test_events()),
            PurchaseOrderService::new(db, test_events()),
        )
    }

    fn rental(devices: Vec<NewDeviceInput>) -> CreateBatchInput {
        CreateBatchInput {
            inward_type: InwardType::RentalReturn,
            purchase_order_id: None,
            supplier_name: None,
            customer_name: Some("Globex".into()),
            rental_reference: Some("RA-2231".into()),
            notes: None,
            devices,
        }
    }

    #[tokio::test]
    async fn purchase_batch_updates_po_and_registers_devices() {
        let (_db, inward, pos) = setup().await;
        let actor = Uuid::new_v4();
        let po = pos
            .create(
                CreatePurchaseOrderInput {
                    po_number: "PO-1".into(),
                    supplier_name: "Lease Returns Ltd".into(),
                    order_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                    expected_quantity: 3,
                    notes: None,
                },
                actor,
            )
            .await
            .unwrap();

        let detail = inward
            .create_batch(
                CreateBatchInput {
                    inward_type: InwardType::RefurbPurchase,
                    purchase_order_id: Some(po.id),
                    supplier_name: None,
                    customer_name: None,
                    rental_reference: None,
                    notes: None,
                    devices: vec![new_device("LT-0001"), new_device("LT-0002")],
                },
                actor,
            )
            .await
            .unwrap();

        assert!(detail.batch.batch_number.starts_with("INW-"));
        assert_eq!(detail.batch.device_count, 2);
        assert_eq!(detail.batch.supplier_name.as_deref(), Some("Lease Returns Ltd"));
        assert!(detail
            .devices
            .iter()
            .all(|d| d.status == DeviceStatus::PendingInspection && d.ownership == Ownership::RefurbStock));

        let po = pos.get(po.id).await.unwrap();
        assert_eq!(po.order.received_quantity, 2);
        assert_eq!(po.order.status, PurchaseOrderStatus::PartiallyReceived);

        let detail = inward
            .add_devices_to_batch(
                detail.batch.id,
                AddDevicesInput {
                    devices: vec![new_device("LT-0003")],
                },
                actor,
            )
            .await
            .unwrap();
        assert_eq!(detail.batch.device_count, 3);
        assert_eq!(detail.devices.len(), 3);
        assert_eq!(
            pos.get(po.order.id).await.unwrap().order.status,
            PurchaseOrderStatus::Received
        );
    }

    #[test]
    fn device_list_size_is_capped() {
        let devices: Vec<NewDeviceInput> = (0..3).map(|i| new_device(&format!("CAP-{i}"))).collect();
        assert_eq!(check_device_list(&devices).unwrap(), 3);

        let oversized: Vec<NewDeviceInput> = (0..=MAX_DEVICES_PER_BATCH)
            .map(|i| new_device(&format!("CAP-{i}")))
            .collect();
        assert_matches!(
            check_device_list(&oversized),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn purchase_batch_requires_po() {
        let (_db, inward, _) = setup().await;
        let mut input = rental(vec![new_device("X-1")]);
        input.inward_type = InwardType::RefurbPurchase;
        assert_matches!(
            inward.create_batch(input, Uuid::new_v4()).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn rental_return_requires_reference() {
        let (_db, inward, _) = setup().await;
        let mut input = rental(vec![new_device("X-1")]);
        input.rental_reference = Some("  ".into());
        assert_matches!(
            inward.create_batch(input, Uuid::new_v4()).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn duplicate_barcodes_are_rejected() {
        let (_db, inward, _) = setup().await;
        let actor = Uuid::new_v4();

        assert_matches!(
            inward
                .create_batch(rental(vec![new_device("DUP-1"), new_device("DUP-1")]), actor)
                .await,
            Err(ServiceError::ValidationError(_))
        );

        let first = inward
            .create_batch(rental(vec![new_device("DUP-1")]), actor)
            .await
            .unwrap();
        assert_eq!(first.devices[0].ownership, Ownership::RentalReturn);

        assert_matches!(
            inward.create_batch(rental(vec![new_device("DUP-1")]), actor).await,
            Err(ServiceError::Conflict(_))
        );
        let (_, total) = inward.list_batches(None, 1, 20).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (_db, inward, _) = setup().await;
        assert_matches!(
            inward.create_batch(rental(vec![]), Uuid::new_v4()).await,
            Err(ServiceError::ValidationError(_))
        );
    }
}
