use crate::{
    db::DbPool,
    entities::{device, outward_item, outward_record, DeviceStatus, OutwardType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{find_device, next_document_number, save_transition, Transition},
    workflow,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DispatchInput {
    pub outward_type: OutwardType,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    /// Invoice number for sales, agreement number for rentals.
    #[validate(length(min = 1, max = 100))]
    pub reference_number: String,
    #[validate(length(max = 2000))]
    pub shipping_details: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub device_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OutwardDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub record: outward_record::Model,
    #[schema(value_type = Vec<Object>)]
    pub devices: Vec<device::Model>,
}

/// Dispatch desk: ships graded stock to customers.
pub struct OutwardService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OutwardService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Dispatches every listed device or none of them.
    #[instrument(skip(self, input), fields(outward_type = %input.outward_type, devices = input.device_ids.len()))]
    pub async fn dispatch(
        &self,
        input: DispatchInput,
        dispatched_by: Uuid,
    ) -> Result<OutwardDetail, ServiceError> {
        input.validate()?;
        if input.device_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one device is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = input.device_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::ValidationError(format!(
                "Device {} is listed twice",
                dup
            )));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let mut devices = Vec::with_capacity(input.device_ids.len());
        for id in &input.device_ids {
            let device = find_device(&txn, *id).await?;
            workflow::ensure_status(device.status, &[DeviceStatus::ReadyForStock], "dispatch")
                .map_err(|e| {
                    ServiceError::InvalidStatus(format!("Device {}: {}", device.barcode, e))
                })?;
            devices.push(device);
        }

        let outward_number = next_document_number::<outward_record::Entity, _>(
            &txn,
            outward_record::Column::OutwardNumber,
            "OUT",
        )
        .await?;
        let record = outward_record::ActiveModel {
            outward_number: Set(outward_number),
            outward_type: Set(input.outward_type),
            customer_name: Set(input.customer_name.trim().to_string()),
            reference_number: Set(input.reference_number.trim().to_string()),
            shipping_details: Set(input.shipping_details),
            dispatched_by: Set(dispatched_by),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, "Outward number already issued, retry"))?;

        let next = workflow::status_after_outward(input.outward_type);
        let mut events = Vec::with_capacity(devices.len() + 1);
        let mut shipped = Vec::with_capacity(devices.len());
        for device in devices {
            outward_item::ActiveModel {
                outward_record_id: Set(record.id),
                device_id: Set(device.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            let mut update = device.clone().into_active_model();
            update.rack_location = Set(None);
            let (saved, event) = save_transition(
                &txn,
                &device,
                update,
                next,
                Transition::new("outward", dispatched_by)
                    .with_notes(Some(record.outward_number.clone())),
            )
            .await?;
            events.push(event);
            shipped.push(saved);
        }
        events.push(Event::OutwardDispatched {
            outward_id: record.id,
            outward_type: record.outward_type,
            device_count: shipped.len(),
        });

        txn.commit().await?;
        info!(outward_number = %record.outward_number, devices = shipped.len(), "outward dispatched");
        for event in events {
            self.event_sender.send_or_log(event).await;
        }
        Ok(OutwardDetail {
            record,
            devices: shipped,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<OutwardDetail, ServiceError> {
        let db = &*self.db_pool;
        let record = outward_record::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Outward record {} not found", id)))?;
        let devices = devices_for(db, record.id).await?;
        Ok(OutwardDetail { record, devices })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        outward_type: Option<OutwardType>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<outward_record::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = outward_record::Entity::find();
        if let Some(outward_type) = outward_type {
            query = query.filter(outward_record::Column::OutwardType.eq(outward_type));
        }
        let paginator = query
            .order_by_desc(outward_record::Column::DispatchedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((records, total))
    }
}

pub(crate) async fn devices_for<C: ConnectionTrait>(
    conn: &C,
    outward_record_id: Uuid,
) -> Result<Vec<device::Model>, ServiceError> {
    Ok(device::Entity::find()
        .inner_join(outward_item::Entity)
        .filter(outward_item::Column::OutwardRecordId.eq(outward_record_id))
        .order_by_asc(device::Column::Barcode)
        .all(conn)
        .await?)
}
