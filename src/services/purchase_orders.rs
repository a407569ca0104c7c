use crate::{
    db::DbPool,
    entities::{inward_batch, purchase_order, PurchaseOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    #[validate(length(min = 1, max = 64))]
    pub po_number: String,
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: String,
    pub order_date: NaiveDate,
    #[validate(range(min = 1, max = 100000))]
    pub expected_quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub order: purchase_order::Model,
    #[schema(value_type = Vec<Object>)]
    pub batches: Vec<inward_batch::Model>,
}

/// Purchase orders that inward purchase batches are received against.
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(po_number = %input.po_number))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
        created_by: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        let order = purchase_order::ActiveModel {
            po_number: Set(input.po_number.trim().to_string()),
            supplier_name: Set(input.supplier_name.trim().to_string()),
            order_date: Set(input.order_date),
            expected_quantity: Set(input.expected_quantity),
            received_quantity: Set(0),
            status: Set(PurchaseOrderStatus::Open),
            notes: Set(input.notes),
            created_by: Set(Some(created_by)),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Purchase order {} already exists", input.po_number))
        })?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated(order.id))
            .await;
        info!(po_id = %order.id, "purchase order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<PurchaseOrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let order = find_order(db, id).await?;
        let batches = inward_batch::Entity::find()
            .filter(inward_batch::Column::PurchaseOrderId.eq(id))
            .order_by_asc(inward_batch::Column::ReceivedAt)
            .all(db)
            .await?;
        Ok(PurchaseOrderDetail { order, batches })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<PurchaseOrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = purchase_order::Entity::find();
        if let Some(status) = status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(purchase_order::Column::OrderDate)
            .order_by_desc(purchase_order::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Closes an order so no further batches can be received against it.
    #[instrument(skip(self))]
    pub async fn close(&self, id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        let db = &*self.db_pool;
        let order = find_order(db, id).await?;
        if order.status == PurchaseOrderStatus::Closed {
            return Err(ServiceError::InvalidStatus(format!(
                "Purchase order {} is already closed",
                order.po_number
            )));
        }

        let mut active = order.into_active_model();
        active.status = Set(PurchaseOrderStatus::Closed);
        let closed = active.update(db).await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderClosed(closed.id))
            .await;
        Ok(closed)
    }
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))
}

/// Adds `count` received devices to the order and recomputes its status.
pub(crate) async fn record_receipt<C: ConnectionTrait>(
    conn: &C,
    order: purchase_order::Model,
    count: i32,
) -> Result<purchase_order::Model, ServiceError> {
    if order.status == PurchaseOrderStatus::Closed {
        return Err(ServiceError::InvalidStatus(format!(
            "Purchase order {} is closed",
            order.po_number
        )));
    }

    let received = order.received_quantity.checked_add(count).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "Received quantity on {} is out of range",
            order.po_number
        ))
    })?;
    let status = PurchaseOrderStatus::for_received(received, order.expected_quantity);
    let mut active = order.into_active_model();
    active.received_quantity = Set(received);
    active.status = Set(status);
    Ok(active.update(conn).await?)
}
