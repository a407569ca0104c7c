use crate::{
    db::DbPool,
    entities::{spare_part, spare_transaction, SpareTransactionKind},
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, SpareRequirement},
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Largest quantity one spare line on an inspection may request.
pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSparePartInput {
    #[validate(length(min = 1, max = 64))]
    pub part_code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub category: Option<String>,
    pub compatible_models: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000000))]
    pub initial_stock: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000000))]
    pub min_stock_level: i32,
    pub rack_location: Option<String>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSparePartInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub compatible_models: Option<String>,
    #[validate(range(min = 0, max = 1000000))]
    pub min_stock_level: Option<i32>,
    pub rack_location: Option<String>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveStockInput {
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i32,
    pub notes: Option<String>,
}

/// Signed correction after a stock count.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockInput {
    #[validate(range(min = -1000000, max = 1000000))]
    pub delta: i32,
    #[validate(length(min = 1))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SparePartFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
}

pub struct SparesService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SparesService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(part_code = %input.part_code))]
    pub async fn create_part(
        &self,
        input: CreateSparePartInput,
        performed_by: Uuid,
    ) -> Result<spare_part::Model, ServiceError> {
        input.validate()?;
        let part_code = normalize_code(&input.part_code);
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let part = spare_part::ActiveModel {
            part_code: Set(part_code.clone()),
            name: Set(input.name.trim().to_string()),
            category: Set(input.category),
            compatible_models: Set(input.compatible_models),
            current_stock: Set(input.initial_stock),
            min_stock_level: Set(input.min_stock_level),
            rack_location: Set(input.rack_location),
            unit_cost: Set(input.unit_cost),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Spare part {} already exists", part_code)))?;

        if input.initial_stock > 0 {
            record_transaction(
                &txn,
                part.id,
                SpareTransactionKind::Received,
                input.initial_stock,
                None,
                Some(performed_by),
                Some("Opening stock".to_string()),
            )
            .await?;
        }

        txn.commit().await?;
        info!(part_id = %part.id, "spare part created");
        Ok(part)
    }

    #[instrument(skip(self, input))]
    pub async fn update_part(
        &self,
        id: Uuid,
        input: UpdateSparePartInput,
    ) -> Result<spare_part::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let part = find_part(db, id).await?;

        let mut active = part.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.category.is_some() {
            active.category = Set(input.category);
        }
        if input.compatible_models.is_some() {
            active.compatible_models = Set(input.compatible_models);
        }
        if let Some(min) = input.min_stock_level {
            active.min_stock_level = Set(min);
        }
        if input.rack_location.is_some() {
            active.rack_location = Set(input.rack_location);
        }
        if input.unit_cost.is_some() {
            active.unit_cost = Set(input.unit_cost);
        }

        Ok(active.update(db).await?)
    }

    pub async fn get_part(&self, id: Uuid) -> Result<spare_part::Model, ServiceError> {
        find_part(&*self.db_pool, id).await
    }

    #[instrument(skip(self))]
    pub async fn list_parts(
        &self,
        filter: SparePartFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<spare_part::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = filtered_parts(&filter)
            .order_by_asc(spare_part::Column::PartCode)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let parts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((parts, total))
    }

    #[instrument(skip(self, input))]
    pub async fn receive_stock(
        &self,
        id: Uuid,
        input: ReceiveStockInput,
        performed_by: Uuid,
    ) -> Result<spare_part::Model, ServiceError> {
        input.validate()?;
        self.apply_delta(
            id,
            input.quantity,
            SpareTransactionKind::Received,
            input.notes,
            performed_by,
        )
        .await
    }

    #[instrument(skip(self, input))]
    pub async fn adjust_stock(
        &self,
        id: Uuid,
        input: AdjustStockInput,
        performed_by: Uuid,
    ) -> Result<spare_part::Model, ServiceError> {
        input.validate()?;
        if input.delta == 0 {
            return Err(ServiceError::InvalidInput(
                "Adjustment quantity must not be zero".to_string(),
            ));
        }
        self.apply_delta(
            id,
            input.delta,
            SpareTransactionKind::Adjusted,
            Some(input.reason),
            performed_by,
        )
        .await
    }

    async fn apply_delta(
        &self,
        id: Uuid,
        delta: i32,
        kind: SpareTransactionKind,
        notes: Option<String>,
        performed_by: Uuid,
    ) -> Result<spare_part::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let part = find_part(&txn, id).await?;
        let old_quantity = part.current_stock;
        let new_quantity = old_quantity.checked_add(delta).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Stock for spare part {} would be out of range",
                part.part_code
            ))
        })?;
        if new_quantity < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "Spare part {} has {} in stock, cannot remove {}",
                part.part_code,
                old_quantity,
                delta.unsigned_abs()
            )));
        }

        let mut active = part.into_active_model();
        active.current_stock = Set(new_quantity);
        let part = active.update(&txn).await?;
        record_transaction(&txn, part.id, kind, delta, None, Some(performed_by), notes).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SpareStockChanged {
                part_id: part.id,
                part_code: part.part_code.clone(),
                old_quantity,
                new_quantity,
            })
            .await;
        if part.is_low_stock() {
            self.event_sender.send_or_log(low_stock_event(&part)).await;
        }

        Ok(part)
    }

    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<spare_part::Model>, ServiceError> {
        let filter = SparePartFilter {
            low_stock_only: true,
            ..Default::default()
        };
        Ok(filtered_parts(&filter)
            .order_by_asc(spare_part::Column::PartCode)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn transactions(
        &self,
        part_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<spare_transaction::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        find_part(db, part_id).await?;

        let paginator = spare_transaction::Entity::find()
            .filter(spare_transaction::Column::SparePartId.eq(part_id))
            .order_by_desc(spare_transaction::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}

fn filtered_parts(filter: &SparePartFilter) -> Select<spare_part::Entity> {
    let mut query = spare_part::Entity::find();

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(spare_part::Column::PartCode.contains(search))
                .add(spare_part::Column::Name.contains(search))
                .add(spare_part::Column::CompatibleModels.contains(search)),
        );
    }
    if let Some(category) = &filter.category {
        query = query.filter(spare_part::Column::Category.eq(category.as_str()));
    }
    if filter.low_stock_only {
        query = query.filter(
            Expr::col(spare_part::Column::CurrentStock)
                .lte(Expr::col(spare_part::Column::MinStockLevel)),
        );
    }
    query
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn low_stock_event(part: &spare_part::Model) -> Event {
    Event::LowStock {
        part_id: part.id,
        part_code: part.part_code.clone(),
        current_stock: part.current_stock,
        min_stock_level: part.min_stock_level,
    }
}

pub(crate) async fn find_part<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<spare_part::Model, ServiceError> {
    spare_part::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Spare part {} not found", id)))
}

async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    spare_part_id: Uuid,
    kind: SpareTransactionKind,
    quantity: i32,
    repair_job_id: Option<Uuid>,
    performed_by: Option<Uuid>,
    notes: Option<String>,
) -> Result<spare_transaction::Model, ServiceError> {
    Ok(spare_transaction::ActiveModel {
        spare_part_id: Set(spare_part_id),
        kind: Set(kind),
        quantity: Set(quantity),
        repair_job_id: Set(repair_job_id),
        performed_by: Set(performed_by),
        notes: Set(notes),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}

/// Cleans up requested spare lines: codes are upper-cased, quantities
/// must be positive, and every code must name a known part.
pub(crate) async fn normalize_requirements<C: ConnectionTrait>(
    conn: &C,
    lines: &[SpareRequirement],
) -> Result<Vec<SpareRequirement>, ServiceError> {
    let mut normalized = Vec::with_capacity(lines.len());
    for line in lines {
        let part_code = normalize_code(&line.part_code);
        if part_code.is_empty() {
            return Err(ServiceError::InvalidInput("Spare part code is required".into()));
        }
        if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
            return Err(ServiceError::InvalidInput(format!(
                "Quantity for spare part {} must be between 1 and {}",
                part_code, MAX_LINE_QUANTITY
            )));
        }
        normalized.push(SpareRequirement {
            part_code,
            quantity: line.quantity,
        });
    }

    let parts = parts_by_code(conn, &normalized).await?;
    if let Some(unknown) = normalized.iter().find(|l| !parts.contains_key(&l.part_code)) {
        return Err(ServiceError::InvalidInput(format!(
            "Unknown spare part {}",
            unknown.part_code
        )));
    }
    Ok(normalized)
}

async fn parts_by_code<C: ConnectionTrait>(
    conn: &C,
    lines: &[SpareRequirement],
) -> Result<HashMap<String, spare_part::Model>, ServiceError> {
    if lines.is_empty() {
        return Ok(HashMap::new());
    }
    let codes: Vec<&str> = lines.iter().map(|l| l.part_code.as_str()).collect();
    let parts = spare_part::Entity::find()
        .filter(spare_part::Column::PartCode.is_in(codes))
        .all(conn)
        .await?;
    Ok(parts.into_iter().map(|p| (p.part_code.clone(), p)).collect())
}

/// Current stock for each part code in `lines`.
pub(crate) async fn stock_levels<C: ConnectionTrait>(
    conn: &C,
    lines: &[SpareRequirement],
) -> Result<HashMap<String, i32>, ServiceError> {
    Ok(parts_by_code(conn, lines)
        .await?
        .into_iter()
        .map(|(code, part)| (code, part.current_stock))
        .collect())
}

/// Deducts every line from stock against a repair job. Fails without
/// touching stock when any part is short.
pub(crate) async fn issue_to_job<C: ConnectionTrait>(
    conn: &C,
    lines: &[SpareRequirement],
    repair_job_id: Uuid,
    performed_by: Uuid,
) -> Result<Vec<Event>, ServiceError> {
    let totals = workflow::total_by_part(lines).ok_or_else(|| {
        ServiceError::InvalidInput("Requested spare quantities are out of range".to_string())
    })?;

    let parts = parts_by_code(conn, lines).await?;
    let mut shortages = Vec::new();
    for (code, qty) in &totals {
        let available = parts.get(*code).map(|p| p.current_stock).unwrap_or(0);
        if available < *qty {
            shortages.push(format!("{} (need {}, have {})", code, qty, available));
        }
    }
    if !shortages.is_empty() {
        warn!(%repair_job_id, shortages = ?shortages, "spares short for repair job");
        return Err(ServiceError::InsufficientStock(format!(
            "Insufficient stock: {}",
            shortages.join(", ")
        )));
    }

    let mut events = Vec::new();
    for (code, qty) in totals {
        let Some(part) = parts.get(code).cloned() else {
            continue;
        };
        let old_quantity = part.current_stock;
        let mut active = part.into_active_model();
        active.current_stock = Set(old_quantity - qty);
        let part = active.update(conn).await?;
        record_transaction(
            conn,
            part.id,
            SpareTransactionKind::Issued,
            -qty,
            Some(repair_job_id),
            Some(performed_by),
            None,
        )
        .await?;

        events.push(Event::SpareStockChanged {
            part_id: part.id,
            part_code: part.part_code.clone(),
            old_quantity,
            new_quantity: part.current_stock,
        });
        if part.is_low_stock() {
            events.push(low_stock_event(&part));
        }
    }
    events.push(Event::SparesIssued {
        repair_job_id,
        lines: lines.len(),
    });
    Ok(events)
}
