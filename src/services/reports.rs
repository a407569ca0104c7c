use crate::{
    db::DbPool,
    entities::{
        paint_panel, repair_job, spare_part, specialist_job, PaintPanelStatus, RepairJobStatus,
        SpecialistJobStatus, SpecialistKind,
    },
    errors::ServiceError,
    services::devices::{count_by_status, StatusCount},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, Iterable, PaginatorTrait, QueryFilter,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SpecialistQueueCount {
    pub kind: SpecialistKind,
    pub open: u64,
}

/// Floor overview for the warehouse manager.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_devices: u64,
    pub devices_by_status: Vec<StatusCount>,
    pub open_repair_jobs: u64,
    pub jobs_waiting_for_spares: u64,
    pub overdue_repair_jobs: u64,
    pub specialist_queues: Vec<SpecialistQueueCount>,
    pub panels_in_paint_shop: u64,
    pub low_stock_parts: u64,
    pub generated_at: DateTime<Utc>,
}

pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let devices_by_status = count_by_status(db).await?;
        let total_devices = devices_by_status.iter().map(|c| c.count).sum();

        let open_jobs = repair_job::Entity::find()
            .filter(repair_job::Column::Status.ne(RepairJobStatus::Completed));
        let open_repair_jobs = open_jobs.clone().count(db).await?;
        let jobs_waiting_for_spares = repair_job::Entity::find()
            .filter(repair_job::Column::Status.eq(RepairJobStatus::WaitingForSpares))
            .count(db)
            .await?;
        let overdue_repair_jobs = open_jobs
            .filter(repair_job::Column::TatDueDate.lt(now))
            .count(db)
            .await?;

        let mut specialist_queues = Vec::new();
        for kind in SpecialistKind::iter() {
            let open = specialist_job::Entity::find()
                .filter(specialist_job::Column::Kind.eq(kind))
                .filter(
                    specialist_job::Column::Status
                        .is_in([SpecialistJobStatus::Pending, SpecialistJobStatus::InProgress]),
                )
                .count(db)
                .await?;
            specialist_queues.push(SpecialistQueueCount { kind, open });
        }

        let panels_in_paint_shop = paint_panel::Entity::find()
            .filter(paint_panel::Column::Status.ne(PaintPanelStatus::Collected))
            .count(db)
            .await?;
        let low_stock_parts = spare_part::Entity::find()
            .filter(
                Expr::col(spare_part::Column::CurrentStock)
                    .lte(Expr::col(spare_part::Column::MinStockLevel)),
            )
            .count(db)
            .await?;

        Ok(DashboardSummary {
            total_devices,
            devices_by_status,
            open_repair_jobs,
            jobs_waiting_for_spares,
            overdue_repair_jobs,
            specialist_queues,
            panels_in_paint_shop,
            low_stock_parts,
            generated_at: now,
        })
    }
}
