use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{specialist_job, RepairJobStatus, SpecialistJobStatus, SpecialistKind},
    errors::ServiceError,
    events::{Event, EventSender},
    services::repairs::{find_job, open_specialist_jobs},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSpecialistJobInput {
    pub repair_job_id: Uuid,
    pub kind: SpecialistKind,
    #[validate(length(min = 1, max = 2000))]
    pub issue_description: String,
    /// Battery jobs only.
    #[validate(range(min = 0, max = 100))]
    pub battery_health_before: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompleteSpecialistJobInput {
    /// `false` closes the job as `CANNOT_REPAIR`.
    pub repaired: bool,
    #[validate(length(max = 4000))]
    pub resolution_notes: Option<String>,
    /// Required when a battery job is repaired.
    #[validate(range(min = 0, max = 100))]
    pub battery_health_after: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SpecialistQueueFilter {
    pub kind: Option<SpecialistKind>,
    /// Open jobs when omitted.
    pub status: Option<SpecialistJobStatus>,
}

/// L3, display and battery benches. Jobs are raised from an L2 repair job,
/// which waits in `AWAITING_SPECIALIST` until every one of them is closed.
pub struct SpecialistService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SpecialistService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(kind = ?input.kind))]
    pub async fn create(
        &self,
        input: CreateSpecialistJobInput,
    ) -> Result<specialist_job::Model, ServiceError> {
        input.validate()?;
        if input.kind != SpecialistKind::Battery && input.battery_health_before.is_some() {
            return Err(ServiceError::InvalidInput(
                "battery_health_before only applies to battery jobs".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let repair = find_job(&txn, input.repair_job_id).await?;
        if !matches!(
            repair.status,
            RepairJobStatus::InProgress | RepairJobStatus::AwaitingSpecialist
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Repair job {} must be in progress to raise a specialist job",
                repair.job_number
            )));
        }

        let job = specialist_job::ActiveModel {
            repair_job_id: Set(repair.id),
            device_id: Set(repair.device_id),
            kind: Set(input.kind),
            status: Set(SpecialistJobStatus::Pending),
            issue_description: Set(input.issue_description.trim().to_string()),
            battery_health_before: Set(input.battery_health_before),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut active = repair.into_active_model();
        active.status = Set(RepairJobStatus::AwaitingSpecialist);
        active.update(&txn).await?;

        txn.commit().await?;
        self.event_sender
            .send_or_log(Event::SpecialistJobCreated {
                job_id: job.id,
                kind: job.kind,
            })
            .await;
        Ok(job)
    }

    #[instrument(skip(self))]
    pub async fn list_queue(
        &self,
        filter: SpecialistQueueFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<specialist_job::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = specialist_job::Entity::find();
        if let Some(kind) = filter.kind {
            query = query.filter(specialist_job::Column::Kind.eq(kind));
        }
        query = match filter.status {
            Some(status) => query.filter(specialist_job::Column::Status.eq(status)),
            None => query.filter(
                specialist_job::Column::Status
                    .is_in([SpecialistJobStatus::Pending, SpecialistJobStatus::InProgress]),
            ),
        };

        let paginator = query
            .order_by_asc(specialist_job::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let jobs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((jobs, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn start(
        &self,
        id: Uuid,
        user: &AuthUser,
    ) -> Result<specialist_job::Model, ServiceError> {
        let db = &*self.db_pool;
        let job = find_specialist_job(db, id).await?;
        ensure_technician(&job, user)?;
        if job.status != SpecialistJobStatus::Pending {
            return Err(ServiceError::InvalidStatus(
                "Only pending specialist jobs can be started".to_string(),
            ));
        }

        let mut active = job.into_active_model();
        active.status = Set(SpecialistJobStatus::InProgress);
        active.assigned_to = Set(Some(user.user_id));
        active.started_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self, input, user), fields(user_id = %user.user_id))]
    pub async fn complete(
        &self,
        id: Uuid,
        input: CompleteSpecialistJobInput,
        user: &AuthUser,
    ) -> Result<specialist_job::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let job = find_specialist_job(&txn, id).await?;
        ensure_technician(&job, user)?;
        if job.status != SpecialistJobStatus::InProgress {
            return Err(ServiceError::InvalidStatus(
                "Only specialist jobs in progress can be completed".to_string(),
            ));
        }
        match job.kind {
            SpecialistKind::Battery if input.repaired && input.battery_health_after.is_none() => {
                return Err(ServiceError::ValidationError(
                    "battery_health_after is required to close a battery job".to_string(),
                ));
            }
            SpecialistKind::L3 | SpecialistKind::Display if input.battery_health_after.is_some() => {
                return Err(ServiceError::InvalidInput(
                    "battery_health_after only applies to battery jobs".to_string(),
                ));
            }
            _ => {}
        }

        let repair_job_id = job.repair_job_id;
        let mut active = job.into_active_model();
        active.status = Set(if input.repaired {
            SpecialistJobStatus::Completed
        } else {
            SpecialistJobStatus::CannotRepair
        });
        active.resolution_notes = Set(input.resolution_notes);
        active.battery_health_after = Set(input.battery_health_after);
        active.completed_at = Set(Some(Utc::now()));
        let job = active.update(&txn).await?;

        release_repair_job(&txn, repair_job_id).await?;
        txn.commit().await?;

        info!(job_id = %job.id, status = ?job.status, "specialist job closed");
        self.event_sender
            .send_or_log(Event::SpecialistJobCompleted {
                job_id: job.id,
                kind: job.kind,
                repaired: input.repaired,
            })
            .await;
        Ok(job)
    }
}

async fn find_specialist_job<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<specialist_job::Model, ServiceError> {
    specialist_job::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Specialist job {} not found", id)))
}

/// Only the bench matching the job kind (or an admin) may work it.
fn ensure_technician(job: &specialist_job::Model, user: &AuthUser) -> Result<(), ServiceError> {
    let required = job.kind.technician_role();
    if user.has_any_role(&[required]) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "{:?} jobs are worked by {}",
            job.kind, required
        )))
    }
}

/// Hands the repair job back to L2 once no specialist job is open.
async fn release_repair_job<C: ConnectionTrait>(
    conn: &C,
    repair_job_id: Uuid,
) -> Result<(), ServiceError> {
    if open_specialist_jobs(conn, repair_job_id).await? > 0 {
        return Ok(());
    }
    let repair = find_job(conn, repair_job_id).await?;
    if repair.status == RepairJobStatus::AwaitingSpecialist {
        let mut active = repair.into_active_model();
        active.status = Set(RepairJobStatus::InProgress);
        active.update(conn).await?;
    }
    Ok(())
}
