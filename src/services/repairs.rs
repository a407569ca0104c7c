use crate::{
    db::DbPool,
    entities::{repair_job, specialist_job, user, DeviceStatus, RepairJobStatus, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        lifecycle::{find_device, save_transition, Transition},
        spares::issue_to_job,
    },
    workflow::{self, SpareRequirement},
};
use chrono::{DateTime, Duration, Utc};
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

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RepairQueueFilter {
    /// Open jobs of every status when omitted.
    pub status: Option<RepairJobStatus>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub rework_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignRepairInput {
    pub engineer_id: Uuid,
    /// Resets the TAT due date to now + `tat_hours` when given.
    #[validate(range(min = 1, max = 720))]
    pub tat_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompleteRepairInput {
    #[validate(length(max = 4000))]
    pub repair_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RepairJobDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub job: repair_job::Model,
    #[schema(value_type = Vec<Object>)]
    pub specialist_jobs: Vec<specialist_job::Model>,
}

/// L2 repair desk.
pub struct RepairService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_tat_hours: i64,
}

impl RepairService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, default_tat_hours: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            default_tat_hours,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_queue(
        &self,
        filter: RepairQueueFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<repair_job::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = repair_job::Entity::find();
        query = match filter.status {
            Some(status) => query.filter(repair_job::Column::Status.eq(status)),
            None => query.filter(repair_job::Column::Status.ne(RepairJobStatus::Completed)),
        };
        if let Some(engineer) = filter.assigned_to {
            query = query.filter(repair_job::Column::AssignedTo.eq(engineer));
        }
        if filter.rework_only {
            query = query.filter(repair_job::Column::IsRework.eq(true));
        }

        let paginator = query
            .order_by_asc(repair_job::Column::TatDueDate)
            .order_by_asc(repair_job::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let jobs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((jobs, total))
    }

    #[instrument(skip(self))]
    pub async fn get_job(&self, id: Uuid) -> Result<RepairJobDetail, ServiceError> {
        let db = &*self.db_pool;
        let job = find_job(db, id).await?;
        let specialist_jobs = specialist_job::Entity::find()
            .filter(specialist_job::Column::RepairJobId.eq(id))
            .order_by_asc(specialist_job::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(RepairJobDetail {
            job,
            specialist_jobs,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn assign(
        &self,
        job_id: Uuid,
        input: AssignRepairInput,
    ) -> Result<repair_job::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let job = find_job(db, job_id).await?;
        ensure_open(&job)?;

        let engineer = user::Entity::find_by_id(input.engineer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", input.engineer_id)))?;
        if !engineer.active || engineer.role != UserRole::L2Engineer {
            return Err(ServiceError::InvalidInput(format!(
                "{} is not an active L2 engineer",
                engineer.email
            )));
        }

        let job_tat_missing = job.tat_due_date.is_none();
        let mut active = job.into_active_model();
        active.assigned_to = Set(Some(engineer.id));
        if input.tat_hours.is_some() || job_tat_missing {
            let hours = input.tat_hours.unwrap_or(self.default_tat_hours);
            active.tat_due_date = Set(Some(Utc::now() + Duration::hours(hours)));
        }
        let job = active.update(db).await?;
        info!(job_id = %job.id, engineer = %engineer.id, "repair job assigned");
        Ok(job)
    }

    /// Bench picks up the device; it moves to `UNDER_REPAIR`.
    #[instrument(skip(self))]
    pub async fn start(&self, job_id: Uuid, engineer_id: Uuid) -> Result<repair_job::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let job = find_job(&txn, job_id).await?;
        if job.status != RepairJobStatus::ReadyForRepair {
            return Err(ServiceError::InvalidStatus(format!(
                "Repair job {} is not ready for repair",
                job.job_number
            )));
        }
        let device = find_device(&txn, job.device_id).await?;
        workflow::ensure_status(device.status, &[DeviceStatus::ReadyForRepair], "start repair")?;

        let mut active = job.clone().into_active_model();
        active.status = Set(RepairJobStatus::InProgress);
        active.started_at = Set(Some(Utc::now()));
        if job.assigned_to.is_none() {
            active.assigned_to = Set(Some(engineer_id));
        }
        let job = active.update(&txn).await?;

        let update = device.clone().into_active_model();
        let (_, event) = save_transition(
            &txn,
            &device,
            update,
            DeviceStatus::UnderRepair,
            Transition::new("repair_started", engineer_id).with_notes(Some(job.job_number.clone())),
        )
        .await?;

        txn.commit().await?;
        self.event_sender.send_or_log(event).await;
        Ok(job)
    }

    /// Closes the job. Refused while any specialist job is open.
    #[instrument(skip(self, input))]
    pub async fn complete(
        &self,
        job_id: Uuid,
        input: CompleteRepairInput,
        engineer_id: Uuid,
    ) -> Result<repair_job::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let job = find_job(&txn, job_id).await?;
        let open_specialist = open_specialist_jobs(&txn, job.id).await?;
        if open_specialist > 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "Repair job {} has {} open specialist job(s)",
                job.job_number, open_specialist
            )));
        }
        if job.status != RepairJobStatus::InProgress {
            return Err(ServiceError::InvalidStatus(format!(
                "Repair job {} is not in progress",
                job.job_number
            )));
        }

        let device = find_device(&txn, job.device_id).await?;
        workflow::ensure_status(device.status, &[DeviceStatus::UnderRepair], "complete repair")?;

        let mut active = job.into_active_model();
        active.status = Set(RepairJobStatus::Completed);
        active.completed_at = Set(Some(Utc::now()));
        active.repair_notes = Set(input.repair_notes.clone());
        let job = active.update(&txn).await?;

        let next = workflow::next_status_after_repair(device.paint_required, device.paint_completed);
        let mut update = device.clone().into_active_model();
        update.repair_completed = Set(true);
        let (device, event) = save_transition(
            &txn,
            &device,
            update,
            next,
            Transition::new("repair_completed", engineer_id).with_notes(input.repair_notes),
        )
        .await?;

        txn.commit().await?;
        info!(job_id = %job.id, device_id = %device.id, next = %next, "repair completed");
        self.event_sender.send_or_log(event).await;
        self.event_sender
            .send_or_log(Event::RepairJobCompleted {
                job_id: job.id,
                device_id: device.id,
            })
            .await;
        Ok(job)
    }

    /// Open jobs whose TAT due date has passed.
    #[instrument(skip(self))]
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<repair_job::Model>, ServiceError> {
        Ok(repair_job::Entity::find()
            .filter(repair_job::Column::Status.ne(RepairJobStatus::Completed))
            .filter(repair_job::Column::TatDueDate.lt(now))
            .order_by_asc(repair_job::Column::TatDueDate)
            .all(&*self.db_pool)
            .await?)
    }

    /// Retries a job parked for spares. Succeeds only when every line is in stock.
    #[instrument(skip(self))]
    pub async fn issue_spares(&self, job_id: Uuid, issued_by: Uuid) -> Result<repair_job::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let job = find_job(&txn, job_id).await?;
        if job.status != RepairJobStatus::WaitingForSpares {
            return Err(ServiceError::InvalidStatus(format!(
                "Repair job {} is not waiting for spares",
                job.job_number
            )));
        }
        let lines: Vec<SpareRequirement> =
            serde_json::from_value(job.spares_required.clone()).map_err(|e| {
                ServiceError::InternalError(format!("Corrupt spares list on {}: {}", job.job_number, e))
            })?;

        let mut events = issue_to_job(&txn, &lines, job.id, issued_by).await?;

        let mut active = job.into_active_model();
        active.status = Set(RepairJobStatus::ReadyForRepair);
        active.spares_issued = Set(true);
        let job = active.update(&txn).await?;

        let device = find_device(&txn, job.device_id).await?;
        if device.status == DeviceStatus::WaitingForSpares {
            let update = device.clone().into_active_model();
            let (_, event) = save_transition(
                &txn,
                &device,
                update,
                DeviceStatus::ReadyForRepair,
                Transition::new("spares_issued", issued_by).with_notes(Some(job.job_number.clone())),
            )
            .await?;
            events.push(event);
        }

        txn.commit().await?;
        for event in events {
            self.event_sender.send_or_log(event).await;
        }
        Ok(job)
    }
}

pub(crate) async fn find_job<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<repair_job::Model, ServiceError> {
    repair_job::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Repair job {} not found", id)))
}

fn ensure_open(job: &repair_job::Model) -> Result<(), ServiceError> {
    if job.status.is_open() {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Repair job {} is already completed",
            job.job_number
        )))
    }
}

pub(crate) async fn open_specialist_jobs<C: ConnectionTrait>(
    conn: &C,
    repair_job_id: Uuid,
) -> Result<u64, ServiceError> {
    Ok(specialist_job::Entity::find()
        .filter(specialist_job::Column::RepairJobId.eq(repair_job_id))
        .filter(
            specialist_job::Column::Status.is_in([
                crate::entities::SpecialistJobStatus::Pending,
                crate::entities::SpecialistJobStatus::InProgress,
            ]),
        )
        .count(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inspection::{InspectionService, SubmitInspectionInput};
    use crate::services::spares::{ReceiveStockInput, SparesService};
    use crate::entities::{spare_part, PanelType};
    use crate::test_support::{receive_device, stock_part, test_db, test_events};
    use assert_matches::assert_matches;

    struct Fixture {
        db: Arc<DbPool>,
        inspection: InspectionService,
        repairs: RepairService,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(test_db().await);
        Fixture {
            inspection: InspectionService::new(db.clone(), test_events(), 48),
            repairs: RepairService::new(db.clone(), test_events(), 48),
            db,
        }
    }

    async fn inspected(fx: &Fixture, barcode: &str, input: SubmitInspectionInput) -> repair_job::Model {
        let device = receive_device(&fx.db, barcode).await;
        fx.inspection
            .submit_inspection(device.id, input, Uuid::new_v4())
            .await
            .unwrap()
            .repair_job
            .unwrap()
    }

    fn issue(text: &str) -> SubmitInspectionInput {
        SubmitInspectionInput {
            reported_issues: vec![text.into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_then_complete_routes_to_qc() {
        let fx = fixture().await;
        let job = inspected(&fx, "REP-1", issue("No POST")).await;
        let engineer = Uuid::new_v4();

        let started = fx.repairs.start(job.id, engineer).await.unwrap();
        assert_eq!(started.status, RepairJobStatus::InProgress);
        assert_eq!(started.assigned_to, Some(engineer));
        assert_eq!(
            find_device(&*fx.db, job.device_id).await.unwrap().status,
            DeviceStatus::UnderRepair
        );

        let done = fx
            .repairs
            .complete(
                job.id,
                CompleteRepairInput {
                    repair_notes: Some("Reseated RAM".into()),
                },
                engineer,
            )
            .await
            .unwrap();
        assert_eq!(done.status, RepairJobStatus::Completed);

        let device = find_device(&*fx.db, job.device_id).await.unwrap();
        assert_eq!(device.status, DeviceStatus::AwaitingQc);
        assert!(device.repair_completed);
    }

    #[tokio::test]
    async fn completing_with_paint_pending_goes_to_paint_shop() {
        let fx = fixture().await;
        let mut input = issue("Cracked hinge");
        input.paint_panels = vec![PanelType::Bezel];
        let job = inspected(&fx, "REP-2", input).await;

        fx.repairs.start(job.id, Uuid::new_v4()).await.unwrap();
        fx.repairs
            .complete(job.id, CompleteRepairInput::default(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(
            find_device(&*fx.db, job.device_id).await.unwrap().status,
            DeviceStatus::InPaintShop
        );
    }

    #[tokio::test]
    async fn complete_requires_started_job() {
        let fx = fixture().await;
        let job = inspected(&fx, "REP-3", issue("Fan noise")).await;
        assert_matches!(
            fx.repairs
                .complete(job.id, CompleteRepairInput::default(), Uuid::new_v4())
                .await,
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[tokio::test]
    async fn waiting_job_is_released_once_stock_arrives() {
        let fx = fixture().await;
        stock_part(&fx.db, "KB-UK", 0).await;
        let job = inspected(
            &fx,
            "REP-4",
            SubmitInspectionInput {
                spares_required: vec![SpareRequirement {
                    part_code: "KB-UK".into(),
                    quantity: 1,
                }],
                ..Default::default()
            },
        )
        .await;
        assert_eq!(job.status, RepairJobStatus::WaitingForSpares);

        assert_matches!(
            fx.repairs.issue_spares(job.id, Uuid::new_v4()).await,
            Err(ServiceError::InsufficientStock(_))
        );
        assert_matches!(
            fx.repairs.start(job.id, Uuid::new_v4()).await,
            Err(ServiceError::InvalidStatus(_))
        );

        let spares = SparesService::new(fx.db.clone(), test_events());
        let part = spare_part::Entity::find()
            .filter(spare_part::Column::PartCode.eq("KB-UK"))
            .one(&*fx.db)
            .await
            .unwrap()
            .unwrap();
        spares
            .receive_stock(
                part.id,
                ReceiveStockInput {
                    quantity: 3,
                    notes: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        let released = fx.repairs.issue_spares(job.id, Uuid::new_v4()).await.unwrap();
        assert_eq!(released.status, RepairJobStatus::ReadyForRepair);
        assert!(released.spares_issued);
        assert_eq!(spares.get_part(part.id).await.unwrap().current_stock, 2);
        assert_eq!(
            find_device(&*fx.db, job.device_id).await.unwrap().status,
            DeviceStatus::ReadyForRepair
        );
    }

    #[tokio::test]
    async fn overdue_jobs_are_listed() {
        let fx = fixture().await;
        let job = inspected(&fx, "REP-5", issue("Dead pixel")).await;

        assert!(fx.repairs.list_overdue(Utc::now()).await.unwrap().is_empty());
        let later = Utc::now() + Duration::hours(49);
        let overdue = fx.repairs.list_overdue(later).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, job.id);
        assert!(overdue[0].is_overdue(later));
    }

    #[tokio::test]
    async fn queue_defaults_to_open_jobs() {
        let fx = fixture().await;
        let a = inspected(&fx, "REP-6", issue("Trackpad")).await;
        inspected(&fx, "REP-7", issue("Speaker")).await;
        fx.repairs.start(a.id, Uuid::new_v4()).await.unwrap();
        fx.repairs
            .complete(a.id, CompleteRepairInput::default(), Uuid::new_v4())
            .await
            .unwrap();

        let (open, total) = fx
            .repairs
            .list_queue(RepairQueueFilter::default(), 1, 20)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_ne!(open[0].id, a.id);
    }
}
