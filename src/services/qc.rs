use crate::{
    db::DbPool,
    entities::{qc_record, repair_job, Grade, QcResult, RepairJobStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{find_device, next_document_number, save_transition, Transition},
    workflow::{self, DeviceWorkState},
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitQcInput {
    #[serde(default)]
    pub checklist: BTreeMap<String, bool>,
    pub result: QcResult,
    /// Required when `result` is `PASSED`.
    pub final_grade: Option<Grade>,
    #[validate(length(max = 4000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QcOutcome {
    #[schema(value_type = Object)]
    pub record: qc_record::Model,
    #[schema(value_type = Object)]
    pub device: crate::entities::device::Model,
    /// Rework job opened by a `FAILED_REWORK` result.
    #[schema(value_type = Option<Object>)]
    pub rework_job: Option<repair_job::Model>,
}

/// Final quality gate before a device is released to stock.
pub struct QcService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_tat_hours: i64,
}

impl QcService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, default_tat_hours: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            default_tat_hours,
        }
    }

    #[instrument(skip(self, input), fields(result = ?input.result))]
    pub async fn submit_qc(
        &self,
        device_id: Uuid,
        input: SubmitQcInput,
        qc_engineer_id: Uuid,
    ) -> Result<QcOutcome, ServiceError> {
        input.validate()?;
        if input.result == QcResult::Passed && input.final_grade.is_none() {
            return Err(ServiceError::ValidationError(
                "final_grade is required when QC passes".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let device = find_device(&txn, device_id).await?;
        workflow::ensure_qc_allowed(&DeviceWorkState {
            status: device.status,
            repair_required: device.repair_required,
            repair_completed: device.repair_completed,
            paint_required: device.paint_required,
            paint_completed: device.paint_completed,
        })?;

        let record = qc_record::ActiveModel {
            device_id: Set(device.id),
            qc_engineer_id: Set(qc_engineer_id),
            checklist: Set(serde_json::to_value(&input.checklist).unwrap_or_default()),
            result: Set(input.result),
            final_grade: Set(input.final_grade),
            remarks: Set(input.remarks.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut events = Vec::new();
        let mut update = device.clone().into_active_model();
        let mut rework_job = None;
        match input.result {
            QcResult::Passed => {
                update.grade = Set(input.final_grade);
            }
            QcResult::FailedRework => {
                let failed: Vec<String> = input
                    .checklist
                    .iter()
                    .filter(|(_, passed)| !**passed)
                    .map(|(item, _)| format!("QC failed: {}", item))
                    .chain(input.remarks.iter().cloned())
                    .collect();
                let job = repair_job::ActiveModel {
                    job_number: Set(next_document_number::<repair_job::Entity, _>(
                        &txn,
                        repair_job::Column::JobNumber,
                        "RJ",
                    )
                    .await?),
                    device_id: Set(device.id),
                    status: Set(RepairJobStatus::ReadyForRepair),
                    reported_issues: Set(serde_json::to_value(&failed).unwrap_or_default()),
                    spares_required: Set(serde_json::json!([])),
                    tat_due_date: Set(Some(Utc::now() + Duration::hours(self.default_tat_hours))),
                    is_rework: Set(true),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                events.push(Event::RepairJobCreated {
                    job_id: job.id,
                    device_id: device.id,
                    is_rework: true,
                });
                update.repair_required = Set(true);
                update.repair_completed = Set(false);
                rework_job = Some(job);
            }
            QcResult::FailedScrap => {
                warn!(device_id = %device.id, barcode = %device.barcode, "device scrapped at QC");
            }
        }

        let next = workflow::next_status_after_qc(input.result);
        let (device, status_event) = save_transition(
            &txn,
            &device,
            update,
            next,
            Transition::new("qc", qc_engineer_id).with_notes(input.remarks),
        )
        .await?;
        events.push(status_event);
        events.push(Event::QcSubmitted {
            device_id: device.id,
            result: input.result,
        });

        txn.commit().await?;
        info!(device_id = %device.id, next = %next, "qc recorded");
        for event in events {
            self.event_sender.send_or_log(event).await;
        }

        Ok(QcOutcome {
            record,
            device,
            rework_job,
        })
    }

    /// QC attempts for a device, newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, device_id: Uuid) -> Result<Vec<qc_record::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_device(db, device_id).await?;
        Ok(qc_record::Entity::find()
            .filter(qc_record::Column::DeviceId.eq(device_id))
            .order_by_desc(qc_record::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DeviceStatus;
    use crate::services::inspection::{InspectionService, SubmitInspectionInput};
    use crate::services::repairs::{CompleteRepairInput, RepairService};
    use crate::test_support::{receive_device, test_db, test_events};
    use assert_matches::assert_matches;

    async fn awaiting_qc(db: &Arc<DbPool>, barcode: &str) -> Uuid {
        let device = receive_device(db, barcode).await;
        InspectionService::new(db.clone(), test_events(), 24)
            .submit_inspection(device.id, SubmitInspectionInput::default(), Uuid::new_v4())
            .await
            .unwrap();
        device.id
    }

    fn qc(result: QcResult, grade: Option<Grade>) -> SubmitQcInput {
        SubmitQcInput {
            checklist: BTreeMap::from([("boots".to_string(), true), ("hinge".to_string(), false)]),
            result,
            final_grade: grade,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn pass_requires_grade_and_releases_to_stock() {
        let db = Arc::new(test_db().await);
        let svc = QcService::new(db.clone(), test_events(), 24);
        let device_id = awaiting_qc(&db, "QC-1").await;

        assert_matches!(
            svc.submit_qc(device_id, qc(QcResult::Passed, None), Uuid::new_v4())
                .await,
            Err(ServiceError::ValidationError(_))
        );

        let outcome = svc
            .submit_qc(device_id, qc(QcResult::Passed, Some(Grade::A)), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome.device.status, DeviceStatus::ReadyForStock);
        assert_eq!(outcome.device.grade, Some(Grade::A));
        assert!(outcome.rework_job.is_none());
        assert_eq!(svc.history(device_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn qc_refused_outside_awaiting_qc() {
        let db = Arc::new(test_db().await);
        let svc = QcService::new(db.clone(), test_events(), 24);
        let device = receive_device(&db, "QC-2").await;

        assert_matches!(
            svc.submit_qc(device.id, qc(QcResult::Passed, Some(Grade::B)), Uuid::new_v4())
                .await,
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[tokio::test]
    async fn rework_opens_a_new_repair_job() {
        let db = Arc::new(test_db().await);
        let svc = QcService::new(db.clone(), test_events(), 24);
        let device_id = awaiting_qc(&db, "QC-3").await;

        let outcome = svc
            .submit_qc(device_id, qc(QcResult::FailedRework, None), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome.device.status, DeviceStatus::ReadyForRepair);
        assert!(outcome.device.repair_required);
        assert!(!outcome.device.repair_completed);
        let job = outcome.rework_job.unwrap();
        assert!(job.is_rework);
        assert_eq!(job.status, RepairJobStatus::ReadyForRepair);
        assert_eq!(job.reported_issues, serde_json::json!(["QC failed: hinge"]));

        let repairs = RepairService::new(db.clone(), test_events(), 24);
        let engineer = Uuid::new_v4();
        repairs.start(job.id, engineer).await.unwrap();
        repairs
            .complete(job.id, CompleteRepairInput::default(), engineer)
            .await
            .unwrap();

        let second = svc
            .submit_qc(device_id, qc(QcResult::Passed, Some(Grade::B)), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(second.device.status, DeviceStatus::ReadyForStock);
        assert_eq!(svc.history(device_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn scrap_is_terminal() {
        let db = Arc::new(test_db().await);
        let svc = QcService::new(db.clone(), test_events(), 24);
        let device_id = awaiting_qc(&db, "QC-4").await;

        let outcome = svc
            .submit_qc(device_id, qc(QcResult::FailedScrap, None), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome.device.status, DeviceStatus::Scrapped);
        assert!(outcome.device.status.is_terminal());
    }
}
