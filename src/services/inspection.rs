use crate::{
    db::DbPool,
    entities::{inspection, paint_panel, repair_job, PaintPanelStatus, PanelType, RepairJobStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        lifecycle::{find_device, next_document_number, save_transition, Transition},
        spares::{issue_to_job, normalize_requirements, stock_levels},
    },
    workflow::{self, InspectionOutcome, SpareRequirement},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitInspectionInput {
    /// Check name to pass (`true`) / fail (`false`).
    #[serde(default)]
    pub checklist: BTreeMap<String, bool>,
    #[serde(default)]
    pub reported_issues: Vec<String>,
    #[serde(default)]
    pub spares_required: Vec<SpareRequirement>,
    #[serde(default)]
    pub paint_panels: Vec<PanelType>,
    pub notes: Option<String>,
}

impl SubmitInspectionInput {
    /// Reported issues plus the names of failed checks.
    fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .reported_issues
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        for (check, passed) in &self.checklist {
            if !passed && !issues.iter().any(|i| i == check) {
                issues.push(check.clone());
            }
        }
        issues
    }

    fn panels(&self) -> Vec<PanelType> {
        let mut panels = Vec::new();
        for panel in &self.paint_panels {
            if !panels.contains(panel) {
                panels.push(*panel);
            }
        }
        panels
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InspectionResult {
    #[schema(value_type = Object)]
    pub inspection: inspection::Model,
    #[schema(value_type = Object)]
    pub device: crate::entities::device::Model,
    #[schema(value_type = Option<Object>)]
    pub repair_job: Option<repair_job::Model>,
    #[schema(value_type = Vec<Object>)]
    pub paint_panels: Vec<paint_panel::Model>,
}

/// Inspection bench: records the report and routes the device.
pub struct InspectionService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_tat_hours: i64,
}

impl InspectionService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, default_tat_hours: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            default_tat_hours,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn submit_inspection(
        &self,
        device_id: Uuid,
        input: SubmitInspectionInput,
        inspector_id: Uuid,
    ) -> Result<InspectionResult, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let device = find_device(&txn, device_id).await?;
        workflow::ensure_status(device.status, workflow::INSPECTABLE, "inspect device")?;

        let issues = input.issues();
        let panels = input.panels();
        let spares = normalize_requirements(&txn, &input.spares_required).await?;
        let stock = stock_levels(&txn, &spares).await?;

        let outcome = InspectionOutcome {
            has_issues: !issues.is_empty(),
            spares_needed: !spares.is_empty(),
            spares_pending: workflow::spares_pending(&spares, &stock),
            paint_needed: !panels.is_empty(),
        };
        let next_status = workflow::next_status_after_inspection(&outcome);

        let report = inspection::ActiveModel {
            device_id: Set(device.id),
            inspector_id: Set(inspector_id),
            checklist: Set(serde_json::to_value(&input.checklist).unwrap_or_default()),
            reported_issues: Set(serde_json::to_value(&issues).unwrap_or_default()),
            spares_required: Set(serde_json::to_value(&spares).unwrap_or_default()),
            paint_panels: Set(serde_json::to_value(&panels).unwrap_or_default()),
            notes: Set(input.notes.clone()),
            next_status: Set(next_status),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut events = Vec::new();
        let mut job = None;
        if outcome.repair_required() {
            let job_number = next_document_number::<repair_job::Entity, _>(
                &txn,
                repair_job::Column::JobNumber,
                "RJ",
            )
            .await?;
            let status = if outcome.spares_pending {
                RepairJobStatus::WaitingForSpares
            } else {
                RepairJobStatus::ReadyForRepair
            };

            let created = repair_job::ActiveModel {
                job_number: Set(job_number),
                device_id: Set(device.id),
                inspection_id: Set(Some(report.id)),
                status: Set(status),
                reported_issues: Set(serde_json::to_value(&issues).unwrap_or_default()),
                spares_required: Set(serde_json::to_value(&spares).unwrap_or_default()),
                tat_due_date: Set(Some(Utc::now() + Duration::hours(self.default_tat_hours))),
                is_rework: Set(false),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            events.push(Event::RepairJobCreated {
                job_id: created.id,
                device_id: device.id,
                is_rework: false,
            });

            let created = if outcome.spares_needed && !outcome.spares_pending {
                events.extend(issue_to_job(&txn, &spares, created.id, inspector_id).await?);
                let mut active = created.into_active_model();
                active.spares_issued = Set(true);
                active.update(&txn).await?
            } else {
                created
            };
            job = Some(created);
        }

        let mut panel_rows = Vec::with_capacity(panels.len());
        for panel in &panels {
            let row = paint_panel::ActiveModel {
                device_id: Set(device.id),
                panel: Set(*panel),
                status: Set(PaintPanelStatus::AwaitingPaint),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            panel_rows.push(row);
        }

        let mut update = device.clone().into_active_model();
        update.repair_required = Set(outcome.repair_required());
        update.repair_completed = Set(false);
        update.paint_required = Set(outcome.paint_needed);
        update.paint_completed = Set(false);
        let (device, status_event) = save_transition(
            &txn,
            &device,
            update,
            next_status,
            Transition::new("inspection", inspector_id).with_notes(input.notes),
        )
        .await?;
        events.push(status_event);
        events.push(Event::InspectionSubmitted {
            device_id: device.id,
            inspection_id: report.id,
            next_status,
        });

        txn.commit().await?;

        info!(
            device_id = %device.id,
            next_status = %next_status,
            repair_job = job.as_ref().map(|j| j.job_number.as_str()).unwrap_or("-"),
            panels = panel_rows.len(),
            "inspection submitted"
        );
        for event in events {
            self.event_sender.send_or_log(event).await;
        }

        Ok(InspectionResult {
            inspection: report,
            device,
            repair_job: job,
            paint_panels: panel_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{spare_part, DeviceStatus};
    use crate::test_support::{receive_device, stock_part, test_db, test_events};
    use assert_matches::assert_matches;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    async fn setup() -> (Arc<DbPool>, InspectionService) {
        let db = Arc::new(test_db().await);
        (db.clone(), InspectionService::new(db, test_events(), 48))
    }

    fn spares(code: &str, quantity: i32) -> Vec<SpareRequirement> {
        vec![SpareRequirement {
            part_code: code.into(),
            quantity,
        }]
    }

    async fn stock_of(db: &DbPool, code: &str) -> i32 {
        spare_part::Entity::find()
            .filter(spare_part::Column::PartCode.eq(code))
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .current_stock
    }

    #[tokio::test]
    async fn clean_device_goes_straight_to_qc() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "INS-1").await;
        let checklist = BTreeMap::from([("display".to_string(), true), ("keyboard".to_string(), true)]);

        let result = svc
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    checklist,
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(result.device.status, DeviceStatus::AwaitingQc);
        assert!(result.repair_job.is_none());
        assert!(result.paint_panels.is_empty());
        assert_eq!(result.inspection.next_status, DeviceStatus::AwaitingQc);
    }

    #[tokio::test]
    async fn in_stock_spares_are_issued_at_inspection() {
        let (db, svc) = setup().await;
        stock_part(&db, "BAT-7490", 2).await;
        let device = receive_device(&db, "INS-2").await;

        let result = svc
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    reported_issues: vec!["Battery swollen".into()],
                    spares_required: spares("bat-7490", 1),
                    paint_panels: vec![PanelType::TopCover, PanelType::TopCover],
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(result.device.status, DeviceStatus::ReadyForRepair);
        assert!(result.device.repair_required && result.device.paint_required);
        let job = result.repair_job.unwrap();
        assert_eq!(job.status, RepairJobStatus::ReadyForRepair);
        assert!(job.spares_issued);
        assert!(job.job_number.starts_with("RJ-"));
        assert_eq!(result.paint_panels.len(), 1);
        assert_eq!(stock_of(&db, "BAT-7490").await, 1);
    }

    #[tokio::test]
    async fn short_spares_park_device() {
        let (db, svc) = setup().await;
        stock_part(&db, "LCD-14", 0).await;
        let device = receive_device(&db, "INS-3").await;

        let result = svc
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    spares_required: spares("LCD-14", 1),
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(result.device.status, DeviceStatus::WaitingForSpares);
        let job = result.repair_job.unwrap();
        assert_eq!(job.status, RepairJobStatus::WaitingForSpares);
        assert!(!job.spares_issued);
        assert_eq!(stock_of(&db, "LCD-14").await, 0);
    }

    #[tokio::test]
    async fn paint_only_goes_to_paint_shop() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "INS-4").await;
        let result = svc
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    paint_panels: vec![PanelType::Palmrest, PanelType::BottomBase],
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        assert_eq!(result.device.status, DeviceStatus::InPaintShop);
        assert_eq!(result.paint_panels.len(), 2);
        assert!(result.repair_job.is_none());
    }

    #[tokio::test]
    async fn failed_check_counts_as_issue() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "INS-5").await;
        let result = svc
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    checklist: BTreeMap::from([("hinges".to_string(), false)]),
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        assert_eq!(result.device.status, DeviceStatus::ReadyForRepair);
        let job = result.repair_job.unwrap();
        assert_eq!(job.reported_issues, serde_json::json!(["hinges"]));
    }

    #[tokio::test]
    async fn device_cannot_be_inspected_twice() {
        let (db, svc) = setup().await;
        let device = receive_device(&db, "INS-6").await;
        svc.submit_inspection(device.id, SubmitInspectionInput::default(), Uuid::new_v4())
            .await
            .unwrap();
        assert_matches!(
            svc.submit_inspection(device.id, SubmitInspectionInput::default(), Uuid::new_v4())
                .await,
            Err(ServiceError::InvalidStatus(_))
        );
    }
}
