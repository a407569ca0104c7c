use crate::{
    db::DbPool,
    entities::{paint_panel, DeviceStatus, PaintPanelStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{find_device, record_history, save_transition, Transition},
    workflow,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaintCollection {
    #[schema(value_type = Object)]
    pub device: crate::entities::device::Model,
    #[schema(value_type = Vec<Object>)]
    pub panels: Vec<paint_panel::Model>,
}

pub struct PaintService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaintService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Panels not yet collected, or only those in `status`.
    #[instrument(skip(self))]
    pub async fn list_queue(
        &self,
        status: Option<PaintPanelStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<paint_panel::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let query = match status {
            Some(status) => paint_panel::Entity::find().filter(paint_panel::Column::Status.eq(status)),
            None => paint_panel::Entity::find()
                .filter(paint_panel::Column::Status.ne(PaintPanelStatus::Collected)),
        };
        let paginator = query
            .order_by_asc(paint_panel::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let panels = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((panels, total))
    }

    #[instrument(skip(self))]
    pub async fn start_panel(
        &self,
        panel_id: Uuid,
        painter_id: Uuid,
    ) -> Result<paint_panel::Model, ServiceError> {
        let db = &*self.db_pool;
        let panel = find_panel(db, panel_id).await?;
        if panel.status != PaintPanelStatus::AwaitingPaint {
            return Err(ServiceError::InvalidStatus(
                "Panel is not awaiting paint".to_string(),
            ));
        }
        let device = find_device(db, panel.device_id).await?;
        if device.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Device {} is {}",
                device.barcode, device.status
            )));
        }

        let mut active = panel.into_active_model();
        active.status = Set(PaintPanelStatus::InPaint);
        active.painted_by = Set(Some(painter_id));
        active.started_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_ready(
        &self,
        panel_id: Uuid,
        painter_id: Uuid,
    ) -> Result<paint_panel::Model, ServiceError> {
        let db = &*self.db_pool;
        let panel = find_panel(db, panel_id).await?;
        if panel.status != PaintPanelStatus::InPaint {
            return Err(ServiceError::InvalidStatus(
                "Panel is not in paint".to_string(),
            ));
        }

        let mut active = panel.clone().into_active_model();
        active.status = Set(PaintPanelStatus::ReadyForCollection);
        active.ready_at = Set(Some(Utc::now()));
        if panel.painted_by.is_none() {
            active.painted_by = Set(Some(painter_id));
        }
        Ok(active.update(db).await?)
    }

    /// Collects every ready panel of a device. All outstanding panels must be
    /// ready; the device then has its paint marked complete. Status only moves
    /// when the device is waiting in the paint shop.
    #[instrument(skip(self))]
    pub async fn collect_device_panels(
        &self,
        device_id: Uuid,
        collected_by: Uuid,
    ) -> Result<PaintCollection, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let device = find_device(&txn, device_id).await?;
        if !device.paint_required || device.paint_completed {
            return Err(ServiceError::InvalidStatus(format!(
                "Device {} has no paint work outstanding",
                device.barcode
            )));
        }

        let outstanding = paint_panel::Entity::find()
            .filter(paint_panel::Column::DeviceId.eq(device_id))
            .filter(paint_panel::Column::Status.ne(PaintPanelStatus::Collected))
            .all(&txn)
            .await?;
        if outstanding.is_empty() {
            return Err(ServiceError::InvalidStatus(format!(
                "Device {} has no panels to collect",
                device.barcode
            )));
        }
        let unfinished = outstanding
            .iter()
            .filter(|p| p.status != PaintPanelStatus::ReadyForCollection)
            .count();
        if unfinished > 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "{} panel(s) of device {} are still in paint",
                unfinished, device.barcode
            )));
        }

        let now = Utc::now();
        let mut panels = Vec::with_capacity(outstanding.len());
        for panel in outstanding {
            let mut active = panel.into_active_model();
            active.status = Set(PaintPanelStatus::Collected);
            active.collected_by = Set(Some(collected_by));
            active.collected_at = Set(Some(now));
            panels.push(active.update(&txn).await?);
        }

        let mut update = device.clone().into_active_model();
        update.paint_completed = Set(true);
        let transition = Transition::new("paint_collected", collected_by);
        let (device, status_event) = if device.status == DeviceStatus::InPaintShop {
            let next =
                workflow::next_status_after_paint(device.repair_required, device.repair_completed);
            let (device, event) = save_transition(&txn, &device, update, next, transition).await?;
            (device, Some(event))
        } else {
            // Painted in parallel with repair; the repair desk routes it on.
            let updated = update.update(&txn).await?;
            record_history(&txn, updated.id, Some(updated.status), updated.status, &transition)
                .await?;
            (updated, None)
        };

        txn.commit().await?;
        info!(device_id = %device.id, panels = panels.len(), status = %device.status, "paint collected");
        if let Some(event) = status_event {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::PaintCompleted(device.id))
            .await;
        Ok(PaintCollection { device, panels })
    }
}

async fn find_panel<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<paint_panel::Model, ServiceError> {
    paint_panel::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Paint panel {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PanelType;
    use crate::services::inspection::{InspectionService, SubmitInspectionInput};
    use crate::services::repairs::{CompleteRepairInput, RepairService};
    use crate::test_support::{receive_device, test_db, test_events};
    use assert_matches::assert_matches;

    async fn painted_device(
        db: &Arc<DbPool>,
        barcode: &str,
        issues: Vec<String>,
    ) -> crate::services::inspection::InspectionResult {
        let device = receive_device(db, barcode).await;
        InspectionService::new(db.clone(), test_events(), 24)
            .submit_inspection(
                device.id,
                SubmitInspectionInput {
                    reported_issues: issues,
                    paint_panels: vec![PanelType::TopCover, PanelType::Palmrest],
                    ..Default::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap()
    }

    async fn finish_panels(paint: &PaintService, panels: &[paint_panel::Model], painter: Uuid) {
        for panel in panels {
            paint.start_panel(panel.id, painter).await.unwrap();
            paint.mark_ready(panel.id, painter).await.unwrap();
        }
    }

    #[tokio::test]
    async fn paint_only_device_goes_to_qc_after_collection() {
        let db = Arc::new(test_db().await);
        let inspected = painted_device(&db, "PNT-1", vec![]).await;
        assert_eq!(inspected.device.status, DeviceStatus::InPaintShop);

        let paint = PaintService::new(db.clone(), test_events());
        let painter = Uuid::new_v4();
        let (queue, total) = paint.list_queue(None, 1, 20).await.unwrap();
        assert_eq!(total, 2);

        paint.start_panel(queue[0].id, painter).await.unwrap();
        paint.mark_ready(queue[0].id, painter).await.unwrap();
        assert_matches!(
            paint.collect_device_panels(inspected.device.id, painter).await,
            Err(ServiceError::InvalidStatus(_))
        );

        finish_panels(&paint, &queue[1..], painter).await;
        let collected = paint
            .collect_device_panels(inspected.device.id, painter)
            .await
            .unwrap();
        assert_eq!(collected.panels.len(), 2);
        assert!(collected
            .panels
            .iter()
            .all(|p| p.status == PaintPanelStatus::Collected));
        assert_eq!(collected.device.status, DeviceStatus::AwaitingQc);
        assert!(collected.device.paint_completed);

        assert_matches!(
            paint.collect_device_panels(inspected.device.id, painter).await,
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[tokio::test]
    async fn panels_painted_during_repair_skip_the_paint_shop() {
        let db = Arc::new(test_db().await);
        let inspected = painted_device(&db, "PNT-2", vec!["Dead keyboard".into()]).await;
        assert_eq!(inspected.device.status, DeviceStatus::ReadyForRepair);

        let paint = PaintService::new(db.clone(), test_events());
        let painter = Uuid::new_v4();
        finish_panels(&paint, &inspected.paint_panels, painter).await;
        let collected = paint
            .collect_device_panels(inspected.device.id, painter)
            .await
            .unwrap();
        assert_eq!(collected.device.status, DeviceStatus::ReadyForRepair);
        assert!(collected.device.paint_completed);

        let repairs = RepairService::new(db.clone(), test_events(), 24);
        let job = inspected.repair_job.unwrap();
        let engineer = Uuid::new_v4();
        repairs.start(job.id, engineer).await.unwrap();
        repairs
            .complete(job.id, CompleteRepairInput::default(), engineer)
            .await
            .unwrap();
        let device = find_device(&*db, inspected.device.id).await.unwrap();
        assert_eq!(device.status, DeviceStatus::AwaitingQc);
    }

    #[tokio::test]
    async fn repair_before_paint_lands_in_paint_shop() {
        let db = Arc::new(test_db().await);
        let inspected = painted_device(&db, "PNT-3", vec!["Bad fan".into()]).await;
        let repairs = RepairService::new(db.clone(), test_events(), 24);
        let job = inspected.repair_job.unwrap();
        let engineer = Uuid::new_v4();
        repairs.start(job.id, engineer).await.unwrap();
        repairs
            .complete(job.id, CompleteRepairInput::default(), engineer)
            .await
            .unwrap();
        assert_eq!(
            find_device(&*db, inspected.device.id).await.unwrap().status,
            DeviceStatus::InPaintShop
        );

        let paint = PaintService::new(db.clone(), test_events());
        finish_panels(&paint, &inspected.paint_panels, engineer).await;
        let collected = paint
            .collect_device_panels(inspected.device.id, engineer)
            .await
            .unwrap();
        assert_eq!(collected.device.status, DeviceStatus::AwaitingQc);
    }

    #[tokio::test]
    async fn panel_steps_are_ordered() {
        let db = Arc::new(test_db().await);
        let inspected = painted_device(&db, "PNT-4", vec![]).await;
        let paint = PaintService::new(db.clone(), test_events());
        let panel = &inspected.paint_panels[0];

        assert_matches!(
            paint.mark_ready(panel.id, Uuid::new_v4()).await,
            Err(ServiceError::InvalidStatus(_))
        );
        paint.start_panel(panel.id, Uuid::new_v4()).await.unwrap();
        assert_matches!(
            paint.start_panel(panel.id, Uuid::new_v4()).await,
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            paint.start_panel(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
