use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool, events::EventSender};

// Shared device lifecycle helpers
pub mod lifecycle;

// Receiving
pub mod inward;
pub mod purchase_orders;

// Shop floor
pub mod devices;
pub mod inspection;
pub mod paint;
pub mod qc;
pub mod repairs;
pub mod specialist;

// Stock and dispatch
pub mod outward;
pub mod spares;

// Supporting services
pub mod attachments;
pub mod reports;
pub mod users;

/// Clamps client paging input to `1..=max_per_page`.
pub fn page_bounds(page: u64, per_page: u64, max_per_page: u64) -> (u64, u64) {
    (page.max(1), per_page.clamp(1, max_per_page.max(1)))
}

/// Every workstation service, built once at startup and shared by handlers.
#[derive(Clone)]
pub struct AppServices {
    pub inward: Arc<inward::InwardService>,
    pub purchase_orders: Arc<purchase_orders::PurchaseOrderService>,
    pub devices: Arc<devices::DeviceService>,
    pub inspection: Arc<inspection::InspectionService>,
    pub repairs: Arc<repairs::RepairService>,
    pub specialist: Arc<specialist::SpecialistService>,
    pub paint: Arc<paint::PaintService>,
    pub qc: Arc<qc::QcService>,
    pub spares: Arc<spares::SparesService>,
    pub outward: Arc<outward::OutwardService>,
    pub users: Arc<users::UserService>,
    pub reports: Arc<reports::ReportService>,
    pub attachments: Arc<attachments::AttachmentService>,
    pub exports: Arc<crate::export::ExportService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let store = crate::uploads::UploadStore::new(config.uploads_dir.clone(), config.max_upload_bytes);

        Self {
            inward: Arc::new(inward::InwardService::new(db.clone(), event_sender.clone())),
            purchase_orders: Arc::new(purchase_orders::PurchaseOrderService::new(
                db.clone(),
                event_sender.clone(),
            )),
            devices: Arc::new(devices::DeviceService::new(db.clone())),
            inspection: Arc::new(inspection::InspectionService::new(
                db.clone(),
                event_sender.clone(),
                config.default_tat_hours,
            )),
            repairs: Arc::new(repairs::RepairService::new(
                db.clone(),
                event_sender.clone(),
                config.default_tat_hours,
            )),
            specialist: Arc::new(specialist::SpecialistService::new(
                db.clone(),
                event_sender.clone(),
            )),
            paint: Arc::new(paint::PaintService::new(db.clone(), event_sender.clone())),
            qc: Arc::new(qc::QcService::new(
                db.clone(),
                event_sender.clone(),
                config.default_tat_hours,
            )),
            spares: Arc::new(spares::SparesService::new(db.clone(), event_sender.clone())),
            outward: Arc::new(outward::OutwardService::new(db.clone(), event_sender.clone())),
            users: Arc::new(users::UserService::new(db.clone())),
            reports: Arc::new(reports::ReportService::new(db.clone())),
            attachments: Arc::new(attachments::AttachmentService::new(
                db.clone(),
                event_sender,
                store,
            )),
            exports: Arc::new(crate::export::ExportService::new(db)),
        }
    }
}
