//! SeaORM entity models for the refurbishment workflow.

pub mod attachment;
pub mod device;
pub mod device_history;
pub mod inspection;
pub mod inward_batch;
pub mod outward_item;
pub mod outward_record;
pub mod paint_panel;
pub mod purchase_order;
pub mod qc_record;
pub mod repair_job;
pub mod spare_part;
pub mod spare_transaction;
pub mod specialist_job;
pub mod user;

pub use device::{DeviceCategory, DeviceStatus, Grade, Ownership};
pub use inward_batch::InwardType;
pub use outward_record::OutwardType;
pub use paint_panel::{PaintPanelStatus, PanelType};
pub use purchase_order::PurchaseOrderStatus;
pub use qc_record::QcResult;
pub use repair_job::RepairJobStatus;
pub use spare_transaction::SpareTransactionKind;
pub use specialist_job::{SpecialistJobStatus, SpecialistKind};
pub use user::UserRole;
