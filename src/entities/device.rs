use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait, Iterable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a device on the shop floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    #[sea_orm(string_value = "RECEIVED")]
    Received,
    #[sea_orm(string_value = "PENDING_INSPECTION")]
    PendingInspection,
    #[sea_orm(string_value = "WAITING_FOR_SPARES")]
    WaitingForSpares,
    #[sea_orm(string_value = "READY_FOR_REPAIR")]
    ReadyForRepair,
    #[sea_orm(string_value = "UNDER_REPAIR")]
    UnderRepair,
    #[sea_orm(string_value = "IN_PAINT_SHOP")]
    InPaintShop,
    #[sea_orm(string_value = "AWAITING_QC")]
    AwaitingQc,
    #[sea_orm(string_value = "READY_FOR_STOCK")]
    ReadyForStock,
    #[sea_orm(string_value = "STOCK_OUT_SOLD")]
    StockOutSold,
    #[sea_orm(string_value = "STOCK_OUT_RENTAL")]
    StockOutRental,
    #[sea_orm(string_value = "SCRAPPED")]
    Scrapped,
}

impl DeviceStatus {
    /// Devices that have left the building or been written off.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::StockOutSold | Self::StockOutRental | Self::Scrapped
        )
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::iter().find(|status| status.to_value().eq_ignore_ascii_case(value.trim()))
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus::Received
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceCategory {
    #[sea_orm(string_value = "LAPTOP")]
    Laptop,
    #[sea_orm(string_value = "DESKTOP")]
    Desktop,
    #[sea_orm(string_value = "WORKSTATION")]
    Workstation,
    #[sea_orm(string_value = "MONITOR")]
    Monitor,
    #[sea_orm(string_value = "SERVER")]
    Server,
    #[sea_orm(string_value = "TABLET")]
    Tablet,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ownership {
    #[sea_orm(string_value = "REFURB_STOCK")]
    RefurbStock,
    #[sea_orm(string_value = "RENTAL_RETURN")]
    RentalReturn,
}

/// Cosmetic/functional grade assigned at QC.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum Grade {
    #[sea_orm(string_value = "A")]
    A,
    #[sea_orm(string_value = "B")]
    B,
    #[sea_orm(string_value = "C")]
    C,
    #[sea_orm(string_value = "D")]
    D,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub barcode: String,
    pub category: DeviceCategory,
    pub brand: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub ownership: Ownership,
    pub status: DeviceStatus,
    pub grade: Option<Grade>,
    pub inward_batch_id: Uuid,
    pub rack_location: Option<String>,
    pub repair_required: bool,
    pub repair_completed: bool,
    pub paint_required: bool,
    pub paint_completed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inward_batch::Entity",
        from = "Column::InwardBatchId",
        to = "super::inward_batch::Column::Id"
    )]
    InwardBatch,
    #[sea_orm(has_many = "super::repair_job::Entity")]
    RepairJobs,
    #[sea_orm(has_many = "super::paint_panel::Entity")]
    PaintPanels,
    #[sea_orm(has_many = "super::qc_record::Entity")]
    QcRecords,
    #[sea_orm(has_many = "super::device_history::Entity")]
    History,
    #[sea_orm(has_many = "super::outward_item::Entity")]
    OutwardItems,
}

impl Related<super::inward_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InwardBatch.def()
    }
}

impl Related<super::repair_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepairJobs.def()
    }
}

impl Related<super::paint_panel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaintPanels.def()
    }
}

impl Related<super::qc_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QcRecords.def()
    }
}

impl Related<super::device_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::outward_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutwardItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.status {
                self.status = ActiveValue::Set(DeviceStatus::PendingInspection);
            }
            for flag in [
                &mut self.repair_required,
                &mut self.repair_completed,
                &mut self.paint_required,
                &mut self.paint_completed,
            ] {
                if let ActiveValue::NotSet = flag {
                    *flag = ActiveValue::Set(false);
                }
            }
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}
