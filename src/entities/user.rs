use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Workstation roles. Every route group is gated on one or more of these;
/// `Admin` passes every gate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "WAREHOUSE_MANAGER")]
    WarehouseManager,
    #[sea_orm(string_value = "INWARD_EXECUTIVE")]
    InwardExecutive,
    #[sea_orm(string_value = "INSPECTION_ENGINEER")]
    InspectionEngineer,
    #[sea_orm(string_value = "L2_ENGINEER")]
    L2Engineer,
    #[sea_orm(string_value = "L3_ENGINEER")]
    L3Engineer,
    #[sea_orm(string_value = "DISPLAY_TECHNICIAN")]
    DisplayTechnician,
    #[sea_orm(string_value = "BATTERY_TECHNICIAN")]
    BatteryTechnician,
    #[sea_orm(string_value = "PAINT_TECHNICIAN")]
    PaintTechnician,
    #[sea_orm(string_value = "QC_ENGINEER")]
    QcEngineer,
    #[sea_orm(string_value = "SPARES_MANAGER")]
    SparesManager,
    #[sea_orm(string_value = "DISPATCH_EXECUTIVE")]
    DispatchExecutive,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::WarehouseManager => "WAREHOUSE_MANAGER",
            Self::InwardExecutive => "INWARD_EXECUTIVE",
            Self::InspectionEngineer => "INSPECTION_ENGINEER",
            Self::L2Engineer => "L2_ENGINEER",
            Self::L3Engineer => "L3_ENGINEER",
            Self::DisplayTechnician => "DISPLAY_TECHNICIAN",
            Self::BatteryTechnician => "BATTERY_TECHNICIAN",
            Self::PaintTechnician => "PAINT_TECHNICIAN",
            Self::QcEngineer => "QC_ENGINEER",
            Self::SparesManager => "SPARES_MANAGER",
            Self::DispatchExecutive => "DISPATCH_EXECUTIVE",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

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
            if let ActiveValue::NotSet = self.active {
                self.active = ActiveValue::Set(true);
            }
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
