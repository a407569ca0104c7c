use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserRole;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialistKind {
    #[sea_orm(string_value = "L3")]
    L3,
    #[sea_orm(string_value = "DISPLAY")]
    Display,
    #[sea_orm(string_value = "BATTERY")]
    Battery,
}

impl SpecialistKind {
    /// The technician role that works this queue.
    pub fn technician_role(&self) -> UserRole {
        match self {
            Self::L3 => UserRole::L3Engineer,
            Self::Display => UserRole::DisplayTechnician,
            Self::Battery => UserRole::BatteryTechnician,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialistJobStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANNOT_REPAIR")]
    CannotRepair,
}

impl SpecialistJobStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "specialist_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repair_job_id: Uuid,
    pub device_id: Uuid,
    pub kind: SpecialistKind,
    pub status: SpecialistJobStatus,
    pub issue_description: String,
    pub assigned_to: Option<Uuid>,
    pub battery_health_before: Option<i32>,
    pub battery_health_after: Option<i32>,
    pub resolution_notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repair_job::Entity",
        from = "Column::RepairJobId",
        to = "super::repair_job::Column::Id"
    )]
    RepairJob,
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::repair_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepairJob.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
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
                self.status = ActiveValue::Set(SpecialistJobStatus::Pending);
            }
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
