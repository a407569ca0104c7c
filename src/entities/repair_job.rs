use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairJobStatus {
    #[sea_orm(string_value = "WAITING_FOR_SPARES")]
    WaitingForSpares,
    #[sea_orm(string_value = "READY_FOR_REPAIR")]
    ReadyForRepair,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "AWAITING_SPECIALIST")]
    AwaitingSpecialist,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl RepairJobStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// A repair job opened by inspection, or by a failed QC (`is_rework`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repair_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub job_number: String,
    pub device_id: Uuid,
    pub inspection_id: Option<Uuid>,
    pub status: RepairJobStatus,
    #[sea_orm(column_type = "Json")]
    pub reported_issues: Json,
    #[sea_orm(column_type = "Json")]
    pub spares_required: Json,
    pub spares_issued: bool,
    pub assigned_to: Option<Uuid>,
    pub tat_due_date: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub repair_notes: Option<String>,
    pub is_rework: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.tat_due_date.map(|due| due < now).unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
    #[sea_orm(has_many = "super::specialist_job::Entity")]
    SpecialistJobs,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::specialist_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpecialistJobs.def()
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
            if let ActiveValue::NotSet = self.spares_issued {
                self.spares_issued = ActiveValue::Set(false);
            }
            if let ActiveValue::NotSet = self.is_rework {
                self.is_rework = ActiveValue::Set(false);
            }
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: RepairJobStatus, due: Option<DateTime<Utc>>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            job_number: "RJ-20240101-0001".into(),
            device_id: Uuid::new_v4(),
            inspection_id: None,
            status,
            reported_issues: serde_json::json!([]),
            spares_required: serde_json::json!([]),
            spares_issued: false,
            assigned_to: None,
            tat_due_date: due,
            started_at: None,
            completed_at: None,
            repair_notes: None,
            is_rework: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overdue_only_when_open_and_past_due() {
        let now = Utc::now();
        let past = Some(now - Duration::hours(1));
        let future = Some(now + Duration::hours(1));

        assert!(job(RepairJobStatus::InProgress, past).is_overdue(now));
        assert!(!job(RepairJobStatus::InProgress, future).is_overdue(now));
        assert!(!job(RepairJobStatus::Completed, past).is_overdue(now));
        assert!(!job(RepairJobStatus::ReadyForRepair, None).is_overdue(now));
    }
}
