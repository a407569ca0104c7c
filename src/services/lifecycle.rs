//! Helpers shared by the workstation services: device lookup, status
//! transitions with their history rows, and document numbering.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::{device, device_history, DeviceStatus};
use crate::errors::ServiceError;
use crate::events::Event;

pub async fn find_device<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<device::Model, ServiceError> {
    device::Entity::find_by_id(device_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Device {} not found", device_id)))
}

/// One entry in the device activity log.
pub struct Transition<'a> {
    pub action: &'a str,
    pub performed_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl<'a> Transition<'a> {
    pub fn new(action: &'a str, performed_by: Uuid) -> Self {
        Self {
            action,
            performed_by: Some(performed_by),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

pub async fn record_history<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
    from: Option<DeviceStatus>,
    to: DeviceStatus,
    transition: &Transition<'_>,
) -> Result<device_history::Model, ServiceError> {
    let entry = device_history::ActiveModel {
        device_id: Set(device_id),
        from_status: Set(from),
        to_status: Set(to),
        action: Set(transition.action.to_string()),
        performed_by: Set(transition.performed_by),
        notes: Set(transition.notes.clone()),
        ..Default::default()
    };
    Ok(entry.insert(conn).await?)
}

/// Persists `update` with `to` as the new status and logs the move.
///
/// `update` must have been built from `current`; any other field changes it
/// carries are saved in the same statement.
pub async fn save_transition<C: ConnectionTrait>(
    conn: &C,
    current: &device::Model,
    mut update: device::ActiveModel,
    to: DeviceStatus,
    transition: Transition<'_>,
) -> Result<(device::Model, Event), ServiceError> {
    update.status = Set(to);
    let saved = update.update(conn).await?;
    record_history(conn, saved.id, Some(current.status), to, &transition).await?;

    let event = Event::DeviceStatusChanged {
        device_id: saved.id,
        from: Some(current.status),
        to,
        action: transition.action.to_string(),
    };
    Ok((saved, event))
}

/// Next `PREFIX-YYYYMMDD-NNNN` number for today.
///
/// Numbers are derived from a count of today's rows, so concurrent writers
/// can collide; the unique index turns that into a conflict error.
pub async fn next_document_number<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
) -> Result<String, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let stem = format!("{}-{}-", prefix, Utc::now().format("%Y%m%d"));
    let issued_today = E::find()
        .filter(column.starts_with(stem.as_str()))
        .count(conn)
        .await?;
    Ok(format!("{}{:04}", stem, issued_today + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{inward_batch, InwardType};
    use crate::test_support::test_db;

    #[tokio::test]
    async fn document_numbers_count_up_per_day() {
        let db = test_db().await;
        let first = next_document_number::<inward_batch::Entity, _>(
            &db,
            inward_batch::Column::BatchNumber,
            "INW",
        )
        .await
        .unwrap();
        assert!(first.starts_with("INW-"));
        assert!(first.ends_with("-0001"));

        inward_batch::ActiveModel {
            batch_number: Set(first.clone()),
            inward_type: Set(InwardType::RentalReturn),
            customer_name: Set(Some("Acme".into())),
            rental_reference: Set(Some("AGR-1".into())),
            received_by: Set(Uuid::new_v4()),
            device_count: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let second = next_document_number::<inward_batch::Entity, _>(
            &db,
            inward_batch::Column::BatchNumber,
            "INW",
        )
        .await
        .unwrap();
        assert!(second.ends_with("-0002"));
        assert_eq!(first[..13], second[..13]);
    }
}
