use crate::{
    db::DbPool,
    entities::attachment,
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::find_device,
    uploads::UploadStore,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Incoming file as read from the multipart body.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Inspection photos, damage evidence and supplier paperwork per device.
pub struct AttachmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    store: UploadStore,
}

impl AttachmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, store: UploadStore) -> Self {
        Self {
            db_pool,
            event_sender,
            store,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.store.max_bytes()
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload(
        &self,
        device_id: Uuid,
        file: NewAttachment,
        uploaded_by: Uuid,
    ) -> Result<attachment::Model, ServiceError> {
        let db = &*self.db_pool;
        let device = find_device(db, device_id).await?;

        let file_name = sanitize_file_name(&file.file_name);
        let id = Uuid::new_v4();
        let storage_path = self
            .store
            .save(device.id, id, &file.content_type, &file.bytes)
            .await?;

        let row = attachment::ActiveModel {
            id: Set(id),
            device_id: Set(device.id),
            file_name: Set(file_name),
            content_type: Set(file.content_type),
            size_bytes: Set(file.bytes.len() as i64),
            storage_path: Set(storage_path.clone()),
            uploaded_by: Set(Some(uploaded_by)),
            ..Default::default()
        }
        .insert(db)
        .await;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&storage_path).await {
                    warn!(error = %cleanup, path = %storage_path, "orphaned attachment file");
                }
                return Err(e.into());
            }
        };

        info!(attachment_id = %row.id, device_id = %device.id, "attachment uploaded");
        self.event_sender
            .send_or_log(Event::AttachmentUploaded {
                device_id: device.id,
                attachment_id: row.id,
            })
            .await;
        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, device_id: Uuid) -> Result<Vec<attachment::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_device(db, device_id).await?;
        Ok(attachment::Entity::find()
            .filter(attachment::Column::DeviceId.eq(device_id))
            .order_by_asc(attachment::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Metadata plus file contents.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        device_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(attachment::Model, Vec<u8>), ServiceError> {
        let row = self.find(device_id, attachment_id).await?;
        let bytes = self.store.read(&row.storage_path).await?;
        Ok((row, bytes))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, device_id: Uuid, attachment_id: Uuid) -> Result<(), ServiceError> {
        let row = self.find(device_id, attachment_id).await?;
        attachment::Entity::delete_by_id(row.id)
            .exec(&*self.db_pool)
            .await?;
        self.store.remove(&row.storage_path).await
    }

    async fn find(
        &self,
        device_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<attachment::Model, ServiceError> {
        attachment::Entity::find_by_id(attachment_id)
            .filter(attachment::Column::DeviceId.eq(device_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Attachment {} not found", attachment_id)))
    }
}

/// Keeps the last path segment and drops anything that is not printable.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .take(200)
        .collect();
    if cleaned.trim().is_empty() {
        "attachment".to_string()
    } else {
        cleaned.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{receive_device, test_db, test_events};
    use assert_matches::assert_matches;

    fn png(name: &str) -> NewAttachment {
        NewAttachment {
            file_name: name.into(),
            content_type: "image/png".into(),
            bytes: b"\x89PNG\r\n\x1a\n....".to_vec(),
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("C:\\photos\\lid.png"), "lid.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("  "), "attachment");
    }

    #[tokio::test]
    async fn upload_list_download_delete() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(test_db().await);
        let device = receive_device(&db, "ATT-1").await;
        let svc = AttachmentService::new(
            db.clone(),
            test_events(),
            UploadStore::new(dir.path(), 1024),
        );

        let row = svc
            .upload(device.id, png("scratch.png"), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(row.file_name, "scratch.png");
        assert_eq!(svc.list(device.id).await.unwrap().len(), 1);

        let (meta, bytes) = svc.download(device.id, row.id).await.unwrap();
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(bytes.len() as i64, row.size_bytes);

        assert_matches!(
            svc.download(Uuid::new_v4(), row.id).await,
            Err(ServiceError::NotFound(_))
        );
        svc.delete(device.id, row.id).await.unwrap();
        assert!(svc.list(device.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_unsupported_types() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(test_db().await);
        let device = receive_device(&db, "ATT-2").await;
        let svc = AttachmentService::new(db, test_events(), UploadStore::new(dir.path(), 1024));

        let exe = NewAttachment {
            file_name: "setup.exe".into(),
            content_type: "application/x-msdownload".into(),
            bytes: vec![0x4d, 0x5a],
        };
        assert_matches!(
            svc.upload(device.id, exe, Uuid::new_v4()).await,
            Err(ServiceError::UnsupportedMediaType(_))
        );
        assert!(svc.list(device.id).await.unwrap().is_empty());
    }
}
