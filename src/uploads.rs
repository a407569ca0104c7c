//! On-disk storage for device attachments.
//!
//! Files live under `<root>/<device_id>/<attachment_id>.<ext>`. Only the
//! relative part is stored in the database so the root can move.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("application/pdf", "pdf"),
];

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// File extension for an accepted content type.
    pub fn extension_for(content_type: &str) -> Result<&'static str, ServiceError> {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == normalized)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                ServiceError::UnsupportedMediaType(format!(
                    "{} is not accepted; upload an image or PDF",
                    content_type
                ))
            })
    }

    /// Writes `bytes` and returns the relative storage path.
    pub async fn save(
        &self,
        device_id: Uuid,
        attachment_id: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError("Uploaded file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "Attachment is {} bytes; the limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        let ext = Self::extension_for(content_type)?;

        let relative = format!("{}/{}.{}", device_id, attachment_id, ext);
        let path = self.root.join(&relative);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "attachment stored");
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.resolve(relative)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound(
                "Attachment file is missing from storage".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, relative: &str) -> Result<(), ServiceError> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, ServiceError> {
        let rel = Path::new(relative);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::InvalidInput("Invalid attachment path".to_string()));
        }
        Ok(self.root.join(rel))
    }
}
