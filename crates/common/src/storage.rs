//! Blob store client for binary attachments.
//!
//! Attachments are held by an external blob service, addressed by an opaque
//! key and guarded by a shared access credential. This module provides the
//! client abstraction plus the HTTP implementation used in production.

use std::sync::Arc;
use std::time::Duration;

use crate::{AppError, AppResult};

/// Kind of binary the blob store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// JPEG image.
    Image,
    /// MP4 video.
    Video,
}

impl MediaKind {
    /// File extension used in attachment keys.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video => "mp4",
        }
    }

    /// MIME type served back to clients.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Video => "video/mp4",
        }
    }

    /// Path segment on the blob service.
    const fn path(self) -> &'static str {
        match self {
            Self::Image => "chat/image",
            Self::Video => "chat/video",
        }
    }
}

/// Client abstraction over the external blob store.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a binary under the given key.
    async fn upload(&self, key: &str, data: Vec<u8>, kind: MediaKind) -> AppResult<()>;

    /// Fetch the binary stored under the given key.
    async fn download(&self, key: &str, kind: MediaKind) -> AppResult<Vec<u8>>;

    /// Delete the binary stored under the given key.
    async fn delete(&self, key: &str, kind: MediaKind) -> AppResult<()>;
}

/// Shared handle to a blob store implementation.
pub type BlobStoreService = Arc<dyn BlobStore>;

/// HTTP client for the blob store service.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl HttpBlobStore {
    /// Create a new blob store client with the given request timeout.
    pub fn new(base_url: &str, access_key: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build blob store client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
        })
    }

    fn endpoint(&self, kind: MediaKind) -> String {
        format!("{}/{}", self.base_url, kind.path())
    }
}

#[async_trait::async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, key: &str, data: Vec<u8>, kind: MediaKind) -> AppResult<()> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(key.to_string())
            .mime_str(kind.media_type())
            .map_err(|e| AppError::Internal(format!("Invalid media type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(kind))
            .query(&[("fileName", key), ("access_key", self.access_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::AttachmentUploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::AttachmentUploadFailed(format!(
                "Blob store returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn download(&self, key: &str, kind: MediaKind) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(self.endpoint(kind))
            .query(&[("fileName", key), ("access_key", self.access_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Blob store request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Attachment not found: {key}")));
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Blob store returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalService(format!("Blob store read failed: {e}")))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str, kind: MediaKind) -> AppResult<()> {
        let response = self
            .client
            .delete(self.endpoint(kind))
            .query(&[("fileName", key), ("access_key", self.access_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Blob store request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Blob store returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_extensions() {
        assert_eq!(MediaKind::Image.extension(), "jpg");
        assert_eq!(MediaKind::Video.extension(), "mp4");
    }

    #[test]
    fn test_media_kind_media_types() {
        assert_eq!(MediaKind::Image.media_type(), "image/jpeg");
        assert_eq!(MediaKind::Video.media_type(), "video/mp4");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let store =
            HttpBlobStore::new("http://files.local/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.endpoint(MediaKind::Image),
            "http://files.local/chat/image"
        );
        assert_eq!(
            store.endpoint(MediaKind::Video),
            "http://files.local/chat/video"
        );
    }
}
