use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::Settings;

pub(crate) const QUESTION_IMAGE_FOLDER: &str = "exam_questions";

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("image {0} has no usable file name")]
    InvalidName(String),
    #[error("image extension .{0} is not allowed")]
    UnsupportedExtension(String),
    #[error("failed to read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to store image: {0}")]
    Upload(String),
}

/// Durable home for question images.
///
/// `folder` namespaces the object, `public_id` must be unique per upload. The
/// returned string is a reference the frontend can resolve directly.
#[async_trait]
pub(crate) trait ImageStore: Send + Sync {
    async fn upload(&self, local: &Path, folder: &str, public_id: &str)
        -> Result<String, StorageError>;
}

pub(crate) async fn image_store_from_settings(
    settings: &Settings,
) -> anyhow::Result<Arc<dyn ImageStore>> {
    if settings.s3().is_configured() {
        let store = S3ImageStore::from_settings(settings).await;
        tracing::info!(bucket = %settings.s3().bucket, "Using S3 image store");
        return Ok(Arc::new(store));
    }

    let store = LocalImageStore::from_settings(settings);
    tokio::fs::create_dir_all(&store.root).await?;
    tracing::info!(root = %store.root.display(), "S3 not configured; using local image store");
    Ok(Arc::new(store))
}

#[derive(Debug, Clone)]
pub(crate) struct S3ImageStore {
    client: Client,
    bucket: String,
    base_url: String,
    allowed_extensions: Vec<String>,
}

impl S3ImageStore {
    pub(crate) async fn from_settings(settings: &Settings) -> Self {
        let s3 = settings.s3();
        let creds = Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "examhall-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(s3.endpoint.clone())
            .region(aws_config::Region::new(s3.region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        Self {
            client: Client::new(&config),
            bucket: s3.bucket.clone(),
            base_url: s3.object_base_url(),
            allowed_extensions: settings.storage().allowed_image_extensions.clone(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(
        &self,
        local: &Path,
        folder: &str,
        public_id: &str,
    ) -> Result<String, StorageError> {
        let extension = checked_extension(local, &self.allowed_extensions)?;
        let bytes = tokio::fs::read(local).await.map_err(|source| StorageError::Read {
            path: local.display().to_string(),
            source,
        })?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let key = format!("{folder}/{public_id}.{extension}");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(&extension))
            .metadata("sha256", &digest)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| StorageError::Upload(err.to_string()))?;

        tracing::debug!(key = %key, sha256 = %digest, "Uploaded image to S3");
        Ok(format!("{}/{key}", self.base_url))
    }
}

/// Copies images under `UPLOADS_DIR`, served back at `/uploads`.
#[derive(Debug, Clone)]
pub(crate) struct LocalImageStore {
    root: PathBuf,
    allowed_extensions: Vec<String>,
}

impl LocalImageStore {
    pub(crate) fn new(root: impl Into<PathBuf>, allowed_extensions: Vec<String>) -> Self {
        Self { root: root.into(), allowed_extensions }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.storage().uploads_dir,
            settings.storage().allowed_image_extensions.clone(),
        )
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(
        &self,
        local: &Path,
        folder: &str,
        public_id: &str,
    ) -> Result<String, StorageError> {
        checked_extension(local, &self.allowed_extensions)?;
        let file_name = local
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StorageError::InvalidName(local.display().to_string()))?;
        let stored_name = format!("{public_id}_{file_name}");

        let target_dir = self.root.join(folder);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|err| StorageError::Upload(err.to_string()))?;
        tokio::fs::copy(local, target_dir.join(&stored_name)).await.map_err(|source| {
            StorageError::Read { path: local.display().to_string(), source }
        })?;

        Ok(format!("/uploads/{folder}/{stored_name}"))
    }
}

fn checked_extension(path: &Path, allowed: &[String]) -> Result<String, StorageError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| StorageError::InvalidName(path.display().to_string()))?;

    if !allowed.iter().any(|item| item == &extension) {
        return Err(StorageError::UnsupportedExtension(extension));
    }
    Ok(extension)
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        vec!["png".to_string(), "jpg".to_string()]
    }

    #[tokio::test]
    async fn local_store_copies_into_folder() {
        let source_dir = tempfile::tempdir().expect("source dir");
        let source = source_dir.path().join("map.PNG");
        tokio::fs::write(&source, b"png-bytes").await.expect("write source");

        let uploads = tempfile::tempdir().expect("uploads dir");
        let store = LocalImageStore::new(uploads.path(), extensions());

        let reference =
            store.upload(&source, QUESTION_IMAGE_FOLDER, "q_abc").await.expect("upload");

        assert_eq!(reference, "/uploads/exam_questions/q_abc_map.PNG");
        let stored = uploads.path().join("exam_questions").join("q_abc_map.PNG");
        assert_eq!(tokio::fs::read(stored).await.expect("stored"), b"png-bytes");
    }

    #[tokio::test]
    async fn local_store_rejects_disallowed_extension() {
        let source_dir = tempfile::tempdir().expect("source dir");
        let source = source_dir.path().join("payload.exe");
        tokio::fs::write(&source, b"mz").await.expect("write source");

        let uploads = tempfile::tempdir().expect("uploads dir");
        let store = LocalImageStore::new(uploads.path(), extensions());

        let err = store.upload(&source, QUESTION_IMAGE_FOLDER, "q_1").await.expect_err("rejected");
        assert!(matches!(err, StorageError::UnsupportedExtension(ext) if ext == "exe"));
    }

    #[test]
    fn content_types_cover_whitelist() {
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("webp"), "image/webp");
    }
}
