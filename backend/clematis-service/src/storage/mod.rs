//! Blob storage for uploads and generated thumbnails.
//!
//! Objects are addressed by `<folder>/<epochMillis>_<name>`. The local driver
//! writes under a directory served back by `GET /uploads/{key}`; the S3
//! driver writes to a bucket fronted by a public base URL.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{S3StorageConfig, StorageConfig, StorageDriver};
use crate::error::AppError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("s3 error: {0}")]
    S3(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => AppError::InvalidInput(key),
            StorageError::NotFound(key) => AppError::NotFound(key),
            StorageError::Io(_) | StorageError::S3(_) => AppError::Transient(err.to_string()),
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    fn public_url(&self, key: &str) -> String;
}

/// Keep only characters that are safe in a path segment and an S3 key.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<folder>/<epochMillis>_<name>`
pub fn object_key(folder: &str, name: &str) -> String {
    format!("{}/{}_{}", folder, Utc::now().timestamp_millis(), sanitize_name(name))
}

/// Save under a fresh key in `folder` and return the URL.
pub async fn save(
    store: &dyn BlobStore,
    folder: &str,
    name: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<String, StorageError> {
    let key = object_key(folder, name);
    let size = bytes.len();
    let url = store.put(&key, bytes, content_type).await?;
    debug!(key = %key, size, "stored blob");
    Ok(url)
}

/// Resolve `key` beneath `root`, refusing anything that could escape it.
pub fn resolve_local_path(root: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let relative = Path::new(key);
    let safe = !key.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !safe {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(root.join(relative))
}

/// Content type for a stored object, guessed from its extension.
pub fn content_type_for(key: &str) -> mime::Mime {
    let extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        Some("mp4") | Some("m4v") => "video/mp4".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("mov") => "video/quicktime"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("webm") => "video/webm".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = resolve_local_path(&self.root, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        let path = resolve_local_path(&self.root, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.base_url, key)
    }
}

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            base_url: base_url.into(),
        }
    }

    /// Build a client from the default credential chain plus the configured
    /// region and optional custom endpoint.
    pub async fn from_config(config: &S3StorageConfig) -> Self {
        use aws_sdk_s3::config::Region;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        Self::new(
            Client::from_conf(s3_config),
            config.bucket.clone(),
            config.base_url.clone(),
        )
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, "S3 upload failed: {}", e);
                StorageError::S3(e.to_string())
            })?;

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// Blob storage selected by configuration. The local store is kept typed so
/// its files can be served back.
pub enum Storage {
    Local(Arc<LocalBlobStore>),
    S3(Arc<S3BlobStore>),
}

impl Storage {
    pub async fn from_config(config: &StorageConfig, base_url: &str) -> Self {
        match config.driver {
            StorageDriver::Local => {
                Storage::Local(Arc::new(LocalBlobStore::new(&config.uploads_dir, base_url)))
            }
            StorageDriver::S3 => Storage::S3(Arc::new(S3BlobStore::from_config(&config.s3).await)),
        }
    }

    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        match self {
            Storage::Local(store) => store.clone(),
            Storage::S3(store) => store.clone(),
        }
    }

    pub fn local(&self) -> Option<Arc<LocalBlobStore>> {
        match self {
            Storage::Local(store) => Some(store.clone()),
            Storage::S3(_) => None,
        }
    }
}
