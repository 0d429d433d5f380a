//! File storage for avatars and ticket attachments.
//!
//! Files live under the configured upload directory; the database keeps the
//! path relative to that directory (`avatars/<uuid>.png`).

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;
pub const ATTACHMENT_MAX_BYTES: usize = 10 * 1024 * 1024;

const AVATAR_DIR: &str = "avatars";
const ATTACHMENT_DIR: &str = "attachments";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing multipart field '{0}'")]
    MissingField(&'static str),

    #[error("File too large: max size is {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Invalid stored path: {0}")]
    InvalidPath(String),

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One file part pulled out of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Where a file ended up
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Path relative to the upload root, as persisted
    pub relative_path: String,
    pub original_name: String,
    pub size: i64,
    pub mime_type: Option<String>,
}

/// Read the part named `field` and skip all others
pub async fn read_field(multipart: &mut Multipart, field: &'static str, limit: usize) -> Result<UploadedFile, UploadError> {
    let rejected = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge { limit }
        } else {
            UploadError::Multipart(e.body_text())
        }
    };

    while let Some(part) = multipart.next_field().await.map_err(rejected)? {
        if part.name() != Some(field) {
            continue;
        }
        let filename = part.file_name().unwrap_or(field).to_string();
        let content_type = part.content_type().map(str::to_string);
        let bytes = part.bytes().await.map_err(rejected)?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }
    Err(UploadError::MissingField(field))
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an avatar image (png, jpeg or webp, at most 2 MB)
    pub async fn save_avatar(&self, file: &UploadedFile) -> Result<StoredFile, UploadError> {
        check_size(file, AVATAR_MAX_BYTES)?;
        let mime = file.content_type.clone().unwrap_or_default();
        let ext = avatar_extension(&mime).ok_or_else(|| UploadError::UnsupportedType(mime.clone()))?;
        let relative_path = format!("{}/{}.{}", AVATAR_DIR, Uuid::new_v4(), ext);
        self.write(&relative_path, &file.bytes).await?;
        Ok(stored(file, relative_path))
    }

    /// Store a ticket attachment of any type (at most 10 MB)
    pub async fn save_attachment(&self, file: &UploadedFile) -> Result<StoredFile, UploadError> {
        check_size(file, ATTACHMENT_MAX_BYTES)?;
        let relative_path = match safe_extension(&file.filename) {
            Some(ext) => format!("{}/{}.{}", ATTACHMENT_DIR, Uuid::new_v4(), ext),
            None => format!("{}/{}", ATTACHMENT_DIR, Uuid::new_v4()),
        };
        self.write(&relative_path, &file.bytes).await?;
        Ok(stored(file, relative_path))
    }

    /// Delete a previously stored file; a file that is already gone is fine
    pub async fn remove(&self, relative_path: &str) -> Result<(), UploadError> {
        let path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Stored file already removed: {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), UploadError> {
        let path = self.resolve(relative_path)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    // Stored paths must stay inside the upload root.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(relative_path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative_path.is_empty() || !contained {
            return Err(UploadError::InvalidPath(relative_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn check_size(file: &UploadedFile, limit: usize) -> Result<(), UploadError> {
    if file.bytes.len() > limit {
        return Err(UploadError::TooLarge { limit });
    }
    Ok(())
}

fn stored(file: &UploadedFile, relative_path: String) -> StoredFile {
    StoredFile {
        relative_path,
        original_name: file.filename.clone(),
        size: file.bytes.len() as i64,
        mime_type: file.content_type.clone(),
    }
}

fn avatar_extension(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn safe_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
}
