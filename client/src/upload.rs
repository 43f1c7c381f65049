//! Source image selection and upload bookkeeping.
//!
//! [`UploadCoordinator`] holds the single live [`UploadedImageRef`] of a
//! session. It does no I/O itself: the session starts the network upload and
//! reports the outcome back through [`UploadCoordinator::complete`], which
//! drops results belonging to a file that is no longer selected.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::Engine as _;
use bytes::Bytes;
use tracing::debug;

use super::error::{Error, Result};

/// Default upload size ceiling (10 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image types the backend accepts.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

// ==================== Source File ====================

/// A source image selected by the user.
pub struct SourceFile {
    name: String,
    content_type: String,
    bytes: Bytes,
    path: Option<PathBuf>,
}

impl SourceFile {
    /// Creates a file from raw parts.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
            path: None,
        }
    }

    /// Creates a file, deriving the content type from the name's extension.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).unwrap_or("application/octet-stream");
        Self::new(name, content_type, bytes)
    }

    /// Reads a file from disk.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        let mut file = Self::from_bytes(name, bytes);
        file.path = Some(std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
        Ok(file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a local reference for previewing the file before upload.
    pub fn preview_url(&self) -> String {
        match &self.path {
            Some(path) => format!("file://{}", path.display()),
            None => format!(
                "data:{};base64,{}",
                self.content_type,
                base64::engine::general_purpose::STANDARD.encode(&self.bytes)
            ),
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Guesses the content type of an image from its file name.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

// ==================== Upload Limits ====================

/// Client-side checks mirroring what the backend accepts.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UploadLimits {
    /// Rejects files the backend would refuse anyway.
    pub fn check(&self, file: &SourceFile) -> Result<()> {
        if !self.allowed_types.iter().any(|t| t == file.content_type()) {
            return Err(Error::Upload(format!(
                "Invalid file type. Allowed: {}",
                self.allowed_types.join(", ")
            )));
        }
        if file.is_empty() {
            return Err(Error::Upload("File is empty".to_string()));
        }
        if file.len() > self.max_bytes {
            return Err(Error::Upload(format!(
                "File too large. Maximum size: {}MB",
                self.max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

// ==================== Uploaded Image Ref ====================

/// The currently selected source image and its upload result.
#[derive(Debug, Clone)]
pub struct UploadedImageRef {
    file: Arc<SourceFile>,
    preview_url: String,
    remote_image_url: Option<String>,
}

impl UploadedImageRef {
    pub fn file(&self) -> &Arc<SourceFile> {
        &self.file
    }

    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    /// Backend reference of the image, set once the upload succeeded.
    pub fn remote_image_url(&self) -> Option<&str> {
        self.remote_image_url.as_deref()
    }
}

/// Upload progress of the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    InFlight,
    Uploaded,
    Failed(String),
}

/// What happened to a reported upload result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadCompletion {
    /// The file was superseded; the result was dropped.
    Stale,
    /// The upload succeeded and the reference was recorded.
    Uploaded(String),
    /// The upload failed; the selection is kept for retry.
    Failed(String),
}

// ==================== Coordinator ====================

/// Owns the single live [`UploadedImageRef`] of a session.
#[derive(Debug, Default)]
pub struct UploadCoordinator {
    current: Option<UploadedImageRef>,
    status: UploadStatus,
    limits: UploadLimits,
}

impl UploadCoordinator {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            current: None,
            status: UploadStatus::Idle,
            limits,
        }
    }

    /// Replaces the selection and returns the handle to upload.
    pub fn select(&mut self, file: SourceFile) -> Arc<SourceFile> {
        let file = Arc::new(file);
        debug!("selected {:?}", file);

        self.current = Some(UploadedImageRef {
            preview_url: file.preview_url(),
            file: file.clone(),
            remote_image_url: None,
        });
        self.status = UploadStatus::InFlight;
        file
    }

    /// Returns the selected file for another attempt.
    ///
    /// Only a failed upload can be retried; otherwise `None`.
    pub fn retry(&mut self) -> Option<Arc<SourceFile>> {
        if !matches!(self.status, UploadStatus::Failed(_)) {
            return None;
        }
        let current = self.current.as_mut()?;
        current.remote_image_url = None;
        self.status = UploadStatus::InFlight;
        Some(current.file.clone())
    }

    /// Applies the local checks to a file about to be uploaded.
    pub fn precheck(&self, file: &SourceFile) -> Result<()> {
        self.limits.check(file)
    }

    /// Records the outcome of uploading `file`.
    pub fn complete(&mut self, file: &Arc<SourceFile>, result: Result<String>) -> UploadCompletion {
        let Some(current) = self.current.as_mut() else {
            return UploadCompletion::Stale;
        };
        if !Arc::ptr_eq(&current.file, file) {
            debug!("dropping stale upload result for {}", file.name());
            return UploadCompletion::Stale;
        }

        match result {
            Ok(url) => {
                current.remote_image_url = Some(url.clone());
                self.status = UploadStatus::Uploaded;
                UploadCompletion::Uploaded(url)
            }
            Err(e) => {
                let message = e.user_message();
                self.status = UploadStatus::Failed(message.clone());
                UploadCompletion::Failed(message)
            }
        }
    }

    pub fn current(&self) -> Option<&UploadedImageRef> {
        self.current.as_ref()
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn remote_image_url(&self) -> Option<&str> {
        self.current.as_ref()?.remote_image_url()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.preview_url())
    }
}
