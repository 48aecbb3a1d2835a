//! Uploaded video staging
//!
//! An uploaded file lives in memory until analysis; playback goes through a
//! staging file on disk exposed as a `file://` locator. The staging file is
//! deleted when its locator is dropped, so superseding an upload releases
//! the previous one.

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use tempfile::NamedTempFile;
use url::Url;

/// An uploaded video file held in memory
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    file_name: String,
    media_type: String,
    bytes: Bytes,
}

impl UploadedVideo {
    /// Wrap a file's name and content
    ///
    /// The media type is derived from the file extension; unknown extensions
    /// get `application/octet-stream` and fail [`is_video`](Self::is_video).
    pub fn new(file_name: impl Into<String>, bytes: Bytes) -> Self {
        let file_name = file_name.into();
        let media_type = media_type_for(&file_name);
        Self {
            file_name,
            media_type,
            bytes,
        }
    }

    /// Read a file from disk into an upload
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, Bytes::from(bytes)))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
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

    /// Whether the media type marks this file as video
    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// Map a file name to a media type by extension
fn media_type_for(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let media = match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mpg") | Some("mpeg") => "video/mpeg",
        Some("ts") => "video/mp2t",
        Some("flv") => "video/x-flv",
        Some("wmv") => "video/x-ms-wmv",
        Some("3gp") => "video/3gpp",
        Some("ogv") => "video/ogg",
        _ => "application/octet-stream",
    };
    media.to_string()
}

/// Locally issued playback locator for an uploaded video
///
/// Owns the staging file; dropping the locator deletes it.
#[derive(Debug)]
pub struct PlaybackLocator {
    url: Url,
    staging: NamedTempFile,
}

impl PlaybackLocator {
    /// Write the video to a staging file and build its `file://` locator
    pub fn stage(video: &UploadedVideo) -> std::io::Result<Self> {
        let mut staging = tempfile::Builder::new()
            .prefix("sentry-upload-")
            .suffix(&staging_suffix(video.file_name()))
            .tempfile()?;
        staging.write_all(video.bytes())?;
        staging.flush()?;

        let url = Url::from_file_path(staging.path()).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "staging path is not absolute",
            )
        })?;

        Ok(Self { url, staging })
    }

    /// The `file://` URL of the staging file
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Filesystem path of the staging file
    pub fn path(&self) -> &Path {
        self.staging.path()
    }
}

/// Keep the original extension so players recognize the container format
fn staging_suffix(file_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{}", ext),
        None => String::new(),
    }
}
