// Upload classification and on-disk naming rules

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Broad media category an upload falls into, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        extension(name).and_then(|ext| Self::from_extension(&ext))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// Lower-cased final extension, if the name has one
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the name carries one of the accepted upload extensions
pub fn is_allowed(name: &str) -> bool {
    MediaKind::from_filename(name).is_some()
}

/// Reduce a client-supplied filename to a safe single path component.
/// Path separators are stripped, whitespace becomes '_', anything outside
/// ASCII alphanumerics plus '.', '-', '_' is dropped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            out.push(c);
        } else if c.is_whitespace() {
            out.push('_');
        }
    }
    out.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Names assigned to one accepted upload: the unique name it is stored
/// under and the name its processed result will carry. Video results are
/// always re-encoded as mp4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub id: Uuid,
    pub kind: MediaKind,
    pub upload_name: String,
    pub output_name: String,
}

impl StoredUpload {
    pub fn for_original(original: &str) -> Result<Self> {
        let sanitized = sanitize_filename(original);
        let ext = extension(&sanitized)
            .ok_or_else(|| Error::UnsupportedMedia(original.to_string()))?;
        let kind = MediaKind::from_extension(&ext)
            .ok_or_else(|| Error::UnsupportedMedia(original.to_string()))?;

        let id = Uuid::new_v4();
        let upload_name = format!("{}_{}", id, sanitized);
        let output_name = match kind {
            MediaKind::Video => format!("processed_{}.mp4", id),
            MediaKind::Image => format!("processed_{}.{}", id, ext),
        };

        Ok(Self {
            id,
            kind,
            upload_name,
            output_name,
        })
    }
}
