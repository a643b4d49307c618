//! Typed file access over the session's virtual filesystem.
//!
//! Games and packs ask for a file together with the shape they want back:
//!
//! | Kind    | Result                                   |
//! |---------|------------------------------------------|
//! | `raw`   | shared bytes                             |
//! | `text`  | UTF-8 text (invalid sequences replaced)  |
//! | `json`  | parsed `serde_json::Value`               |
//! | `image` | [`MediaHandle`] with an inferred MIME    |
//! | `audio` | [`MediaHandle`] with an inferred MIME    |
//! | `video` | [`MediaHandle`] with an inferred MIME    |
//!
//! Kind names are matched case-insensitively; unknown names fall back to
//! raw bytes.

use crate::error::{Error, Result};
use crate::vfs::Vfs;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Requested shape of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    /// Raw bytes.
    #[default]
    Raw,
    /// Decoded text.
    Text,
    /// Parsed JSON.
    Json,
    /// Image handle.
    Image,
    /// Audio handle.
    Audio,
    /// Video handle.
    Video,
}

impl FileKind {
    /// Parses a kind name. Unknown names yield [`FileKind::Raw`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "json" => Self::Json,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            _ => Self::Raw,
        }
    }

    fn media(&self) -> Option<MediaKind> {
        match self {
            Self::Image => Some(MediaKind::Image),
            Self::Audio => Some(MediaKind::Audio),
            Self::Video => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Category of a media handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Infers a MIME type from a path's extension.
    pub fn infer_mime(&self, path: &str) -> &'static str {
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match (self, ext.as_str()) {
            (Self::Image, "svg") => "image/svg+xml",
            (Self::Image, "jpg" | "jpeg") => "image/jpeg",
            (Self::Image, _) => "image/png",
            (Self::Audio, "wav") => "audio/wav",
            (Self::Audio, "ogg") => "audio/ogg",
            (Self::Audio, _) => "audio/mpeg",
            (Self::Video, "webm") => "video/webm",
            (Self::Video, _) => "video/mp4",
        }
    }
}

/// Media bytes tagged with their kind and MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub kind: MediaKind,
    pub mime: &'static str,
    pub data: Arc<[u8]>,
}

impl MediaHandle {
    /// Renders the handle as a `data:` URL usable as an element source.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.data))
    }
}

/// A file in the requested shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FileValue {
    Bytes(Arc<[u8]>),
    Text(String),
    Json(serde_json::Value),
    Media(MediaHandle),
}

/// Read-only typed access to a session's files.
#[derive(Debug, Clone)]
pub struct FileAccessor {
    vfs: Arc<Vfs>,
}

impl FileAccessor {
    /// Creates an accessor over `vfs`.
    pub fn new(vfs: Arc<Vfs>) -> Self {
        Self { vfs }
    }

    /// Checks whether a file exists.
    pub fn exists(&self, path: &str) -> bool {
        self.vfs.exists(path)
    }

    /// Reads raw bytes.
    pub fn read(&self, path: &str) -> Result<Arc<[u8]>> {
        self.vfs.read_file(path)
    }

    /// Reads text.
    pub fn text(&self, path: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.read(path)?).into_owned())
    }

    /// Reads and deserializes JSON.
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        serde_json::from_slice(&self.read(path)?)
            .map_err(|e| Error::Serialization(format!("{}: {}", path, e)))
    }

    /// Reads a file in the requested shape.
    pub fn get(&self, path: &str, kind: FileKind) -> Result<FileValue> {
        if let Some(media) = kind.media() {
            return Ok(FileValue::Media(MediaHandle {
                kind: media,
                mime: media.infer_mime(path),
                data: self.read(path)?,
            }));
        }

        match kind {
            FileKind::Text => self.text(path).map(FileValue::Text),
            FileKind::Json => self.json(path).map(FileValue::Json),
            _ => self.read(path).map(FileValue::Bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(FileKind::from_name("TEXT"), FileKind::Text);
        assert_eq!(FileKind::from_name("Json"), FileKind::Json);
        assert_eq!(FileKind::from_name("image"), FileKind::Image);
        assert_eq!(FileKind::from_name("binary"), FileKind::Raw);
    }

    #[test]
    fn test_mime_inference() {
        assert_eq!(MediaKind::Image.infer_mime("/a/logo.SVG"), "image/svg+xml");
        assert_eq!(MediaKind::Image.infer_mime("/a/photo.jpeg"), "image/jpeg");
        assert_eq!(MediaKind::Image.infer_mime("/a/sprite.gif"), "image/png");
        assert_eq!(MediaKind::Audio.infer_mime("/a/hit.wav"), "audio/wav");
        assert_eq!(MediaKind::Audio.infer_mime("/a/theme.ogg"), "audio/ogg");
        assert_eq!(MediaKind::Audio.infer_mime("/a/theme.mp3"), "audio/mpeg");
        assert_eq!(MediaKind::Video.infer_mime("/a/intro.webm"), "video/webm");
        assert_eq!(MediaKind::Video.infer_mime("/a/intro.mov"), "video/mp4");
    }

    #[test]
    fn test_data_url() {
        let handle = MediaHandle {
            kind: MediaKind::Image,
            mime: "image/png",
            data: Arc::from(&b"abc"[..]),
        };
        assert_eq!(handle.to_data_url(), "data:image/png;base64,YWJj");
    }
}
