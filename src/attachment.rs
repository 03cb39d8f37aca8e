use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image picked by the user, kept as a data URI so it can be shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    /// `data:<mime>;base64,<payload>`, or a bare payload.
    pub data: String,
}

impl Attachment {
    /// Base64 payload ready for the wire, without any data-URI prefix.
    pub fn payload(&self) -> &str {
        strip_data_uri_prefix(&self.data)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a supported image file")]
    UnsupportedType(PathBuf),
}

/// Returns whatever follows the first comma, or the input when there is no
/// comma or nothing after it. Base64 never contains a comma, so a stripped
/// payload comes back unchanged.
pub fn strip_data_uri_prefix(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => data,
    }
}

/// Maps a file extension to an image MIME type. Anything else is rejected,
/// mirroring an `image/*` picker filter.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}

pub async fn encode_file(path: impl AsRef<Path>) -> Result<Attachment, AttachmentError> {
    let path = path.as_ref();
    let mime_type =
        image_mime_type(path).ok_or_else(|| AttachmentError::UnsupportedType(path.to_path_buf()))?;

    let bytes = tokio::fs::read(path).await.map_err(|source| AttachmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), mime_type, "encoded attachment");

    Ok(Attachment {
        mime_type: mime_type.to_string(),
        data: format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(bytes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_data_uri_prefix("data:image/png;base64,iVBORw0"), "iVBORw0");
    }

    #[test]
    fn test_strip_prefix_is_idempotent() {
        let once = strip_data_uri_prefix("data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(strip_data_uri_prefix(once), once);
        assert_eq!(strip_data_uri_prefix("/9j/4AAQ"), "/9j/4AAQ");
    }

    #[test]
    fn test_strip_prefix_with_nothing_after_comma() {
        assert_eq!(strip_data_uri_prefix("data:image/png;base64,"), "data:image/png;base64,");
    }

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("scan.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("contract.png")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("contract.pdf")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_encode_file_produces_data_uri() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"hello").unwrap();

        let att = encode_file(&path).await.unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.data, "data:image/png;base64,aGVsbG8=");
        assert_eq!(att.payload(), "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_encode_file_rejects_non_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let err = encode_file(&path).await.unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_encode_missing_file() {
        let dir = tempdir().unwrap();
        let err = encode_file(dir.path().join("missing.png")).await.unwrap_err();
        assert!(matches!(err, AttachmentError::Io { .. }));
    }
}
