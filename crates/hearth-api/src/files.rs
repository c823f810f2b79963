//! Profile photo storage
//!
//! Disk-backed file store. Content types outside the allow-list are
//! rejected before anything touches the disk.

use async_trait::async_trait;
use hearth_core::{FileError, FileStore};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Accepted profile photo content types
pub const ALLOWED_PHOTO_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn sanitize_hint(hint: &str) -> String {
    hint.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Stores files under a base directory
#[derive(Debug, Clone)]
pub struct DiskFileStore {
    base_dir: PathBuf,
}

impl DiskFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn save(
        &self,
        bytes: &[u8],
        content_type: &str,
        name_hint: &str,
    ) -> Result<String, FileError> {
        let ext = extension_for(content_type).ok_or_else(|| {
            FileError::UnsupportedMediaType(format!(
                "Invalid file type {content_type}. Only JPEG, PNG, and GIF are allowed."
            ))
        })?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FileError::Io(e.to_string()))?
            .as_secs();
        let filename = format!("{}_{stamp}.{ext}", sanitize_hint(name_hint));
        let path = self.base_dir.join(&filename);

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| FileError::Io(e.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| FileError::Io(e.to_string()))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "profile photo stored");

        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/gif"), Some("gif"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for("text/html"), None);
    }

    #[test]
    fn test_sanitize_hint() {
        assert_eq!(sanitize_hint("user@example.com"), "user_example_com");
        assert_eq!(sanitize_hint("plain123"), "plain123");
    }

    #[tokio::test]
    async fn test_rejects_disallowed_type_before_touching_disk() {
        let store = DiskFileStore::new("/nonexistent/should/not/be/created");
        let err = store
            .save(b"data", "application/octet-stream", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::UnsupportedMediaType(_)));
    }
}
