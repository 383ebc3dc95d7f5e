use std::path::Path;

use reqwest::multipart::Part;
use tracing::debug;

use crate::error::UploadError;

/// An image file held in memory, ready to be sent as the `file` form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime: mime_for(file_name),
            bytes,
        }
    }

    /// Read an image from disk, refusing empty files and files over `limit` bytes.
    pub async fn from_path(path: &Path, limit: u64) -> Result<Self, UploadError> {
        let io_err = |source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        if size > limit {
            return Err(UploadError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }
        if size == 0 {
            return Err(UploadError::Empty(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!(file = %file_name, size, "loaded image");
        Ok(Self::from_bytes(&file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn part(&self) -> Result<Part, reqwest::Error> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("expirylens-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for("label.JPG"), "image/jpeg");
        assert_eq!(mime_for("label.jpeg"), "image/jpeg");
        assert_eq!(mime_for("label.png"), "image/png");
        assert_eq!(mime_for("label"), "application/octet-stream");
    }

    #[tokio::test]
    async fn loads_file_within_limit() {
        let path = temp_file("ok.jpg", b"\xff\xd8\xff\xe0fake");
        let upload = ImageUpload::from_path(&path, 1024).await.unwrap();
        assert_eq!(upload.file_name(), "ok.jpg");
        assert_eq!(upload.mime(), "image/jpeg");
        assert_eq!(upload.len(), 8);
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let path = temp_file("big.jpg", &[0u8; 64]);
        let err = ImageUpload::from_path(&path, 32).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 64, limit: 32, .. }));
    }

    #[tokio::test]
    async fn rejects_empty_file() {
        let path = temp_file("empty.jpg", b"");
        let err = ImageUpload::from_path(&path, 32).await.unwrap_err();
        assert!(matches!(err, UploadError::Empty(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = ImageUpload::from_path(Path::new("/nonexistent/label.jpg"), 32)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }
}
