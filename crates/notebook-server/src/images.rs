//! Uploaded product images on local disk.

use std::path::{Path, PathBuf};

use notebook_commerce::catalog::is_uploaded_image;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Most files accepted by one batch upload.
pub const MAX_BATCH_IMAGES: usize = 5;

/// URL prefix the images directory is served under.
pub const IMAGES_URL_PREFIX: &str = "/uploads/images/";

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// A file written by [`ImageStore::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub url: String,
}

/// Writes uploads into `<uploads_dir>/images`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Create the images directory under `uploads_dir` if needed.
    pub fn open(uploads_dir: &Path) -> std::io::Result<Self> {
        let dir = uploads_dir.join("images");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store one uploaded file.
    pub async fn save(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredImage, ApiError> {
        let ext = image_extension(original_name, content_type).ok_or_else(|| {
            ApiError::bad_request("Only image files are allowed (jpeg, jpg, png, gif, webp)")
        })?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::bad_request("File too large, the limit is 5MB"));
        }

        let filename = unique_filename(&ext);
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::internal(format!("failed to write {}: {e}", path.display())))?;
        debug!(file = %filename, size = bytes.len(), "Stored upload");

        Ok(StoredImage {
            url: format!("{IMAGES_URL_PREFIX}{filename}"),
            filename,
            original_name: original_name.to_string(),
            size: bytes.len(),
        })
    }

    /// Remove the file behind an image URL. Only managed uploads are
    /// touched; failures are logged.
    pub async fn delete_by_url(&self, url: &str) {
        if !is_uploaded_image(url) {
            return;
        }
        let Some(name) = Path::new(url).file_name() else {
            return;
        };
        let path = self.dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(file = %path.display(), "Deleted upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to delete upload"),
        }
    }
}

/// Extension to store under, if the upload is an accepted image type.
///
/// Both the file extension and the declared MIME type must be images.
fn image_extension(original_name: &str, content_type: Option<&str>) -> Option<String> {
    let ext = Path::new(original_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    match content_type {
        Some(mime) => {
            let subtype = mime.strip_prefix("image/")?;
            ALLOWED_EXTENSIONS.contains(&subtype).then_some(ext)
        }
        None => Some(ext),
    }
}

fn unique_filename(ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("image-{millis}-{suffix}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("photo.JPG", Some("image/jpeg")).as_deref(), Some("jpg"));
        assert_eq!(image_extension("photo.webp", None).as_deref(), Some("webp"));
        assert!(image_extension("notes.txt", Some("text/plain")).is_none());
        assert!(image_extension("fake.png", Some("application/pdf")).is_none());
        assert!(image_extension("no-extension", Some("image/png")).is_none());
    }

    #[test]
    fn test_unique_filename_shape() {
        let name = unique_filename("png");
        assert!(name.starts_with("image-"));
        assert!(name.ends_with(".png"));
        assert_ne!(unique_filename("png"), unique_filename("png"));
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();

        let stored = store.save("laptop.png", Some("image/png"), b"\x89PNG").await.unwrap();
        assert!(stored.url.starts_with(IMAGES_URL_PREFIX));
        assert_eq!(stored.original_name, "laptop.png");
        assert_eq!(stored.size, 4);
        assert!(store.dir().join(&stored.filename).exists());

        store.delete_by_url(&stored.url).await;
        assert!(!store.dir().join(&stored.filename).exists());
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();

        assert!(store.save("doc.pdf", Some("application/pdf"), b"%PDF").await.is_err());
        assert!(store.save("empty.png", Some("image/png"), b"").await.is_err());

        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(store.save("big.png", Some("image/png"), &big).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_ignores_external_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();
        let keep = store.dir().join("keep.png");
        std::fs::write(&keep, b"x").unwrap();

        store.delete_by_url("https://cdn.example.com/keep.png").await;
        assert!(keep.exists());
    }
}
