//! Inline base64 images and the local media store
//!
//! Clients upload images as `data:image/<ext>;base64,<payload>` strings.
//! [`decode_data_uri`] turns such a string into raw bytes plus a file
//! extension, and [`MediaStorage`] writes them under the media root. The
//! database only ever stores the path relative to that root.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// A decoded image ready to be stored
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

fn extension_for(subtype: &str) -> Option<&'static str> {
    match subtype.to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Decode a `data:image/<ext>;base64,<payload>` string
pub fn decode_data_uri(
    field: &'static str,
    value: &str,
    max_bytes: usize,
) -> Result<DecodedImage, ApiError> {
    let rest = value
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| ApiError::validation(field, "Image must be a data:image/... URI"))?;

    let (subtype, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| ApiError::validation(field, "Image must be base64 encoded"))?;

    let extension = extension_for(subtype).ok_or_else(|| {
        ApiError::validation(field, format!("Unsupported image type: {}", subtype))
    })?;

    let payload = payload.trim();
    if payload.len() > max_bytes.div_ceil(3) * 4 {
        return Err(too_large(field, max_bytes));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::validation(field, "Image payload is not valid base64"))?;

    if bytes.is_empty() {
        return Err(ApiError::validation(field, "Image is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(too_large(field, max_bytes));
    }

    Ok(DecodedImage { extension, bytes })
}

fn too_large(field: &'static str, max_bytes: usize) -> ApiError {
    ApiError::validation(field, format!("Image exceeds {} bytes", max_bytes))
}

/// Filesystem storage for uploaded images
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an image under `subdir` and return its relative path
    pub async fn save(&self, subdir: &str, image: &DecodedImage) -> Result<String> {
        let relative = format!("{}/{}.{}", subdir, Uuid::new_v4(), image.extension);
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating media directory {}", parent.display()))?;
        }
        tokio::fs::write(&target, &image.bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        info!("Stored image {} ({} bytes)", relative, image.bytes.len());
        Ok(relative)
    }

    /// Remove a stored image. Failures are logged, never returned.
    pub async fn delete(&self, relative: &str) {
        let Some(target) = self.resolve(relative) else {
            warn!("Refusing to delete media outside the root: {}", relative);
            return;
        };

        if let Err(e) = tokio::fs::remove_file(&target).await {
            warn!("Failed to delete media file {}: {}", target.display(), e);
        }
    }

    /// Public URL of a stored image
    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative.trim_start_matches('/'))
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        path.components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn is_validation(result: Result<DecodedImage, ApiError>) -> bool {
        matches!(result, Err(ApiError::Validation { field: "image", .. }))
    }

    #[test]
    fn decodes_supported_types() {
        let image = decode_data_uri("image", &format!("data:image/png;base64,{}", PIXEL), 1024)
            .unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");

        let image = decode_data_uri("image", &format!("data:image/jpeg;base64,{}", PIXEL), 1024)
            .unwrap();
        assert_eq!(image.extension, "jpg");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(is_validation(decode_data_uri("image", PIXEL, 1024)));
        assert!(is_validation(decode_data_uri(
            "image",
            &format!("data:image/png,{}", PIXEL),
            1024
        )));
        assert!(is_validation(decode_data_uri(
            "image",
            &format!("data:image/svg+xml;base64,{}", PIXEL),
            1024
        )));
        assert!(is_validation(decode_data_uri(
            "image",
            "data:image/png;base64,@@@",
            1024
        )));
        assert!(is_validation(decode_data_uri(
            "image",
            "data:image/png;base64,",
            1024
        )));
    }

    #[test]
    fn rejects_oversized_images() {
        assert!(is_validation(decode_data_uri(
            "image",
            &format!("data:image/png;base64,{}", PIXEL),
            16
        )));
    }

    #[test]
    fn oversized_payload_is_rejected_before_decoding() {
        // Not valid base64, so only the length check can produce this message
        let payload = "!".repeat(64);
        match decode_data_uri("image", &format!("data:image/png;base64,{}", payload), 16) {
            Err(ApiError::Validation { message, .. }) => assert_eq!(message, "Image exceeds 16 bytes"),
            _ => panic!("expected a size error"),
        }
    }

    #[tokio::test]
    async fn saves_and_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");
        let image = DecodedImage {
            extension: "png",
            bytes: vec![1, 2, 3],
        };

        let relative = storage.save("recipes", &image).await.unwrap();
        assert!(relative.starts_with("recipes/"));
        assert!(relative.ends_with(".png"));

        let on_disk = dir.path().join(&relative);
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(storage.url(&relative), format!("/media/{}", relative));

        storage.delete(&relative).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn delete_ignores_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().join("media"), "/media");

        let outside = dir.path().join("keep.txt");
        tokio::fs::write(&outside, b"keep").await.unwrap();

        storage.delete("../keep.txt").await;
        assert!(outside.exists());
    }
}
