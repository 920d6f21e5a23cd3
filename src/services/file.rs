use log::info;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Transient storage for uploaded documents.
#[derive(Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
}

impl UploadStore {
    pub fn new(upload_dir: PathBuf) -> Self {
        Self { upload_dir }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Creates the upload directory if missing. Safe to call repeatedly.
    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        info!("Upload directory ready: {:?}", self.upload_dir);
        Ok(())
    }

    /// Stores `bytes` under a collision-free name derived from `original_name`.
    /// Returns `None` if the name has nothing usable left after sanitizing.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<Option<PathBuf>> {
        let Some(clean) = sanitize_filename(original_name) else {
            return Ok(None);
        };

        let path = self
            .upload_dir
            .join(format!("{}-{}", Uuid::new_v4().simple(), clean));
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;

        info!("Saved upload {:?} ({} bytes) to {:?}", original_name, bytes.len(), path);
        Ok(Some(path))
    }
}

/// Keeps only the last path component of a client supplied file name and
/// replaces anything outside `[A-Za-z0-9._-]` with `_`. Only a name that is
/// empty after that is rejected, so non-ASCII names survive as underscores.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
