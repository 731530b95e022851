//! Flat output storage. Names are derived from wall-clock millis plus the
//! request id, so concurrent requests never collide and no lock is needed.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::AppError;

pub const OUTPUT_PREFIX: &str = "edited_";
pub const OUTPUT_EXTENSION: &str = "mp4";

/// `edited_<unix-millis>-<request-id>.mp4`
pub fn output_file_name(request_id: Uuid) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!(
        "{}{}-{}.{}",
        OUTPUT_PREFIX,
        millis,
        request_id.simple(),
        OUTPUT_EXTENSION
    )
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Fresh output path for one request. Does not touch the filesystem.
    pub fn output_path(&self, request_id: Uuid) -> PathBuf {
        self.dir.join(output_file_name(request_id))
    }
}
