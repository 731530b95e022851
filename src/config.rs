//! Runtime configuration. Defaults, overridden by environment, overridden by CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::window::DEFAULT_MIN_START_SECS;

pub const ENV_STORAGE_DIR: &str = "AUTOCLIP_STORAGE_DIR";
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const ENV_PROBE_TIMEOUT_SECS: &str = "AUTOCLIP_PROBE_TIMEOUT_SECS";
pub const ENV_EXTRACT_TIMEOUT_SECS: &str = "AUTOCLIP_EXTRACT_TIMEOUT_SECS";
pub const ENV_MIN_START_SECS: &str = "AUTOCLIP_MIN_START_SECS";

const DEFAULT_STORAGE_DIR: &str = "uploads";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct ClipConfig {
    /// Flat directory that receives `edited_*.mp4` outputs.
    pub storage_dir: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    pub probe_timeout: Duration,
    pub extraction_timeout: Duration,
    pub min_start_secs: u64,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            ffmpeg_path: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            extraction_timeout: DEFAULT_EXTRACT_TIMEOUT,
            min_start_secs: DEFAULT_MIN_START_SECS,
        }
    }
}

impl ClipConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_STORAGE_DIR) {
            config.storage_dir = PathBuf::from(dir);
        }
        config.ffmpeg_path = get(ENV_FFMPEG_PATH).map(PathBuf::from);
        if let Some(v) = get(ENV_PROBE_TIMEOUT_SECS) {
            config.probe_timeout = parse_timeout(ENV_PROBE_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = get(ENV_EXTRACT_TIMEOUT_SECS) {
            config.extraction_timeout = parse_timeout(ENV_EXTRACT_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = get(ENV_MIN_START_SECS) {
            config.min_start_secs = parse_u64(ENV_MIN_START_SECS, &v)?;
        }
        Ok(config)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, AppError> {
    value.trim().parse::<u64>().map_err(|_| {
        AppError::validation(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))
    })
}

fn parse_timeout(key: &str, value: &str) -> Result<Duration, AppError> {
    match parse_u64(key, value)? {
        0 => Err(AppError::validation(format!("{} must be greater than zero", key))),
        secs => Ok(Duration::from_secs(secs)),
    }
}
