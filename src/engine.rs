//! Media engine capability: the two external operations the pipeline needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClipConfig;
use crate::error::AppError;
use crate::ffmpeg::discovery::{resolve_ffmpeg_path, resolve_ffprobe_path};
use crate::ffmpeg::{
    MediaProbe, ProgressCallback, build_extract_args, format_args_for_display, probe_media,
    run_ffmpeg,
};
use crate::window::ClipWindow;

#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Total playable duration in seconds. Fails with [`AppError::Probe`] for
    /// unreadable or non-media input.
    async fn probe_duration(&self, path: &Path) -> Result<f64, AppError>;

    /// Write exactly `window` of `source` to `output`. `source` is never modified.
    async fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: &ClipWindow,
        progress: Option<ProgressCallback>,
    ) -> Result<(), AppError>;
}

/// Subprocess-driven engine backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    probe_timeout: Duration,
    extraction_timeout: Duration,
}

impl FfmpegEngine {
    pub fn new(
        ffmpeg: PathBuf,
        ffprobe: PathBuf,
        probe_timeout: Duration,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            probe_timeout,
            extraction_timeout,
        }
    }

    /// Locate both binaries once; the engine keeps the resolved paths.
    pub fn discover(config: &ClipConfig) -> Result<Self, AppError> {
        let ffmpeg = resolve_ffmpeg_path(config.ffmpeg_path.as_deref())?;
        let ffprobe = resolve_ffprobe_path(&ffmpeg)?;
        log::info!(
            target: "autoclip::engine",
            "Using ffmpeg={}, ffprobe={}",
            ffmpeg.display(),
            ffprobe.display()
        );
        Ok(Self::new(
            ffmpeg,
            ffprobe,
            config.probe_timeout,
            config.extraction_timeout,
        ))
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub async fn probe(&self, path: &Path) -> Result<MediaProbe, AppError> {
        probe_media(&self.ffprobe, path, self.probe_timeout).await
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe_duration(&self, path: &Path) -> Result<f64, AppError> {
        Ok(self.probe(path).await?.duration)
    }

    async fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: &ClipWindow,
        progress: Option<ProgressCallback>,
    ) -> Result<(), AppError> {
        let args = build_extract_args(source, output, window);
        log::debug!(
            target: "autoclip::engine",
            "ffmpeg\n{}",
            format_args_for_display(&args)
        );

        let result = run_ffmpeg(
            &self.ffmpeg,
            args,
            f64::from(window.clip_duration_secs()),
            self.extraction_timeout,
            progress,
        )
        .await;

        if result.is_err() {
            match tokio::fs::remove_file(output).await {
                Ok(()) => log::debug!(
                    target: "autoclip::engine",
                    "Removed partial output {}",
                    output.display()
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!(
                    target: "autoclip::engine",
                    "Failed to remove partial output {}: {}",
                    output.display(),
                    e
                ),
            }
        }
        result
    }
}
