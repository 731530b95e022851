//! Upload orchestrator: probe → select window → extract → result.
//!
//! Every stage fails closed. The first error aborts the request and is returned
//! as-is; no stage is retried and no partial result is produced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ClipConfig;
use crate::engine::{FfmpegEngine, MediaEngine};
use crate::error::AppError;
use crate::ffmpeg::ProgressCallback;
use crate::platform::Platform;
use crate::storage::OutputStore;
use crate::window::{ClipWindow, OffsetSource, SecureOffsetSource, select_window};

pub const SUCCESS_MESSAGE: &str = "Video successfully edited!";

/// An uploaded file at rest plus its target platform. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMedia {
    path: PathBuf,
    platform: Platform,
}

impl SourceMedia {
    pub fn new(path: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            path: path.into(),
            platform,
        }
    }

    /// Validate raw boundary input (stored path + platform string).
    pub fn from_request(path: impl Into<PathBuf>, platform: Option<&str>) -> Result<Self, AppError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(AppError::validation("No video file was provided."));
        }
        let platform = platform
            .ok_or_else(|| AppError::validation("Platform is required (youtube or instagram)."))?
            .parse::<Platform>()?;
        Ok(Self::new(path, platform))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    output_path: PathBuf,
    platform: Platform,
    window: ClipWindow,
    source_duration: f64,
}

impl ExtractionResult {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// File name only; the storage location stays internal.
    pub fn output_file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn clip_duration_secs(&self) -> u32 {
        self.window.clip_duration_secs()
    }

    pub fn start_offset_secs(&self) -> u64 {
        self.window.start_offset_secs()
    }

    pub fn source_duration(&self) -> f64 {
        self.source_duration
    }
}

/// Outbound success shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipResponse {
    pub message: String,
    pub platform: Platform,
    pub clip_duration: String,
    pub start_time: String,
    pub edited_video: String,
}

impl From<&ExtractionResult> for ClipResponse {
    fn from(result: &ExtractionResult) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            platform: result.platform(),
            clip_duration: format!("{} seconds", result.clip_duration_secs()),
            start_time: format!("{} seconds", result.start_offset_secs()),
            edited_video: result.output_file_name(),
        }
    }
}

/// Shared by all requests; holds only immutable collaborators.
pub struct ClipPipeline {
    engine: Arc<dyn MediaEngine>,
    offsets: Arc<dyn OffsetSource>,
    store: OutputStore,
    min_start_secs: u64,
}

impl ClipPipeline {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        offsets: Arc<dyn OffsetSource>,
        store: OutputStore,
        min_start_secs: u64,
    ) -> Self {
        Self {
            engine,
            offsets,
            store,
            min_start_secs,
        }
    }

    /// Production wiring: discovered FFmpeg, OS CSPRNG, configured storage.
    pub fn from_config(config: &ClipConfig) -> Result<Self, AppError> {
        let engine = FfmpegEngine::discover(config)?;
        Ok(Self::new(
            Arc::new(engine),
            Arc::new(SecureOffsetSource),
            OutputStore::new(&config.storage_dir),
            config.min_start_secs,
        ))
    }

    pub fn min_start_secs(&self) -> u64 {
        self.min_start_secs
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub async fn probe_duration(&self, path: &Path) -> Result<f64, AppError> {
        self.engine.probe_duration(path).await
    }

    pub async fn process(&self, media: &SourceMedia) -> Result<ExtractionResult, AppError> {
        self.process_with_progress(media, None).await
    }

    pub async fn process_with_progress(
        &self,
        media: &SourceMedia,
        progress: Option<ProgressCallback>,
    ) -> Result<ExtractionResult, AppError> {
        let request_id = Uuid::new_v4();
        let result = self.run_stages(request_id, media, progress).await;
        if let Err(ref err) = result {
            log::warn!(
                target: "autoclip::pipeline",
                "[{}] failed ({:?}): {}",
                request_id,
                err.kind(),
                err
            );
        }
        result
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        media: &SourceMedia,
        progress: Option<ProgressCallback>,
    ) -> Result<ExtractionResult, AppError> {
        log::info!(
            target: "autoclip::pipeline",
            "[{}] processing platform={}, input={}",
            request_id,
            media.platform(),
            media.path().display()
        );

        let total_duration = self.engine.probe_duration(media.path()).await?;
        log::debug!(
            target: "autoclip::pipeline",
            "[{}] probed duration={:.3}s",
            request_id,
            total_duration
        );

        let window = select_window(
            total_duration,
            media.platform(),
            self.min_start_secs,
            self.offsets.as_ref(),
        )?;
        log::info!(
            target: "autoclip::pipeline",
            "[{}] window start={}s, clip={}s",
            request_id,
            window.start_offset_secs(),
            window.clip_duration_secs()
        );

        self.store.ensure_dir().await?;
        let output_path = self.store.output_path(request_id);
        self.engine
            .extract_segment(media.path(), &output_path, &window, progress)
            .await?;

        log::info!(
            target: "autoclip::pipeline",
            "[{}] wrote {}",
            request_id,
            output_path.display()
        );
        Ok(ExtractionResult {
            output_path,
            platform: media.platform(),
            window,
            source_duration: total_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixedOffsetSource, ScriptedEngine};
    use std::collections::HashSet;

    fn pipeline(engine: Arc<ScriptedEngine>, offsets: FixedOffsetSource, dir: &Path) -> ClipPipeline {
        ClipPipeline::new(engine, Arc::new(offsets), OutputStore::new(dir), 30)
    }

    #[test]
    fn from_request_validates_platform_and_path() {
        let ok = SourceMedia::from_request("uploads/abc", Some("YouTube")).unwrap();
        assert_eq!(ok.platform(), Platform::YouTube);

        assert!(matches!(
            SourceMedia::from_request("uploads/abc", None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SourceMedia::from_request("uploads/abc", Some("vimeo")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SourceMedia::from_request("", Some("youtube")),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn successful_run_shapes_response() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(300.0));
        let p = pipeline(Arc::clone(&engine), FixedOffsetSource::new(42), dir.path());

        let media = SourceMedia::new(dir.path().join("upload.bin"), Platform::Instagram);
        let result = p.process(&media).await.expect("process");

        assert_eq!(result.clip_duration_secs(), 60);
        assert_eq!(result.start_offset_secs(), 42);
        assert_eq!(result.source_duration(), 300.0);
        assert!(result.output_path().exists());
        assert_eq!(result.output_path().parent(), Some(dir.path()));

        let response = ClipResponse::from(&result);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["message"], "Video successfully edited!");
        assert_eq!(json["platform"], "instagram");
        assert_eq!(json["clipDuration"], "60 seconds");
        assert_eq!(json["startTime"], "42 seconds");
        let name = json["editedVideo"].as_str().unwrap();
        assert!(name.starts_with("edited_") && name.ends_with(".mp4"));
        assert!(!name.contains('/'));

        let calls = engine.extract_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source, media.path());
        assert_eq!(calls[0].start, 42);
        assert_eq!(calls[0].clip, 60);
    }

    #[tokio::test]
    async fn youtube_marginal_video_fails_before_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(200.0));
        let p = pipeline(Arc::clone(&engine), FixedOffsetSource::lowest(), dir.path());

        let err = p
            .process(&SourceMedia::new("in.mp4", Platform::YouTube))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientDuration {
                clip_duration: 180,
                ..
            }
        ));
        assert!(engine.extract_calls().is_empty());
        assert_eq!(engine.probe_count(), 1);
    }

    #[tokio::test]
    async fn short_instagram_video_fails_with_single_probe() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(45.0));
        let p = pipeline(Arc::clone(&engine), FixedOffsetSource::lowest(), dir.path());

        let err = p
            .process(&SourceMedia::new("in.mp4", Platform::Instagram))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientDuration);
        assert_eq!(engine.probe_count(), 1);
        assert!(engine.extract_calls().is_empty());
        assert!(
            std::fs::read_dir(dir.path()).unwrap().next().is_none(),
            "no output may be written"
        );
    }

    #[tokio::test]
    async fn probe_failure_halts_pipeline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::probe_fails("Invalid data found when processing input"));
        let offsets = FixedOffsetSource::lowest();
        let p = ClipPipeline::new(
            engine.clone(),
            Arc::new(offsets.clone()),
            OutputStore::new(dir.path()),
            30,
        );

        let err = p
            .process(&SourceMedia::new("notes.txt", Platform::Instagram))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Probe(_)));
        assert_eq!(offsets.last_range(), None, "window selection must not run");
        assert!(engine.extract_calls().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_is_surfaced_without_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(300.0).extract_fails(1, "disk full"));
        let p = pipeline(Arc::clone(&engine), FixedOffsetSource::lowest(), dir.path());

        let err = p
            .process(&SourceMedia::new("in.mp4", Platform::Instagram))
            .await
            .unwrap_err();
        match err {
            AppError::Extraction { code, ref stderr } => {
                assert_eq!(code, 1);
                assert_eq!(stderr, "disk full");
            }
            ref other => panic!("expected Extraction, got {:?}", other),
        }
        assert_eq!(engine.extract_calls().len(), 1, "no retry");
    }

    #[tokio::test]
    async fn concurrent_requests_get_distinct_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(600.0));
        let p = Arc::new(ClipPipeline::new(
            engine,
            Arc::new(SecureOffsetSource),
            OutputStore::new(dir.path()),
            30,
        ));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let p = Arc::clone(&p);
            handles.push(tokio::spawn(async move {
                p.process(&SourceMedia::new("same.mp4", Platform::YouTube))
                    .await
            }));
        }

        let mut names = HashSet::new();
        for handle in handles {
            let result = handle.await.expect("join").expect("process");
            assert!(result.start_offset_secs() >= 30);
            assert!(result.start_offset_secs() + 180 <= 600);
            names.insert(result.output_file_name());
        }
        assert_eq!(names.len(), 16);
    }

    #[tokio::test]
    async fn progress_callback_is_forwarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(ScriptedEngine::with_duration(300.0));
        let p = pipeline(engine, FixedOffsetSource::lowest(), dir.path());

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |v: f64| sink.lock().push(v));
        p.process_with_progress(&SourceMedia::new("in.mp4", Platform::Instagram), Some(cb))
            .await
            .expect("process");
        assert_eq!(seen.lock().last().copied(), Some(1.0));
    }
}
