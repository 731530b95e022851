#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use autoclip_core::config::ClipConfig;
use autoclip_core::engine::FfmpegEngine;
use autoclip_core::pipeline::ClipPipeline;
use autoclip_core::storage::OutputStore;
use autoclip_core::window::SecureOffsetSource;

pub struct IntegrationEnv {
    pub engine: FfmpegEngine,
    dir: tempfile::TempDir,
}

impl IntegrationEnv {
    pub fn new() -> Self {
        let config = ClipConfig {
            probe_timeout: Duration::from_secs(30),
            extraction_timeout: Duration::from_secs(120),
            ..ClipConfig::default()
        };
        let engine = FfmpegEngine::discover(&config).expect("FFmpeg not found");
        let dir = tempfile::tempdir().expect("tempdir");
        Self { engine, dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.path("clips")
    }

    pub fn pipeline(&self) -> ClipPipeline {
        ClipPipeline::new(
            Arc::new(self.engine.clone()),
            Arc::new(SecureOffsetSource),
            OutputStore::new(self.storage_dir()),
            30,
        )
    }

    /// Files currently in the storage directory (empty if it was never created).
    pub fn stored_outputs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.storage_dir()) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn with_test_video(&self, input_name: &str, duration_secs: f32) -> PathBuf {
        let output_path = self.path(input_name);
        let status = create_test_video(self.engine.ffmpeg_path(), &output_path, duration_secs)
            .expect("failed to create test video");
        assert!(status.success(), "ffmpeg failed to create test video");
        output_path
    }
}

/// Small, fast-to-encode source: low resolution and frame rate, one sine audio track.
pub fn create_test_video(
    ffmpeg: &Path,
    output_path: &Path,
    duration_secs: f32,
) -> std::io::Result<ExitStatus> {
    let duration_arg = format!("{}", duration_secs);
    Command::new(ffmpeg)
        .args([
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration={}:size=160x120:rate=10", duration_arg),
            "-f",
            "lavfi",
            "-i",
            &format!("sine=frequency=440:duration={}", duration_arg),
            "-c:v",
            "mpeg4",
            "-c:a",
            "aac",
            "-shortest",
            output_path.to_string_lossy().as_ref(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}
