//! Deterministic stand-ins for the random offset source and the media engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::MediaEngine;
use crate::error::AppError;
use crate::ffmpeg::ProgressCallback;
use crate::window::{ClipWindow, OffsetSource};

#[derive(Debug, Clone, Copy)]
enum Choice {
    Lowest,
    Highest,
    Value(u64),
}

/// Offset source with a fixed answer. Records the last range it was asked for;
/// clones share the record.
#[derive(Debug, Clone)]
pub struct FixedOffsetSource {
    choice: Choice,
    last_range: Arc<Mutex<Option<(u64, u64)>>>,
}

impl FixedOffsetSource {
    fn with_choice(choice: Choice) -> Self {
        Self {
            choice,
            last_range: Arc::new(Mutex::new(None)),
        }
    }

    /// Always returns `value`, even when outside the requested range.
    pub fn new(value: u64) -> Self {
        Self::with_choice(Choice::Value(value))
    }

    pub fn lowest() -> Self {
        Self::with_choice(Choice::Lowest)
    }

    pub fn highest() -> Self {
        Self::with_choice(Choice::Highest)
    }

    pub fn last_range(&self) -> Option<(u64, u64)> {
        *self.last_range.lock()
    }
}

impl OffsetSource for FixedOffsetSource {
    fn pick(&self, min: u64, max: u64) -> Result<u64, AppError> {
        *self.last_range.lock() = Some((min, max));
        Ok(match self.choice {
            Choice::Lowest => min,
            Choice::Highest => max,
            Choice::Value(v) => v,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractCall {
    pub source: PathBuf,
    pub output: PathBuf,
    pub start: u64,
    pub clip: u32,
}

#[derive(Debug, Clone)]
enum ProbeScript {
    Duration(f64),
    Fail(String),
}

/// Engine that answers probes from a script and "extracts" by writing an empty file.
#[derive(Debug)]
pub struct ScriptedEngine {
    probe: ProbeScript,
    extract_failure: Option<(i32, String)>,
    probes: Mutex<usize>,
    extracts: Mutex<Vec<ExtractCall>>,
}

impl ScriptedEngine {
    fn from_probe(probe: ProbeScript) -> Self {
        Self {
            probe,
            extract_failure: None,
            probes: Mutex::new(0),
            extracts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_duration(seconds: f64) -> Self {
        Self::from_probe(ProbeScript::Duration(seconds))
    }

    pub fn probe_fails(message: impl Into<String>) -> Self {
        Self::from_probe(ProbeScript::Fail(message.into()))
    }

    pub fn extract_fails(mut self, code: i32, stderr: impl Into<String>) -> Self {
        self.extract_failure = Some((code, stderr.into()));
        self
    }

    pub fn probe_count(&self) -> usize {
        *self.probes.lock()
    }

    pub fn extract_calls(&self) -> Vec<ExtractCall> {
        self.extracts.lock().clone()
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, AppError> {
        *self.probes.lock() += 1;
        match &self.probe {
            ProbeScript::Duration(d) => Ok(*d),
            ProbeScript::Fail(msg) => Err(AppError::probe(msg.clone())),
        }
    }

    async fn extract_segment(
        &self,
        source: &Path,
        output: &Path,
        window: &ClipWindow,
        progress: Option<ProgressCallback>,
    ) -> Result<(), AppError> {
        self.extracts.lock().push(ExtractCall {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            start: window.start_offset_secs(),
            clip: window.clip_duration_secs(),
        });
        if let Some((code, stderr)) = &self.extract_failure {
            return Err(AppError::extraction_failed(*code, stderr.clone()));
        }
        tokio::fs::write(output, b"").await?;
        if let Some(cb) = progress {
            cb(1.0);
        }
        Ok(())
    }
}
