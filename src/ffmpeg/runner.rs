//! FFmpeg process spawning and progress parsing.
//!
//! Spawns FFmpeg as a child process on the tokio runtime, parses progress from
//! stdout (pipe:1) and keeps a bounded tail of stderr for diagnostics. Every
//! run owns its child; nothing is shared between concurrent runs.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::progress::parse_progress_line;
use crate::error::AppError;

/// Receives normalized progress in [0, 1].
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Minimum interval between progress emits.
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(150);
/// Keep only the last N bytes of stderr to avoid unbounded memory growth.
const MAX_STDERR_BYTES: usize = 64 * 1024;

async fn read_progress<R: AsyncRead + Unpin>(
    reader: R,
    expected_secs: f64,
    progress_callback: Option<ProgressCallback>,
) {
    let mut last_emit = Instant::now();
    let mut last_progress = 0.0_f64;
    let mut stream_reader = BufReader::new(reader);
    let mut line_buf = Vec::with_capacity(256);
    while stream_reader
        .read_until(b'\n', &mut line_buf)
        .await
        .unwrap_or(0)
        > 0
    {
        let line = String::from_utf8_lossy(&line_buf);
        if let (Some(p), Some(cb)) = (
            parse_progress_line(&line, expected_secs),
            progress_callback.as_ref(),
        ) {
            let now = Instant::now();
            let should_emit = now.duration_since(last_emit) >= PROGRESS_EMIT_INTERVAL
                || (p - last_progress).abs() >= 0.01
                || p >= 1.0;
            if should_emit {
                last_emit = now;
                last_progress = p;
                cb(p);
            }
        }
        line_buf.clear();
    }
}

async fn collect_stderr<R: AsyncRead + Unpin>(reader: R) -> Vec<u8> {
    let mut stream_reader = BufReader::new(reader);
    let mut tail = Vec::new();
    let mut line_buf = Vec::with_capacity(256);
    while stream_reader
        .read_until(b'\n', &mut line_buf)
        .await
        .unwrap_or(0)
        > 0
    {
        tail.extend_from_slice(&line_buf);
        if tail.len() > MAX_STDERR_BYTES {
            let excess = tail.len() - MAX_STDERR_BYTES;
            tail.drain(..excess);
        }
        line_buf.clear();
    }
    tail
}

/// Run FFmpeg to completion, failure, or `timeout`, whichever comes first.
///
/// - `expected_secs`: length of the output, used to normalize `out_time_ms`.
/// - On timeout the child is killed and [`AppError::ExtractionTimedOut`] is returned.
/// - A non-zero exit becomes [`AppError::Extraction`] with the stderr tail attached.
pub async fn run_ffmpeg(
    ffmpeg: &Path,
    args: Vec<String>,
    expected_secs: f64,
    timeout: Duration,
    progress_callback: Option<ProgressCallback>,
) -> Result<(), AppError> {
    let input_arg = args
        .iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1));
    log::debug!(
        target: "autoclip::ffmpeg::runner",
        "Spawning FFmpeg: path={}, input={:?}, output={:?}",
        ffmpeg.display(),
        input_arg,
        args.last()
    );

    let mut cmd = Command::new(ffmpeg);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
    let mut child = cmd
        .spawn()
        .map_err(|e| format!("Failed to spawn FFmpeg: {}", e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::from("Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::from("Failed to capture stderr"))?;

    let stdout_task = tokio::spawn(read_progress(stdout, expected_secs, progress_callback));
    let stderr_task = tokio::spawn(collect_stderr(stderr));

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status.map_err(|e| format!("Failed to wait for FFmpeg: {}", e))?,
        Err(_) => {
            log::error!(
                target: "autoclip::ffmpeg::runner",
                "FFmpeg exceeded {}s, killing",
                timeout.as_secs()
            );
            if let Err(e) = child.kill().await {
                log::warn!(
                    target: "autoclip::ffmpeg::runner",
                    "Failed to kill FFmpeg after timeout: {}",
                    e
                );
            }
            stdout_task.abort();
            stderr_task.abort();
            return Err(AppError::ExtractionTimedOut(timeout));
        }
    };

    let _ = stdout_task.await;
    let stderr_bytes = stderr_task.await.unwrap_or_default();
    let stderr_str = String::from_utf8_lossy(&stderr_bytes).to_string();

    if status.success() {
        log::info!(
            target: "autoclip::ffmpeg::runner",
            "FFmpeg completed successfully"
        );
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        let err_preview = stderr_str
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .join("; ");
        log::error!(
            target: "autoclip::ffmpeg::runner",
            "FFmpeg failed (code={}): {}",
            code,
            err_preview
        );
        Err(AppError::Extraction {
            code,
            stderr: stderr_str,
        })
    }
}
