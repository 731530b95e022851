//! Locate the `ffmpeg` and `ffprobe` binaries.
//!
//! Resolution order: explicit override (config or `FFMPEG_PATH`), common
//! install locations, then `which`/`where`. ffprobe is looked up next to the
//! resolved ffmpeg. Nothing is cached here; callers resolve once and keep the
//! paths (see `FfmpegEngine::discover`).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::AppError;

#[cfg(target_os = "windows")]
fn find_in_path() -> Option<PathBuf> {
    let output = Command::new("where").arg("ffmpeg").output().ok()?;
    first_line_path(output)
}

#[cfg(not(target_os = "windows"))]
fn find_in_path() -> Option<PathBuf> {
    let output = Command::new("which").arg("ffmpeg").output().ok()?;
    first_line_path(output)
}

fn first_line_path(output: std::process::Output) -> Option<PathBuf> {
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(PathBuf::from(first))
    }
}

fn common_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/opt/local/bin/ffmpeg"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    {
        vec![]
    }
}

/// Resolve the ffmpeg binary. `override_path` wins when it exists.
pub fn resolve_ffmpeg_path(override_path: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Some(p) = override_path {
        if p.exists() {
            log::debug!(
                target: "autoclip::ffmpeg::discovery",
                "FFmpeg path from override: {}",
                p.display()
            );
            return Ok(p.to_path_buf());
        }
        log::warn!(
            target: "autoclip::ffmpeg::discovery",
            "Configured FFmpeg path does not exist, searching system: {}",
            p.display()
        );
    }

    for path in common_paths() {
        if path.exists() {
            log::debug!(
                target: "autoclip::ffmpeg::discovery",
                "FFmpeg found in common path: {}",
                path.display()
            );
            return Ok(path);
        }
    }

    if let Some(p) = find_in_path().filter(|p| p.exists()) {
        log::debug!(
            target: "autoclip::ffmpeg::discovery",
            "FFmpeg found in PATH: {}",
            p.display()
        );
        return Ok(p);
    }

    log::error!(
        target: "autoclip::ffmpeg::discovery",
        "FFmpeg not found in PATH or common locations"
    );
    Err(AppError::FfmpegNotFound(
        "FFmpeg not found. Install it (e.g. `apt install ffmpeg` or `brew install ffmpeg`) \
         or set FFMPEG_PATH."
            .to_string(),
    ))
}

/// Paths to try for ffprobe given an ffmpeg binary path (suffixed first, then plain).
pub fn ffprobe_candidates(ffmpeg_path: &Path) -> Vec<PathBuf> {
    let Some(parent) = ffmpeg_path.parent() else {
        return vec![];
    };
    let mut candidates = Vec::with_capacity(2);
    // Whole file name, not file_stem: `ffmpeg-7.1` must keep its `.1`.
    let name = ffmpeg_path.file_name().and_then(|s| s.to_str());
    #[cfg(target_os = "windows")]
    let name = name.map(|n| n.strip_suffix(".exe").unwrap_or(n));
    let suffix = name
        .and_then(|name| name.strip_prefix("ffmpeg"))
        .filter(|suffix| !suffix.is_empty());
    if let Some(suffix) = suffix {
        #[cfg(target_os = "windows")]
        candidates.push(parent.join(format!("ffprobe{suffix}.exe")));
        #[cfg(not(target_os = "windows"))]
        candidates.push(parent.join(format!("ffprobe{suffix}")));
    }
    #[cfg(target_os = "windows")]
    candidates.push(parent.join("ffprobe.exe"));
    #[cfg(not(target_os = "windows"))]
    candidates.push(parent.join("ffprobe"));
    candidates
}

/// ffprobe ships next to ffmpeg; a platform-suffixed ffmpeg gets the same-suffixed ffprobe first.
pub fn resolve_ffprobe_path(ffmpeg_path: &Path) -> Result<PathBuf, AppError> {
    let candidates = ffprobe_candidates(ffmpeg_path);
    if let Some(found) = candidates.iter().find(|c| c.exists()) {
        return Ok(found.clone());
    }
    Err(AppError::FfmpegNotFound(format!(
        "ffprobe not found next to FFmpeg (looked for {})",
        candidates
            .iter()
            .map(|c| c.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}
