//! FFprobe-based duration probing. Reads container metadata only; nothing is decoded.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    format_name: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProbe {
    pub duration: f64,
    pub format_name: Option<String>,
    pub video_codec: Option<String>,
    pub size: Option<u64>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
///
/// A container without a positive, finite duration is not usable media.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaProbe, AppError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| AppError::probe(format!("Failed to parse ffprobe JSON: {}", e)))?;

    let format = output
        .format
        .ok_or_else(|| AppError::probe("ffprobe reported no container format"))?;
    let duration = format
        .duration
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| AppError::probe("ffprobe reported no playable duration"))?;

    let video_codec = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.codec_name.clone());

    Ok(MediaProbe {
        duration,
        format_name: format.format_name,
        video_codec,
        size: format.size.as_deref().and_then(|s| s.parse().ok()),
    })
}

/// ffprobe that cannot be started is a deployment fault, not a bad upload.
fn spawn_error(ffprobe: &Path, e: std::io::Error) -> AppError {
    log::error!(
        target: "autoclip::ffmpeg::ffprobe",
        "Failed to start ffprobe at {}: {}",
        ffprobe.display(),
        e
    );
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            AppError::FfmpegNotFound(format!(
                "ffprobe could not be started ({}): {}",
                ffprobe.display(),
                e
            ))
        }
        _ => AppError::Io(e),
    }
}

/// Run ffprobe on `path`, bounded by `timeout`.
pub async fn probe_media(
    ffprobe: &Path,
    path: &Path,
    timeout: Duration,
) -> Result<MediaProbe, AppError> {
    log::debug!(
        target: "autoclip::ffmpeg::ffprobe",
        "probe_media: path={}",
        path.display()
    );

    if !path.is_file() {
        return Err(AppError::probe(format!(
            "Input is not a readable file: {}",
            path.display()
        )));
    }

    let mut cmd = Command::new(ffprobe);
    cmd.args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|e| spawn_error(ffprobe, e))?,
        Err(_) => {
            log::warn!(
                target: "autoclip::ffmpeg::ffprobe",
                "ffprobe timed out after {}s",
                timeout.as_secs()
            );
            return Err(AppError::probe(format!(
                "ffprobe timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::probe(format!("ffprobe failed: {}", stderr.trim())));
    }

    let json = String::from_utf8(output.stdout)
        .map_err(|_| AppError::probe("ffprobe output was not valid UTF-8"))?;
    let probe = parse_ffprobe_json(&json)?;
    log::debug!(
        target: "autoclip::ffmpeg::ffprobe",
        "probe_media: duration={}, format={:?}, video_codec={:?}",
        probe.duration,
        probe.format_name,
        probe.video_codec
    );
    Ok(probe)
}
