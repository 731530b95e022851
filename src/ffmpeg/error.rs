//! Map FFmpeg exit codes to short client-facing summaries.
//!
//! Exit codes are from ffmpeg.c: 1 (general), 69 (rate exceeded),
//! 123 (hard exit), 255 (signal). -1 is used for spawn failure.
//! Stderr is kept as detail for the log.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FfmpegErrorPayload {
    pub summary: String,
    pub detail: String,
}

pub fn parse_ffmpeg_error(stderr: &str, exit_code: Option<i32>) -> FfmpegErrorPayload {
    let summary = match exit_code {
        Some(code) => known_exit_code_summary(code)
            .unwrap_or_else(|| format!("Video editing failed (exit code {}).", code)),
        None => first_line_truncated(stderr, 120),
    };
    FfmpegErrorPayload {
        summary,
        detail: stderr.trim().to_string(),
    }
}

fn known_exit_code_summary(code: i32) -> Option<String> {
    match code {
        -1 => Some("Video editor could not be started.".into()),
        1 => Some("Video editing failed.".into()),
        69 => Some("Video editing rate limit exceeded.".into()),
        123 | 255 => Some("Video editing was interrupted.".into()),
        _ => None,
    }
}

const ELLIPSIS: &str = "…";

fn first_line_truncated(stderr: &str, max_len: usize) -> String {
    let first = stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if first.len() <= max_len {
        return first.to_string();
    }
    let mut cut = max_len.saturating_sub(ELLIPSIS.len());
    while !first.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &first[..cut], ELLIPSIS)
}
