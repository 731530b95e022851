//! Argument builder for the segment extraction command.

use std::path::Path;

use super::path_to_string;
use crate::window::ClipWindow;

/// Build ffmpeg args that copy `[start, start + clip)` of `input` into `output`.
///
/// `-ss` before `-i` seeks on the demuxer; since the streams are re-encoded the
/// cut is frame accurate. Progress goes to stdout as `key=value` lines.
pub fn build_extract_args(input: &Path, output: &Path, window: &ClipWindow) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-ss".into(),
        window.start_offset_secs().to_string(),
        "-i".into(),
        path_to_string(input),
        "-t".into(),
        window.clip_duration_secs().to_string(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a:0?".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        path_to_string(output),
    ]
}

/// One flag (with its value) per line, output path last, for debug logs.
pub fn format_args_for_display(args: &[String]) -> String {
    let Some((output, flags)) = args.split_last() else {
        return String::new();
    };
    let mut lines: Vec<String> = Vec::new();
    let mut iter = flags.iter().peekable();
    while let Some(arg) = iter.next() {
        let value = iter.next_if(|next| !next.starts_with('-') || next.parse::<f64>().is_ok());
        match value {
            Some(value) if arg.starts_with('-') => lines.push(format!("  {} {}", arg, value)),
            Some(value) => {
                lines.push(format!("  {}", arg));
                lines.push(format!("  {}", value));
            }
            None => lines.push(format!("  {}", arg)),
        }
    }
    lines.push(format!("  {}", output));
    lines.join("\n")
}
