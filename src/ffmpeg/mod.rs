mod builder;
pub mod discovery;
mod error;
pub mod ffprobe;
mod progress;
mod runner;

pub use builder::{build_extract_args, format_args_for_display};
pub use error::{FfmpegErrorPayload, parse_ffmpeg_error};
pub use ffprobe::{MediaProbe, probe_media};
pub use runner::{ProgressCallback, run_ffmpeg};

/// Path to string for FFmpeg args or logging.
pub fn path_to_string(path: &(impl AsRef<std::path::Path> + ?Sized)) -> String {
    path.as_ref().to_string_lossy().to_string()
}
