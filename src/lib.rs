pub mod config;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod platform;
pub mod sidecar;
pub mod storage;
#[cfg(any(test, feature = "integration-test-api"))]
pub mod test_support;
pub mod window;

pub use config::ClipConfig;
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{AppError, ErrorKind, ErrorResponse};
pub use pipeline::{ClipPipeline, ClipResponse, ExtractionResult, SourceMedia};
pub use platform::Platform;
pub use window::{ClipWindow, OffsetSource, SecureOffsetSource, select_window};
