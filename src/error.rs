//! Pipeline error type. Each variant maps to a transport-neutral [`ErrorKind`],
//! which the CLI turns into an exit code and the sidecar into a status code.

use std::time::Duration;

use serde::Serialize;

use crate::ffmpeg::parse_ffmpeg_error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    FfmpegNotFound(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error(
        "Video too short: {total_duration} seconds available, {clip_duration}-second clip requested"
    )]
    InsufficientDuration {
        total_duration: f64,
        clip_duration: u32,
    },

    #[error("FFmpeg failed (code {code}): {stderr}")]
    Extraction { code: i32, stderr: String },

    #[error("Extraction timed out after {}s", .0.as_secs())]
    ExtractionTimedOut(Duration),

    #[error("{0}")]
    Validation(String),
}

/// Coarse classification used at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    InsufficientDuration,
    Probe,
    Extraction,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status for the sidecar response.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::InsufficientDuration => 400,
            ErrorKind::Probe => 422,
            ErrorKind::Extraction | ErrorKind::Internal => 500,
        }
    }

    /// Process exit code for the one-shot CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Validation => 2,
            ErrorKind::InsufficientDuration => 3,
            ErrorKind::Probe => 4,
            ErrorKind::Extraction => 5,
        }
    }
}

impl AppError {
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn extraction_failed(code: i32, stderr: impl Into<String>) -> Self {
        Self::Extraction {
            code,
            stderr: stderr.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::InsufficientDuration { .. } => ErrorKind::InsufficientDuration,
            AppError::Probe(_) => ErrorKind::Probe,
            AppError::Extraction { .. } | AppError::ExtractionTimedOut(_) => ErrorKind::Extraction,
            AppError::Io(_) | AppError::FfmpegNotFound(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to hand to an untrusted caller: no file paths, no raw stderr.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::InsufficientDuration {
                total_duration,
                clip_duration,
            } => format!(
                "Uploaded video is too short for the selected platform editing \
                 ({:.1} seconds available for a {}-second clip).",
                total_duration, clip_duration
            ),
            AppError::Probe(_) => "Uploaded file could not be read as a video.".to_string(),
            AppError::Extraction { code, stderr } => {
                parse_ffmpeg_error(stderr, Some(*code)).summary
            }
            AppError::ExtractionTimedOut(limit) => format!(
                "Video editing did not finish within {} seconds.",
                limit.as_secs()
            ),
            AppError::Io(_) | AppError::FfmpegNotFound(_) => "Error processing video".to_string(),
        }
    }
}

/// Outbound failure shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub kind: ErrorKind,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ErrorResponse {
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let kind = err.kind();
        let (total_duration, clip_duration) = match err {
            AppError::InsufficientDuration {
                total_duration,
                clip_duration,
            } => (Some(*total_duration), Some(*clip_duration)),
            _ => (None, None),
        };
        Self {
            message: err.client_message(),
            kind,
            status: kind.status_code(),
            total_duration,
            clip_duration,
            platform: None,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ErrorResponse::from(self).serialize(serializer)
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Extraction {
            code: -1,
            stderr: s,
        }
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}
