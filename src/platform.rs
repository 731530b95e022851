//! Target distribution platforms and their fixed clip lengths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::YouTube, Platform::Instagram];

    /// Clip length in whole seconds.
    pub fn clip_duration_secs(self) -> u32 {
        match self {
            Platform::YouTube => 180,
            Platform::Instagram => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Platform is required (youtube or instagram)."));
        }
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unsupported platform '{}'. Expected youtube or instagram.",
                    trimmed
                ))
            })
    }
}
