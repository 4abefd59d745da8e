//! Social platforms the discovery pipeline and delivery channels talk to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A source or destination platform.
///
/// `Generic` covers anything without platform-specific handling (plain
/// websites, email).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Twitter,
    YouTube,
    TikTok,
    Instagram,
    Reddit,
    Generic,
}

impl Platform {
    pub const ALL: [Platform; 7] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::YouTube,
        Platform::TikTok,
        Platform::Instagram,
        Platform::Reddit,
        Platform::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Twitter => "twitter",
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Reddit => "reddit",
            Platform::Generic => "generic",
        }
    }

    /// Parse a platform name, treating anything unknown as `Generic`.
    pub fn from_name_or_generic(name: &str) -> Self {
        name.parse().unwrap_or(Platform::Generic)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| CoreError::validation(format!("Unknown platform '{s}'")))
    }
}
