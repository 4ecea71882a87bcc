//! Publish settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// YouTube visibility of the published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
            Privacy::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Privacy::Public),
            "private" => Ok(Privacy::Private),
            "unlisted" => Ok(Privacy::Unlisted),
            other => Err(format!("unknown privacy setting: {}", other)),
        }
    }
}

/// When the video goes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishType {
    #[default]
    Now,
    Scheduled(DateTime<Utc>),
}

impl PublishType {
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PublishType::Now => None,
            PublishType::Scheduled(at) => Some(*at),
        }
    }
}

/// Body of the publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub privacy: Privacy,
    /// ISO 8601 timestamp for scheduled publishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

impl PublishRequest {
    pub fn new(privacy: Privacy, publish_type: PublishType, playlist_id: Option<String>) -> Self {
        Self {
            privacy,
            scheduled_at: publish_type.scheduled_at(),
            playlist_id,
        }
    }
}
