//! Video records returned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned identifier of an uploaded video.
///
/// Every generation and save call is scoped to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The backend-side record created by an upload or URL download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedVideo {
    /// Record id used by all later calls
    pub id: VideoId,

    /// Title detected or assigned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Original filename for file uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Source URL for URL downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Backend processing status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Duration in seconds, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UploadedVideo {
    /// Minimal record holding only an id.
    pub fn with_id(id: impl Into<VideoId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            filename: None,
            source_url: None,
            status: None,
            duration_secs: None,
            created_at: None,
        }
    }
}

/// Local description of the file the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size_bytes: u64,
}

/// Row of the dashboard video listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: VideoId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
