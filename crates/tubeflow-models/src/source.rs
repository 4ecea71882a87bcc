//! Validation of remote video source URLs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors from source URL validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceUrlError {
    #[error("URL is empty")]
    Empty,
    #[error("URL could not be parsed: {0}")]
    Malformed(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// An `http`/`https` URL the backend can download a video from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceUrl(Url);

impl SourceUrl {
    pub fn parse(raw: &str) -> Result<Self, SourceUrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SourceUrlError::Empty);
        }

        let url = Url::parse(raw).map_err(|e| SourceUrlError::Malformed(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(SourceUrlError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(SourceUrlError::MissingHost);
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Last non-empty path segment, used as a display name.
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    }
}

impl TryFrom<String> for SourceUrl {
    type Error = SourceUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SourceUrl> for String {
    fn from(value: SourceUrl) -> Self {
        value.0.into()
    }
}

impl std::fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
