//! Credential records for the AI provider key and the YouTube connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Masked preview of the stored AI provider key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyPreview {
    pub preview: String,
}

/// OAuth token record for the connected YouTube channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds as reported at issue time
    #[serde(default)]
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: String,
    pub id: String,
    pub user_id: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds until expiry, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Consent URL returned when starting the YouTube connection flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    #[serde(alias = "authorizationUrl", alias = "url")]
    pub authorization_url: String,
}
