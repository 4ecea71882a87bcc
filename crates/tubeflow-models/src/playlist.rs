//! Playlist records.

use serde::{Deserialize, Serialize};

/// A playlist on the connected channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
}
