//! Field and operation keys for loading flags and inline errors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical field of the wizard; the unit errors are reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Upload,
    Title,
    Description,
    Timestamps,
    Thumbnail,
    Playlist,
    Publish,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Upload => "upload",
            Field::Title => "title",
            Field::Description => "description",
            Field::Timestamps => "timestamps",
            Field::Thumbnail => "thumbnail",
            Field::Playlist => "playlist",
            Field::Publish => "publish",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An independently triggerable async operation.
///
/// Each one has its own loading flag, so unrelated fields can be generated
/// or saved concurrently while a second click on the same button is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    GenerateTitles,
    GenerateDescription,
    GenerateTimestamps,
    GenerateThumbnails,
    SaveTitle,
    SaveDescription,
    SaveTimestamps,
    SaveThumbnail,
    LoadPlaylists,
    Publish,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::GenerateTitles => "generate_titles",
            Operation::GenerateDescription => "generate_description",
            Operation::GenerateTimestamps => "generate_timestamps",
            Operation::GenerateThumbnails => "generate_thumbnails",
            Operation::SaveTitle => "save_title",
            Operation::SaveDescription => "save_description",
            Operation::SaveTimestamps => "save_timestamps",
            Operation::SaveThumbnail => "save_thumbnail",
            Operation::LoadPlaylists => "load_playlists",
            Operation::Publish => "publish",
        }
    }

    /// Field whose error slot this operation reports into.
    pub fn field(&self) -> Field {
        match self {
            Operation::Upload => Field::Upload,
            Operation::GenerateTitles | Operation::SaveTitle => Field::Title,
            Operation::GenerateDescription | Operation::SaveDescription => Field::Description,
            Operation::GenerateTimestamps | Operation::SaveTimestamps => Field::Timestamps,
            Operation::GenerateThumbnails | Operation::SaveThumbnail => Field::Thumbnail,
            Operation::LoadPlaylists => Field::Playlist,
            Operation::Publish => Field::Publish,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operations currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingFlags(BTreeSet<Operation>);

impl LoadingFlags {
    pub fn is_loading(&self, op: Operation) -> bool {
        self.0.contains(&op)
    }

    pub fn any(&self) -> bool {
        !self.0.is_empty()
    }

    /// True if any operation reporting into `field` is running.
    pub fn field_busy(&self, field: Field) -> bool {
        self.0.iter().any(|op| op.field() == field)
    }

    pub fn with(&self, op: Operation) -> Self {
        let mut next = self.clone();
        next.0.insert(op);
        next
    }

    pub fn without(&self, op: Operation) -> Self {
        let mut next = self.clone();
        next.0.remove(&op);
        next
    }
}

/// Last error per field, rendered next to the offending control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn with(&self, field: Field, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.insert(field, message.into());
        next
    }

    pub fn without(&self, field: Field) -> Self {
        let mut next = self.clone();
        next.0.remove(&field);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_flags_are_per_operation() {
        let flags = LoadingFlags::default()
            .with(Operation::GenerateTitles)
            .with(Operation::GenerateDescription);

        assert!(flags.is_loading(Operation::GenerateTitles));
        assert!(flags.is_loading(Operation::GenerateDescription));
        assert!(!flags.is_loading(Operation::SaveTitle));
        assert!(flags.field_busy(Field::Title));
        assert!(!flags.field_busy(Field::Thumbnail));

        let flags = flags.without(Operation::GenerateTitles);
        assert!(!flags.is_loading(Operation::GenerateTitles));
        assert!(flags.any());
    }

    #[test]
    fn test_field_errors_replace_and_clear() {
        let errors = FieldErrors::default()
            .with(Field::Title, "first")
            .with(Field::Title, "second");
        assert_eq!(errors.get(Field::Title), Some("second"));
        assert!(errors.without(Field::Title).is_empty());
    }
}
