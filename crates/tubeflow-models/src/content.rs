//! Content accumulated by the wizard.

use serde::{Deserialize, Serialize};

/// Generated and chosen artifacts for one video.
///
/// Fields persist across step navigation once populated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WizardContent {
    /// Candidate titles from the last generation
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub selected_title: String,
    #[serde(default)]
    pub description: String,
    /// Chapter markers, one `MM:SS label` per line
    #[serde(default)]
    pub timestamps: String,
    /// Candidate thumbnail URLs or data URIs
    #[serde(default)]
    pub thumbnails: Vec<String>,
    #[serde(default)]
    pub selected_thumbnail: String,
}

impl WizardContent {
    pub fn has_selected_thumbnail(&self) -> bool {
        !self.selected_thumbnail.is_empty()
    }

    /// Description text with the timestamps block appended, as it will be
    /// shown on the published video.
    pub fn full_description(&self) -> String {
        match (self.description.trim(), self.timestamps.trim()) {
            ("", "") => String::new(),
            (desc, "") => desc.to_string(),
            ("", ts) => ts.to_string(),
            (desc, ts) => format!("{}\n\n{}", desc, ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_description_joins_parts() {
        let content = WizardContent {
            description: "About this video".into(),
            timestamps: "00:00 Intro\n01:30 Demo".into(),
            ..Default::default()
        };
        assert_eq!(
            content.full_description(),
            "About this video\n\n00:00 Intro\n01:30 Demo"
        );
    }

    #[test]
    fn test_full_description_skips_empty_parts() {
        let content = WizardContent {
            timestamps: "00:00 Intro".into(),
            ..Default::default()
        };
        assert_eq!(content.full_description(), "00:00 Intro");
        assert_eq!(WizardContent::default().full_description(), "");
    }
}
