//! Read-only view models for each wizard step.
//!
//! A section is a projection of [`UploadState`]: what to display, which
//! buttons are enabled and what loading or error text to show. Front ends
//! render these and call back into [`crate::UploadWizard`] for actions.

use tubeflow_models::{Playlist, Privacy, PublishType, WizardStep};

use crate::blob::is_blob_url;
use crate::field::{Field, Operation};
use crate::state::UploadState;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSection {
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub progress: u8,
    pub is_uploading: bool,
    pub can_upload: bool,
    /// Step to return to once a video exists.
    pub resume_step: Option<WizardStep>,
    pub error: Option<String>,
}

impl UploadSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_uploading = state.is_loading(Operation::Upload);
        Self {
            file_name: state.uploaded_file.as_ref().map(|f| f.name.clone()),
            size_bytes: state.uploaded_file.as_ref().map(|f| f.size_bytes),
            progress: state.upload_progress,
            is_uploading,
            can_upload: !is_uploading && !state.has_video(),
            resume_step: Some(state.furthest_step())
                .filter(|step| state.has_video() && *step > WizardStep::Upload),
            error: error_text(state, Field::Upload),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleSection {
    pub suggestions: Vec<String>,
    pub selected: String,
    pub custom_title: String,
    /// The title that would be saved.
    pub value: String,
    pub is_generating: bool,
    pub is_saving: bool,
    pub can_generate: bool,
    pub can_save: bool,
    /// Save is only offered once the upload has produced a video id.
    pub show_save: bool,
    pub error: Option<String>,
}

impl TitleSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_generating = state.is_loading(Operation::GenerateTitles);
        let is_saving = state.is_loading(Operation::SaveTitle);
        let value = state.effective_title().to_string();
        Self {
            suggestions: state.content.titles.clone(),
            selected: state.content.selected_title.clone(),
            custom_title: state.custom_title.clone(),
            can_generate: state.has_video() && !is_generating,
            can_save: can_save(state, &value, is_saving),
            show_save: state.has_video(),
            value,
            is_generating,
            is_saving,
            error: error_text(state, Field::Title),
        }
    }

    /// "Regenerate" once suggestions exist, "Generate" before.
    pub fn generate_label(&self) -> &'static str {
        if self.suggestions.is_empty() {
            "Generate"
        } else {
            "Regenerate"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionSection {
    pub value: String,
    pub template: String,
    pub uses_template: bool,
    pub is_generating: bool,
    pub is_saving: bool,
    pub can_generate: bool,
    pub can_save: bool,
    pub show_save: bool,
    pub error: Option<String>,
}

impl DescriptionSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_generating = state.is_loading(Operation::GenerateDescription);
        let is_saving = state.is_loading(Operation::SaveDescription);
        let value = state.effective_description().to_string();
        Self {
            template: state.custom_description_template.clone(),
            uses_template: !state.custom_description_template.trim().is_empty(),
            can_generate: state.has_video() && !is_generating,
            can_save: can_save(state, &value, is_saving),
            show_save: state.has_video(),
            value,
            is_generating,
            is_saving,
            error: error_text(state, Field::Description),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampsSection {
    pub value: String,
    pub is_generating: bool,
    pub is_saving: bool,
    pub can_generate: bool,
    pub can_save: bool,
    pub show_save: bool,
    pub error: Option<String>,
}

impl TimestampsSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_generating = state.is_loading(Operation::GenerateTimestamps);
        let is_saving = state.is_loading(Operation::SaveTimestamps);
        let value = state.effective_timestamps().to_string();
        Self {
            can_generate: state.has_video() && !is_generating,
            can_save: can_save(state, &value, is_saving),
            show_save: state.has_video(),
            value,
            is_generating,
            is_saving,
            error: error_text(state, Field::Timestamps),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailOption {
    pub url: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSection {
    pub options: Vec<ThumbnailOption>,
    pub selected: Option<String>,
    pub is_custom: bool,
    pub is_generating: bool,
    pub is_saving: bool,
    pub can_generate: bool,
    pub can_save: bool,
    pub show_save: bool,
    pub error: Option<String>,
}

impl ThumbnailSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_generating = state.is_loading(Operation::GenerateThumbnails);
        let is_saving = state.is_loading(Operation::SaveThumbnail);
        let selected = &state.content.selected_thumbnail;
        Self {
            options: state
                .content
                .thumbnails
                .iter()
                .map(|url| ThumbnailOption {
                    url: url.clone(),
                    selected: url == selected,
                })
                .collect(),
            selected: state
                .content
                .has_selected_thumbnail()
                .then(|| selected.clone()),
            is_custom: is_blob_url(selected),
            can_generate: state.has_video() && !is_generating,
            can_save: can_save(state, selected, is_saving),
            show_save: state.has_video(),
            is_generating,
            is_saving,
            error: error_text(state, Field::Thumbnail),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSection {
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub privacy: Privacy,
    pub publish_type: PublishType,
    pub playlists: Vec<Playlist>,
    pub selected_playlist: Option<String>,
    pub is_loading_playlists: bool,
    pub is_publishing: bool,
    pub can_publish: bool,
    pub published: bool,
    pub error: Option<String>,
}

impl PreviewSection {
    pub fn from_state(state: &UploadState) -> Self {
        let is_publishing = state.is_loading(Operation::Publish);
        let content = &state.content;
        Self {
            title: state.effective_title().to_string(),
            description: content.full_description(),
            thumbnail: content
                .has_selected_thumbnail()
                .then(|| content.selected_thumbnail.clone()),
            privacy: state.selected_privacy,
            publish_type: state.publish_type,
            playlists: state.playlists.clone(),
            selected_playlist: state.selected_playlist.clone(),
            is_loading_playlists: state.is_loading(Operation::LoadPlaylists),
            is_publishing,
            can_publish: state.has_video() && !is_publishing && !state.published,
            published: state.published,
            error: error_text(state, Field::Publish).or_else(|| error_text(state, Field::Playlist)),
        }
    }
}

/// The section for the state's current step.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionView {
    Upload(UploadSection),
    Title(TitleSection),
    Description(DescriptionSection),
    Timestamps(TimestampsSection),
    Thumbnail(ThumbnailSection),
    Preview(PreviewSection),
}

impl SectionView {
    pub fn for_state(state: &UploadState) -> Self {
        match state.current_step {
            WizardStep::Upload => SectionView::Upload(UploadSection::from_state(state)),
            WizardStep::Title => SectionView::Title(TitleSection::from_state(state)),
            WizardStep::Description => {
                SectionView::Description(DescriptionSection::from_state(state))
            }
            WizardStep::Timestamps => SectionView::Timestamps(TimestampsSection::from_state(state)),
            WizardStep::Thumbnail => SectionView::Thumbnail(ThumbnailSection::from_state(state)),
            WizardStep::Preview => SectionView::Preview(PreviewSection::from_state(state)),
        }
    }

    pub fn step(&self) -> WizardStep {
        match self {
            SectionView::Upload(_) => WizardStep::Upload,
            SectionView::Title(_) => WizardStep::Title,
            SectionView::Description(_) => WizardStep::Description,
            SectionView::Timestamps(_) => WizardStep::Timestamps,
            SectionView::Thumbnail(_) => WizardStep::Thumbnail,
            SectionView::Preview(_) => WizardStep::Preview,
        }
    }
}

fn can_save(state: &UploadState, value: &str, is_saving: bool) -> bool {
    state.has_video() && !value.trim().is_empty() && !is_saving
}

fn error_text(state: &UploadState, field: Field) -> Option<String> {
    state.error(field).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldErrors, LoadingFlags};
    use tubeflow_models::{UploadedVideo, WizardContent};

    fn state_with_video() -> UploadState {
        UploadState {
            current_step: WizardStep::Title,
            uploaded_video: Some(UploadedVideo::with_id("v1")),
            ..Default::default()
        }
    }

    #[test]
    fn test_upload_section_offers_resume_after_going_back() {
        let fresh = UploadSection::from_state(&UploadState::default());
        assert!(fresh.can_upload);
        assert_eq!(fresh.resume_step, None);

        let state = UploadState {
            current_step: WizardStep::Upload,
            reached_step: WizardStep::Timestamps,
            ..state_with_video()
        };
        let section = UploadSection::from_state(&state);
        assert!(!section.can_upload);
        assert_eq!(section.resume_step, Some(WizardStep::Timestamps));
    }

    #[test]
    fn test_title_section_without_video() {
        let state = UploadState {
            current_step: WizardStep::Title,
            content: WizardContent {
                selected_title: "B".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let section = TitleSection::from_state(&state);

        assert!(!section.can_generate);
        assert!(!section.can_save);
        assert!(!section.show_save);
    }

    #[test]
    fn test_title_section_enablement() {
        let mut state = state_with_video();
        state.content.titles = vec!["A".into(), "B".into()];

        let section = TitleSection::from_state(&state);
        assert!(section.can_generate);
        assert!(!section.can_save);
        assert_eq!(section.generate_label(), "Regenerate");

        state.content.selected_title = "B".into();
        state.loading = LoadingFlags::default().with(Operation::SaveTitle);
        let section = TitleSection::from_state(&state);
        assert!(section.is_saving);
        assert!(!section.can_save);
        // Saving does not block generating
        assert!(section.can_generate);
    }

    #[test]
    fn test_description_section_prefers_state_value() {
        let mut state = state_with_video();
        state.custom_description = "draft".into();
        assert_eq!(DescriptionSection::from_state(&state).value, "draft");

        state.content.description = "generated".into();
        state.custom_description_template = "  ".into();
        let section = DescriptionSection::from_state(&state);
        assert_eq!(section.value, "generated");
        assert!(!section.uses_template);
    }

    #[test]
    fn test_thumbnail_section_marks_single_selection() {
        let mut state = state_with_video();
        state.content.thumbnails = (1..=5).map(|i| format!("https://cdn/t{}.jpg", i)).collect();
        state.content.selected_thumbnail = "https://cdn/t2.jpg".into();

        let section = ThumbnailSection::from_state(&state);
        let selected: Vec<_> = section.options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].url, "https://cdn/t2.jpg");
        assert!(!section.is_custom);
        assert!(section.can_save);
    }

    #[test]
    fn test_errors_surface_per_section() {
        let mut state = state_with_video();
        state.errors = FieldErrors::default().with(Field::Timestamps, "quota exceeded");

        assert!(TitleSection::from_state(&state).error.is_none());
        assert_eq!(
            TimestampsSection::from_state(&state).error.as_deref(),
            Some("quota exceeded")
        );
    }

    #[test]
    fn test_section_view_follows_current_step() {
        let mut state = state_with_video();
        for step in WizardStep::ORDER {
            state.current_step = step;
            assert_eq!(SectionView::for_state(&state).step(), step);
        }
    }

    #[test]
    fn test_preview_section() {
        let mut state = state_with_video();
        state.current_step = WizardStep::Preview;
        state.content.selected_title = "Title".into();
        state.content.description = "Body".into();
        state.content.timestamps = "00:00 Intro".into();

        let section = PreviewSection::from_state(&state);
        assert_eq!(section.description, "Body\n\n00:00 Intro");
        assert!(section.can_publish);
        assert!(section.thumbnail.is_none());

        state.published = true;
        assert!(!PreviewSection::from_state(&state).can_publish);
    }
}
