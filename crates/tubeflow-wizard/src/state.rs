//! The wizard's single state record and its shallow-merge patch.

use tubeflow_models::{
    Playlist, Privacy, PublishType, UploadedFile, UploadedVideo, VideoId, WizardContent,
    WizardStep,
};

use crate::field::{Field, FieldErrors, LoadingFlags, Operation};

/// Everything the wizard knows about the upload in progress.
///
/// Created fresh per wizard session and discarded with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub current_step: WizardStep,
    /// Furthest step unlocked by upload or "Save & Next".
    pub reached_step: WizardStep,
    pub content: WizardContent,
    pub uploaded_file: Option<UploadedFile>,
    pub uploaded_video: Option<UploadedVideo>,
    pub loading: LoadingFlags,
    /// Upload progress, 0-100.
    pub upload_progress: u8,
    pub selected_privacy: Privacy,
    pub publish_type: PublishType,
    pub selected_playlist: Option<String>,
    pub playlists: Vec<Playlist>,
    pub custom_description_template: String,
    pub custom_timestamps: String,
    pub custom_title: String,
    pub custom_description: String,
    pub errors: FieldErrors,
    pub published: bool,
}

impl UploadState {
    /// The backend id of the uploaded video, if the upload has completed
    /// and returned a usable id.
    pub fn video_id(&self) -> Option<&VideoId> {
        self.uploaded_video
            .as_ref()
            .map(|v| &v.id)
            .filter(|id| !id.is_blank())
    }

    pub fn has_video(&self) -> bool {
        self.video_id().is_some()
    }

    /// Last step the user may jump to. Never behind the current step.
    pub fn furthest_step(&self) -> WizardStep {
        self.reached_step.max(self.current_step)
    }

    pub fn is_loading(&self, op: Operation) -> bool {
        self.loading.is_loading(op)
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    /// Title that "Save" would persist: the selected suggestion, falling
    /// back to the user's own draft.
    pub fn effective_title(&self) -> &str {
        prefer(&self.content.selected_title, &self.custom_title)
    }

    pub fn effective_description(&self) -> &str {
        prefer(&self.content.description, &self.custom_description)
    }

    pub fn effective_timestamps(&self) -> &str {
        prefer(&self.content.timestamps, &self.custom_timestamps)
    }

    /// Apply a patch in place. Present keys replace, absent keys are kept.
    pub fn apply(&mut self, patch: UploadStatePatch) {
        let UploadStatePatch {
            current_step,
            reached_step,
            content,
            uploaded_file,
            uploaded_video,
            loading,
            upload_progress,
            selected_privacy,
            publish_type,
            selected_playlist,
            playlists,
            custom_description_template,
            custom_timestamps,
            custom_title,
            custom_description,
            errors,
            published,
        } = patch;

        if let Some(v) = current_step {
            self.current_step = v;
        }
        if let Some(v) = reached_step {
            self.reached_step = v;
        }
        if let Some(v) = content {
            self.content = v;
        }
        if let Some(v) = uploaded_file {
            self.uploaded_file = v;
        }
        if let Some(v) = uploaded_video {
            self.uploaded_video = v;
        }
        if let Some(v) = loading {
            self.loading = v;
        }
        if let Some(v) = upload_progress {
            self.upload_progress = v.min(100);
        }
        if let Some(v) = selected_privacy {
            self.selected_privacy = v;
        }
        if let Some(v) = publish_type {
            self.publish_type = v;
        }
        if let Some(v) = selected_playlist {
            self.selected_playlist = v;
        }
        if let Some(v) = playlists {
            self.playlists = v;
        }
        if let Some(v) = custom_description_template {
            self.custom_description_template = v;
        }
        if let Some(v) = custom_timestamps {
            self.custom_timestamps = v;
        }
        if let Some(v) = custom_title {
            self.custom_title = v;
        }
        if let Some(v) = custom_description {
            self.custom_description = v;
        }
        if let Some(v) = errors {
            self.errors = v;
        }
        if let Some(v) = published {
            self.published = v;
        }
    }
}

fn prefer<'a>(canonical: &'a str, draft: &'a str) -> &'a str {
    if canonical.trim().is_empty() {
        draft
    } else {
        canonical
    }
}

/// A partial update of [`UploadState`], one optional slot per key.
///
/// `content` replaces the nested record as a whole. Nullable keys use
/// `Option<Option<_>>` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadStatePatch {
    pub current_step: Option<WizardStep>,
    pub reached_step: Option<WizardStep>,
    pub content: Option<WizardContent>,
    pub uploaded_file: Option<Option<UploadedFile>>,
    pub uploaded_video: Option<Option<UploadedVideo>>,
    pub loading: Option<LoadingFlags>,
    pub upload_progress: Option<u8>,
    pub selected_privacy: Option<Privacy>,
    pub publish_type: Option<PublishType>,
    pub selected_playlist: Option<Option<String>>,
    pub playlists: Option<Vec<Playlist>>,
    pub custom_description_template: Option<String>,
    pub custom_timestamps: Option<String>,
    pub custom_title: Option<String>,
    pub custom_description: Option<String>,
    pub errors: Option<FieldErrors>,
    pub published: Option<bool>,
}

impl UploadStatePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn step(step: WizardStep) -> Self {
        Self {
            current_step: Some(step),
            ..Default::default()
        }
    }

    pub fn content(content: WizardContent) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn errors(errors: FieldErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Default::default()
        }
    }
}
