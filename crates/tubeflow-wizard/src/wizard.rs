//! Upload wizard step handlers.
//!
//! `UploadWizard` owns the state store and drives the backend gateway for
//! each step: upload, generate, edit, save, navigate and publish.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, Instrument};

use tubeflow_gateway::{
    BackendGateway, GatewayError, GatewayResult, ProgressFn, ThumbnailUpload, UploadSource,
};
use tubeflow_models::{
    Privacy, PublishRequest, PublishType, SourceUrl, UploadedFile, UploadedVideo, VideoId,
    WizardContent, WizardStep,
};

use crate::blob::{is_blob_url, BlobLease, BlobRegistry};
use crate::error::{SaveOutcome, WizardError, WizardResult};
use crate::field::{Field, Operation};
use crate::logging::WizardLogger;
use crate::state::{UploadState, UploadStatePatch};
use crate::store::{InFlight, UploadStore};

pub struct UploadWizard<G> {
    gateway: Arc<G>,
    store: UploadStore,
    blobs: BlobRegistry,
    custom_thumbnail: Mutex<Option<BlobLease>>,
    mounted: Arc<AtomicBool>,
}

impl<G: BackendGateway> UploadWizard<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_store(gateway, UploadStore::new())
    }

    pub fn with_store(gateway: Arc<G>, store: UploadStore) -> Self {
        Self {
            gateway,
            store,
            blobs: BlobRegistry::new(),
            custom_thumbnail: Mutex::new(None),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    pub fn snapshot(&self) -> UploadState {
        self.store.snapshot()
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Unmount the wizard. Results that resolve afterwards are discarded,
    /// and any custom thumbnail blob is revoked.
    pub fn close(&self) {
        if self.mounted.swap(false, Ordering::AcqRel) {
            debug!("Upload wizard closed");
        }
        self.custom_thumbnail.lock().take();
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Stream a local video file to the backend and advance to the title step.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> WizardResult<UploadedVideo> {
        let path = path.as_ref();
        self.require_step(WizardStep::Upload, "Upload")?;
        self.require_no_video()?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| self.reject(Field::Upload, e.into()))?;
        if !metadata.is_file() {
            let err = std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            );
            return Err(self.reject(Field::Upload, err.into()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = UploadedFile {
            name,
            size_bytes: metadata.len(),
        };

        self.upload(UploadSource::File(path.to_path_buf()), file).await
    }

    /// Ask the backend to download a video from `url`, then advance to the
    /// title step.
    pub async fn upload_from_url(&self, url: &str) -> WizardResult<UploadedVideo> {
        self.require_step(WizardStep::Upload, "Upload")?;
        self.require_no_video()?;

        let url = SourceUrl::parse(url).map_err(|e| self.reject(Field::Upload, e.into()))?;
        let file = UploadedFile {
            name: url.file_name().unwrap_or_else(|| url.host()).to_string(),
            size_bytes: 0,
        };

        self.upload(UploadSource::Url(url), file).await
    }

    async fn upload(&self, source: UploadSource, file: UploadedFile) -> WizardResult<UploadedVideo> {
        let op = Operation::Upload;
        let _guard = self.store.begin(op)?;
        let logger = WizardLogger::pending(op);
        logger.log_start(&file.name);

        self.store.update_state(UploadStatePatch {
            upload_progress: Some(0),
            ..Default::default()
        });

        let result = self
            .gateway
            .upload_video(source, Some(self.progress_reporter()))
            .instrument(logger.create_span())
            .await;
        let video = self.settle(&logger, result)?;

        if video.id.is_blank() {
            let err = GatewayError::invalid_response("Upload returned an empty video id");
            return Err(self.reject(Field::Upload, err.into()));
        }

        self.store.update_with(|s| UploadStatePatch {
            current_step: Some(WizardStep::Title),
            reached_step: Some(s.reached_step.max(WizardStep::Title)),
            uploaded_file: Some(Some(file)),
            uploaded_video: Some(Some(video.clone())),
            upload_progress: Some(100),
            ..Default::default()
        });
        self.store.clear_error(Field::Upload);

        WizardLogger::new(&video.id, op).log_completion("upload finished");
        Ok(video)
    }

    fn progress_reporter(&self) -> ProgressFn {
        let store = self.store.clone();
        let mounted = Arc::clone(&self.mounted);
        Arc::new(move |percent: u8| {
            if mounted.load(Ordering::Acquire) {
                store.update_state(UploadStatePatch {
                    upload_progress: Some(percent.min(100)),
                    ..Default::default()
                });
            }
        })
    }

    // ========================================================================
    // AI generation
    // ========================================================================

    pub async fn generate_titles(&self) -> WizardResult<Vec<String>> {
        let op = Operation::GenerateTitles;
        let (video_id, _guard) = self.prepare_generate(op)?;
        let logger = WizardLogger::new(&video_id, op);
        logger.log_start("requesting title suggestions");

        let result = self.gateway.generate_titles(&video_id)
            .instrument(logger.create_span())
            .await;
        let titles = self.settle(&logger, result)?;

        self.store.update_content(|c| WizardContent {
            titles: titles.clone(),
            ..c.clone()
        });
        self.store.clear_error(op.field());
        logger.log_completion(&format!("{} titles", titles.len()));
        Ok(titles)
    }

    /// Generate a description, using the custom template when one is set.
    pub async fn generate_description(&self) -> WizardResult<String> {
        let op = Operation::GenerateDescription;
        let (video_id, _guard) = self.prepare_generate(op)?;
        let logger = WizardLogger::new(&video_id, op);

        let template = self.store.read(|s| s.custom_description_template.clone());
        let result = if template.trim().is_empty() {
            logger.log_start("generating description");
            self.gateway
                .generate_description(&video_id)
                .instrument(logger.create_span())
                .await
        } else {
            logger.log_start("regenerating description from template");
            self.gateway
                .regenerate_description_with_template(&video_id, &template)
                .instrument(logger.create_span())
                .await
        };
        let description = self.settle(&logger, result)?;

        self.store.update_content(|c| WizardContent {
            description: description.clone(),
            ..c.clone()
        });
        self.store.clear_error(op.field());
        logger.log_completion("description generated");
        Ok(description)
    }

    pub async fn generate_timestamps(&self) -> WizardResult<String> {
        let op = Operation::GenerateTimestamps;
        let (video_id, _guard) = self.prepare_generate(op)?;
        let logger = WizardLogger::new(&video_id, op);
        logger.log_start("generating chapter timestamps");

        let result = self.gateway.generate_timestamps(&video_id)
            .instrument(logger.create_span())
            .await;
        let timestamps = self.settle(&logger, result)?;

        self.store.update_content(|c| WizardContent {
            timestamps: timestamps.clone(),
            ..c.clone()
        });
        self.store.clear_error(op.field());
        logger.log_completion("timestamps generated");
        Ok(timestamps)
    }

    pub async fn generate_thumbnails(&self) -> WizardResult<Vec<String>> {
        let op = Operation::GenerateThumbnails;
        let (video_id, _guard) = self.prepare_generate(op)?;
        let logger = WizardLogger::new(&video_id, op);
        logger.log_start("generating thumbnail batch");

        let result = self.gateway.generate_thumbnails(&video_id)
            .instrument(logger.create_span())
            .await;
        let thumbnails = self.settle(&logger, result)?;

        self.store.update_content(|c| WizardContent {
            thumbnails: thumbnails.clone(),
            ..c.clone()
        });
        self.store.clear_error(op.field());
        logger.log_completion(&format!("{} thumbnails", thumbnails.len()));
        Ok(thumbnails)
    }

    fn prepare_generate(&self, op: Operation) -> WizardResult<(VideoId, InFlight)> {
        let video_id = self.require_video(op.field())?;
        let guard = self.store.begin(op)?;
        Ok((video_id, guard))
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub fn select_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|c| WizardContent {
            selected_title: title,
            ..c.clone()
        });
    }

    pub fn set_custom_title(&self, title: impl Into<String>) {
        self.patch(UploadStatePatch {
            custom_title: Some(title.into()),
            ..Default::default()
        });
    }

    /// Make the user's own title the selected one.
    pub fn apply_custom_title(&self) {
        if !self.is_mounted() {
            return;
        }
        self.store.update_with(|s| {
            UploadStatePatch::content(WizardContent {
                selected_title: s.custom_title.clone(),
                ..s.content.clone()
            })
        });
    }

    /// Edit the canonical description text.
    pub fn edit_description(&self, text: impl Into<String>) {
        let text = text.into();
        self.edit(|c| WizardContent {
            description: text,
            ..c.clone()
        });
    }

    pub fn set_custom_description(&self, text: impl Into<String>) {
        self.patch(UploadStatePatch {
            custom_description: Some(text.into()),
            ..Default::default()
        });
    }

    /// Template used by the next description generation. Blank clears it.
    pub fn set_description_template(&self, template: impl Into<String>) {
        self.patch(UploadStatePatch {
            custom_description_template: Some(template.into()),
            ..Default::default()
        });
    }

    pub fn edit_timestamps(&self, text: impl Into<String>) {
        let text = text.into();
        self.edit(|c| WizardContent {
            timestamps: text,
            ..c.clone()
        });
    }

    pub fn set_custom_timestamps(&self, text: impl Into<String>) {
        self.patch(UploadStatePatch {
            custom_timestamps: Some(text.into()),
            ..Default::default()
        });
    }

    /// Select a generated thumbnail. Replaces any previous selection and
    /// revokes a previously picked custom image.
    pub fn select_thumbnail(&self, url: impl Into<String>) {
        if !self.is_mounted() {
            return;
        }
        let url = url.into();
        {
            let mut custom = self.custom_thumbnail.lock();
            if custom.as_ref().is_some_and(|lease| lease.url() != url) {
                custom.take();
            }
        }
        self.edit(|c| WizardContent {
            selected_thumbnail: url,
            ..c.clone()
        });
    }

    /// Pick a local image as the thumbnail. Returns its blob URL.
    pub fn select_custom_thumbnail(&self, upload: ThumbnailUpload) -> WizardResult<String> {
        self.ensure_mounted()?;
        let lease = self.blobs.create(upload);
        let url = lease.url().to_string();
        // Replacing the old lease revokes its URL
        *self.custom_thumbnail.lock() = Some(lease);
        self.edit(|c| WizardContent {
            selected_thumbnail: url.clone(),
            ..c.clone()
        });
        Ok(url)
    }

    /// Blob URL of the current custom thumbnail, if one is held.
    pub fn custom_thumbnail_url(&self) -> Option<String> {
        self.custom_thumbnail
            .lock()
            .as_ref()
            .map(|lease| lease.url().to_string())
    }

    fn custom_upload(&self, url: &str) -> Option<ThumbnailUpload> {
        self.custom_thumbnail
            .lock()
            .as_ref()
            .filter(|lease| lease.url() == url)
            .and_then(BlobLease::upload)
    }

    fn edit(&self, f: impl FnOnce(&WizardContent) -> WizardContent) {
        if self.is_mounted() {
            self.store.update_content(f);
        }
    }

    fn patch(&self, patch: UploadStatePatch) {
        if self.is_mounted() {
            self.store.update_state(patch);
        }
    }

    // ========================================================================
    // Saving
    // ========================================================================

    pub async fn save_title(&self) -> SaveOutcome {
        self.try_save_title().await.into()
    }

    pub async fn save_description(&self) -> SaveOutcome {
        self.try_save_description().await.into()
    }

    pub async fn save_timestamps(&self) -> SaveOutcome {
        self.try_save_timestamps().await.into()
    }

    /// Persist the selected thumbnail. A custom image is uploaded, a
    /// generated one is saved by URL.
    pub async fn save_thumbnail(&self) -> SaveOutcome {
        self.try_save_thumbnail().await.into()
    }

    pub async fn save_title_and_next(&self) -> SaveOutcome {
        self.save_step_and_next(WizardStep::Title).await
    }

    pub async fn save_description_and_next(&self) -> SaveOutcome {
        self.save_step_and_next(WizardStep::Description).await
    }

    pub async fn save_timestamps_and_next(&self) -> SaveOutcome {
        self.save_step_and_next(WizardStep::Timestamps).await
    }

    pub async fn save_thumbnail_and_next(&self) -> SaveOutcome {
        self.save_step_and_next(WizardStep::Thumbnail).await
    }

    /// "Save & Next" for whichever step is current.
    pub async fn save_and_next(&self) -> SaveOutcome {
        let step = self.store.read(|s| s.current_step);
        self.save_step_and_next(step).await
    }

    async fn save_step_and_next(&self, step: WizardStep) -> SaveOutcome {
        let outcome = match step {
            WizardStep::Title => self.save_title().await,
            WizardStep::Description => self.save_description().await,
            WizardStep::Timestamps => self.save_timestamps().await,
            WizardStep::Thumbnail => self.save_thumbnail().await,
            WizardStep::Upload | WizardStep::Preview => {
                return SaveOutcome::Failed(WizardError::NoSaveOnStep(step));
            }
        };
        if outcome.is_saved() {
            self.advance_from(step);
        }
        outcome
    }

    async fn try_save_title(&self) -> WizardResult<()> {
        let op = Operation::SaveTitle;
        let (video_id, title, _guard) = self.prepare_save(op, UploadState::effective_title)?;
        let logger = WizardLogger::new(&video_id, op);
        let result = self
            .gateway
            .save_title(&video_id, &title)
            .instrument(logger.create_span())
            .await;
        self.finish_save(&logger, result)
    }

    async fn try_save_description(&self) -> WizardResult<()> {
        let op = Operation::SaveDescription;
        let (video_id, description, _guard) =
            self.prepare_save(op, UploadState::effective_description)?;
        let logger = WizardLogger::new(&video_id, op);
        let result = self
            .gateway
            .save_description(&video_id, &description)
            .instrument(logger.create_span())
            .await;
        self.finish_save(&logger, result)
    }

    async fn try_save_timestamps(&self) -> WizardResult<()> {
        let op = Operation::SaveTimestamps;
        let (video_id, timestamps, _guard) =
            self.prepare_save(op, UploadState::effective_timestamps)?;
        let logger = WizardLogger::new(&video_id, op);
        let result = self
            .gateway
            .save_timestamps(&video_id, &timestamps)
            .instrument(logger.create_span())
            .await;
        self.finish_save(&logger, result)
    }

    async fn try_save_thumbnail(&self) -> WizardResult<()> {
        let op = Operation::SaveThumbnail;
        let (video_id, selected, _guard) =
            self.prepare_save(op, |s| s.content.selected_thumbnail.as_str())?;

        let logger = WizardLogger::new(&video_id, op);
        let result = if is_blob_url(&selected) {
            match self.custom_upload(&selected) {
                Some(upload) => {
                    self.gateway
                        .upload_thumbnail(&video_id, upload)
                        .instrument(logger.create_span())
                        .await
                }
                None => Err(GatewayError::invalid_argument(
                    "Custom thumbnail is no longer available",
                )),
            }
        } else {
            self.gateway
                .save_thumbnail(&video_id, &selected)
                .instrument(logger.create_span())
                .await
        };
        self.finish_save(&logger, result)
    }

    /// Check the save preconditions and mark `op` in flight.
    fn prepare_save(
        &self,
        op: Operation,
        value: impl FnOnce(&UploadState) -> &str,
    ) -> WizardResult<(VideoId, String, InFlight)> {
        let field = op.field();
        let (video_id, value) = self
            .store
            .read(|s| (s.video_id().cloned(), value(s).to_string()));

        let video_id = match video_id {
            Some(id) => id,
            None => return Err(self.reject(field, WizardError::MissingVideo)),
        };
        if value.trim().is_empty() {
            return Err(self.reject(field, WizardError::EmptyValue(field)));
        }

        let guard = self.store.begin(op)?;
        Ok((video_id, value, guard))
    }

    fn finish_save(&self, logger: &WizardLogger, result: GatewayResult<()>) -> WizardResult<()> {
        self.settle(logger, result)?;
        self.store.clear_error(logger.operation().field());
        logger.log_completion("saved");
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn current_step(&self) -> WizardStep {
        self.store.read(|s| s.current_step)
    }

    /// Move to the previous step. Returns the new step, or `None` when
    /// already on the first one.
    pub fn go_back(&self) -> Option<WizardStep> {
        if !self.is_mounted() {
            return None;
        }
        let mut moved = None;
        self.store.update_with(|s| match s.current_step.previous() {
            Some(prev) => {
                moved = Some(prev);
                UploadStatePatch::step(prev)
            }
            None => UploadStatePatch::default(),
        });
        moved
    }

    /// Jump to `step`, which must already have been reached through upload
    /// or "Save & Next".
    pub fn go_to(&self, step: WizardStep) -> WizardResult<()> {
        self.ensure_mounted()?;
        let mut outcome = Ok(());
        self.store.update_with(|s| {
            if step > s.furthest_step() {
                outcome = Err(WizardError::StepLocked {
                    current: s.current_step,
                    requested: step,
                });
                UploadStatePatch::default()
            } else {
                UploadStatePatch::step(step)
            }
        });
        outcome
    }

    fn advance_from(&self, step: WizardStep) {
        if !self.is_mounted() {
            return;
        }
        self.store.update_with(|s| match step.next() {
            Some(next) if s.current_step == step => {
                debug!(from = %step, to = %next, "Advancing wizard step");
                UploadStatePatch {
                    current_step: Some(next),
                    reached_step: Some(s.reached_step.max(next)),
                    ..Default::default()
                }
            }
            _ => UploadStatePatch::default(),
        });
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    pub fn set_privacy(&self, privacy: Privacy) {
        self.patch(UploadStatePatch {
            selected_privacy: Some(privacy),
            ..Default::default()
        });
    }

    pub fn set_publish_type(&self, publish_type: PublishType) {
        self.patch(UploadStatePatch {
            publish_type: Some(publish_type),
            ..Default::default()
        });
    }

    pub async fn load_playlists(&self) -> WizardResult<usize> {
        let op = Operation::LoadPlaylists;
        let _guard = self.store.begin(op)?;
        let logger = WizardLogger::pending(op);

        let result = self
            .gateway
            .list_playlists()
            .instrument(logger.create_span())
            .await;
        let playlists = self.settle(&logger, result)?;
        let count = playlists.len();

        self.store.update_with(|s| {
            let keep = s
                .selected_playlist
                .as_ref()
                .is_some_and(|id| playlists.iter().any(|p| &p.id == id));
            UploadStatePatch {
                selected_playlist: if keep { None } else { Some(None) },
                playlists: Some(playlists),
                ..Default::default()
            }
        });
        self.store.clear_error(op.field());
        logger.log_completion(&format!("{} playlists", count));
        Ok(count)
    }

    /// Choose the playlist to add the video to, or clear the choice.
    pub fn select_playlist(&self, playlist_id: Option<String>) -> WizardResult<()> {
        self.ensure_mounted()?;
        if let Some(id) = &playlist_id {
            let known = self
                .store
                .read(|s| s.playlists.is_empty() || s.playlists.iter().any(|p| &p.id == id));
            if !known {
                return Err(self.reject(Field::Playlist, WizardError::UnknownPlaylist(id.clone())));
            }
        }
        self.store.update_state(UploadStatePatch {
            selected_playlist: Some(playlist_id),
            ..Default::default()
        });
        self.store.clear_error(Field::Playlist);
        Ok(())
    }

    pub async fn publish(&self) -> WizardResult<()> {
        let op = Operation::Publish;
        self.require_step(WizardStep::Preview, "Publish")?;
        let video_id = self.require_video(op.field())?;

        let (privacy, publish_type, playlist_id) = self
            .store
            .read(|s| (s.selected_privacy, s.publish_type, s.selected_playlist.clone()));
        if let PublishType::Scheduled(at) = publish_type {
            if at <= Utc::now() {
                return Err(self.reject(op.field(), WizardError::InvalidSchedule));
            }
        }

        let _guard = self.store.begin(op)?;
        let logger = WizardLogger::new(&video_id, op);
        logger.log_start(privacy.as_str());

        let request = PublishRequest::new(privacy, publish_type, playlist_id);
        let result = self
            .gateway
            .publish(&video_id, &request)
            .instrument(logger.create_span())
            .await;
        self.settle(&logger, result)?;

        self.store.update_state(UploadStatePatch {
            published: Some(true),
            ..Default::default()
        });
        self.store.clear_error(op.field());
        logger.log_completion("published");
        Ok(())
    }

    // ========================================================================
    // Guards
    // ========================================================================

    fn ensure_mounted(&self) -> WizardResult<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(WizardError::Closed)
        }
    }

    fn require_video(&self, field: Field) -> WizardResult<VideoId> {
        match self.store.read(|s| s.video_id().cloned()) {
            Some(id) => Ok(id),
            None => Err(self.reject(field, WizardError::MissingVideo)),
        }
    }

    fn require_no_video(&self) -> WizardResult<()> {
        match self.store.read(|s| s.video_id().cloned()) {
            Some(id) => Err(self.reject(Field::Upload, WizardError::AlreadyUploaded(id))),
            None => Ok(()),
        }
    }

    fn require_step(&self, expected: WizardStep, action: &'static str) -> WizardResult<()> {
        let current = self.current_step();
        if current == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                action,
                expected,
                current,
            })
        }
    }

    /// Turn a gateway result into a wizard result, dropping it if the
    /// wizard was closed while the call was in flight.
    fn settle<T>(&self, logger: &WizardLogger, result: GatewayResult<T>) -> WizardResult<T> {
        if !self.is_mounted() {
            logger.log_warning("result arrived after close; discarded");
            return Err(WizardError::Closed);
        }
        result.map_err(|e| {
            logger.log_error(&e.to_string());
            self.reject(logger.operation().field(), e.into())
        })
    }

    /// Record `err` against `field` and hand it back.
    fn reject(&self, field: Field, err: WizardError) -> WizardError {
        if err.is_reportable() && self.is_mounted() {
            self.store.set_error(field, err.to_string());
        }
        err
    }
}
