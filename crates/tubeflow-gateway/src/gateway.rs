//! The backend operations the wizard depends on.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use tubeflow_models::{
    ApiKeyPreview, AuthorizationUrl, Playlist, PublishRequest, SourceUrl, TokenRecord,
    UploadedVideo, VideoId, VideoSummary,
};

use crate::error::GatewayResult;

/// Number of thumbnails the backend produces per generation call.
pub const THUMBNAIL_BATCH_SIZE: usize = 5;

/// Callback receiving upload progress as a percentage (0-100).
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// What to upload.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A local video file, streamed as multipart.
    File(PathBuf),
    /// A remote URL the backend downloads itself.
    Url(SourceUrl),
}

/// A client-side image picked as a custom thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

/// Backend gateway: upload, AI generation, persistence, publishing and
/// credential management.
///
/// Every implementation must attach the session credential and route 401
/// responses through the session's logout handler.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn upload_video(
        &self,
        source: UploadSource,
        progress: Option<ProgressFn>,
    ) -> GatewayResult<UploadedVideo>;

    async fn generate_titles(&self, video_id: &VideoId) -> GatewayResult<Vec<String>>;

    async fn generate_description(&self, video_id: &VideoId) -> GatewayResult<String>;

    async fn regenerate_description_with_template(
        &self,
        video_id: &VideoId,
        template: &str,
    ) -> GatewayResult<String>;

    async fn generate_timestamps(&self, video_id: &VideoId) -> GatewayResult<String>;

    /// Exactly [`THUMBNAIL_BATCH_SIZE`] image URLs or data URIs.
    async fn generate_thumbnails(&self, video_id: &VideoId) -> GatewayResult<Vec<String>>;

    async fn save_title(&self, video_id: &VideoId, title: &str) -> GatewayResult<()>;

    async fn save_description(&self, video_id: &VideoId, description: &str) -> GatewayResult<()>;

    async fn save_timestamps(&self, video_id: &VideoId, timestamps: &str) -> GatewayResult<()>;

    async fn save_thumbnail(&self, video_id: &VideoId, thumbnail_url: &str) -> GatewayResult<()>;

    async fn upload_thumbnail(
        &self,
        video_id: &VideoId,
        upload: ThumbnailUpload,
    ) -> GatewayResult<()>;

    async fn publish(&self, video_id: &VideoId, request: &PublishRequest) -> GatewayResult<()>;

    async fn list_videos(&self) -> GatewayResult<Vec<VideoSummary>>;

    async fn list_playlists(&self) -> GatewayResult<Vec<Playlist>>;

    /// `None` when no key is stored.
    async fn get_key(&self) -> GatewayResult<Option<ApiKeyPreview>>;

    async fn save_key(&self, key: &str) -> GatewayResult<()>;

    async fn update_key(&self, key: &str) -> GatewayResult<()>;

    async fn delete_key(&self) -> GatewayResult<()>;

    async fn get_token(&self) -> GatewayResult<TokenRecord>;

    async fn refresh_token(&self) -> GatewayResult<TokenRecord>;

    async fn create_token(&self) -> GatewayResult<AuthorizationUrl>;
}
