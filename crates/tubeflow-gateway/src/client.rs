//! HTTP implementation of the backend gateway.
//!
//! Request pipeline:
//! - Bearer credential from the injected [`Session`]
//! - Uniform 401 handling (session cleared, logout handler invoked)
//! - Retry with backoff for idempotent reads
//! - Observability (tracing spans, metrics)
//! - Typed parsing of every response body

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, info_span, Instrument};

use tubeflow_models::{
    ApiKeyPreview, AuthorizationUrl, Playlist, PublishRequest, TokenRecord, UploadedVideo,
    VideoId, VideoSummary,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    BackendGateway, ProgressFn, ThumbnailUpload, UploadSource, THUMBNAIL_BATCH_SIZE,
};
use crate::metrics::{record_request, record_unauthorized};
use crate::session::Session;

/// Chunk size used when streaming uploads, and the progress granularity.
const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Longest response body excerpt kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TitlesResponse {
    titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionResponse {
    description: String,
}

#[derive(Debug, Deserialize)]
struct TimestampsResponse {
    timestamps: String,
}

#[derive(Debug, Deserialize)]
struct ThumbnailsResponse {
    thumbnails: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    videos: Vec<VideoSummary>,
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    playlists: Vec<Playlist>,
}

#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateRequest<'a> {
    template: &'a str,
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct DescriptionBody<'a> {
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct TimestampsBody<'a> {
    timestamps: &'a str,
}

#[derive(Debug, Serialize)]
struct ThumbnailBody<'a> {
    thumbnail_url: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiKeyBody<'a> {
    api_key: &'a str,
}

// =============================================================================
// Client
// =============================================================================

/// Backend gateway over HTTPS + JSON.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    config: GatewayConfig,
    session: Session,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish()
    }
}

impl HttpGateway {
    /// Create a new gateway.
    pub fn new(config: GatewayConfig, session: Session) -> GatewayResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("tubeflow-gateway/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(GatewayError::Network)?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    /// Create from environment variables.
    pub fn from_env(session: Session) -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env()?, session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn video_url(&self, video_id: &VideoId, suffix: &str) -> GatewayResult<String> {
        if video_id.is_blank() {
            return Err(GatewayError::invalid_argument("video id is required"));
        }
        Ok(self.url(&format!(
            "/api/videos/{}/{}",
            urlencoding::encode(video_id.as_str()),
            suffix
        )))
    }

    fn bearer(&self, operation: &str) -> GatewayResult<String> {
        match self.session.get() {
            Some(token) => Ok(token),
            None => {
                self.session.expire(operation);
                Err(GatewayError::unauthorized("no active session"))
            }
        }
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Attach the credential, send, and map non-success statuses.
    async fn send(&self, operation: &str, request: RequestBuilder) -> GatewayResult<Response> {
        let token = self.bearer(operation)?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            record_unauthorized(operation);
            self.session.expire(operation);
            return Err(GatewayError::unauthorized(truncate(&body)));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(1000);
            return Err(GatewayError::RateLimited(retry_after_ms));
        }

        Err(Self::handle_error_response(status, response).await)
    }

    async fn handle_error_response(status: StatusCode, response: Response) -> GatewayError {
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        GatewayError::from_http_status(status.as_u16(), format!("{} failed: {}", url, truncate(&body)))
    }

    /// Wrap a request future in a span and record metrics for it.
    async fn execute<T, F>(
        &self,
        operation: &'static str,
        video_id: Option<&VideoId>,
        fut: F,
    ) -> GatewayResult<T>
    where
        F: std::future::Future<Output = GatewayResult<T>>,
    {
        let span = match video_id {
            Some(id) => info_span!("gateway_request", operation = %operation, video_id = %id),
            None => info_span!("gateway_request", operation = %operation),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        if let Err(e) = &result {
            debug!(operation = %operation, "Gateway request failed: {}", e);
        }

        result
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("{} (body: {})", e, truncate(&body)))
        })
    }

    /// GET with retry.
    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: &str) -> GatewayResult<T> {
        self.config.retry.run(operation, move || async move {
            let response = self.send(operation, self.http.get(url)).await?;
            Self::parse_json(response).await
        })
        .await
    }

    async fn post_json<B, T>(&self, operation: &str, url: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(operation, self.http.post(url).json(body)).await?;
        Self::parse_json(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, operation: &str, url: &str) -> GatewayResult<T> {
        let response = self.send(operation, self.http.post(url)).await?;
        Self::parse_json(response).await
    }

    /// Mutation whose response body is ignored.
    async fn send_unit(&self, operation: &str, request: RequestBuilder) -> GatewayResult<()> {
        self.send(operation, request).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> GatewayResult<UploadedVideo> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        info!(filename = %filename, size_bytes = total, "Uploading video file");

        let body = reqwest::Body::wrap_stream(progress_stream(file, total, progress));
        let part = Part::stream_with_length(body, total)
            .file_name(filename.clone())
            .mime_str(video_mime(&filename))?;
        let form = Form::new().part("file", part);

        let request = self
            .http
            .post(self.url("/api/videos/upload"))
            .multipart(form);
        let response = self.send("upload_video", request).await?;
        Self::parse_json(response).await
    }
}

// =============================================================================
// BackendGateway
// =============================================================================

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn upload_video(
        &self,
        source: UploadSource,
        progress: Option<ProgressFn>,
    ) -> GatewayResult<UploadedVideo> {
        self.execute("upload_video", None, async {
            match &source {
                UploadSource::File(path) => self.upload_file(path, progress).await,
                UploadSource::Url(url) => {
                    info!(host = %url.host(), "Requesting backend download");
                    self.post_json(
                        "upload_video",
                        &self.url("/api/videos/download"),
                        &DownloadRequest { url: url.as_str() },
                    )
                    .await
                }
            }
        })
        .await
    }

    async fn generate_titles(&self, video_id: &VideoId) -> GatewayResult<Vec<String>> {
        self.execute("generate_titles", Some(video_id), async {
            let url = self.video_url(video_id, "titles/generate")?;
            let body: TitlesResponse = self.post_empty("generate_titles", &url).await?;
            let titles: Vec<String> = body
                .titles
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if titles.is_empty() {
                return Err(GatewayError::invalid_response("no titles returned"));
            }
            Ok(titles)
        })
        .await
    }

    async fn generate_description(&self, video_id: &VideoId) -> GatewayResult<String> {
        self.execute("generate_description", Some(video_id), async {
            let url = self.video_url(video_id, "description/generate")?;
            let body: DescriptionResponse = self.post_empty("generate_description", &url).await?;
            Ok(body.description)
        })
        .await
    }

    async fn regenerate_description_with_template(
        &self,
        video_id: &VideoId,
        template: &str,
    ) -> GatewayResult<String> {
        self.execute("regenerate_description", Some(video_id), async {
            let url = self.video_url(video_id, "description/regenerate")?;
            let body: DescriptionResponse = self
                .post_json("regenerate_description", &url, &TemplateRequest { template })
                .await?;
            Ok(body.description)
        })
        .await
    }

    async fn generate_timestamps(&self, video_id: &VideoId) -> GatewayResult<String> {
        self.execute("generate_timestamps", Some(video_id), async {
            let url = self.video_url(video_id, "timestamps/generate")?;
            let body: TimestampsResponse = self.post_empty("generate_timestamps", &url).await?;
            Ok(body.timestamps)
        })
        .await
    }

    async fn generate_thumbnails(&self, video_id: &VideoId) -> GatewayResult<Vec<String>> {
        self.execute("generate_thumbnails", Some(video_id), async {
            let url = self.video_url(video_id, "thumbnails/generate")?;
            let body: ThumbnailsResponse = self.post_empty("generate_thumbnails", &url).await?;
            validate_thumbnails(body.thumbnails)
        })
        .await
    }

    async fn save_title(&self, video_id: &VideoId, title: &str) -> GatewayResult<()> {
        self.execute("save_title", Some(video_id), async {
            let url = self.video_url(video_id, "title")?;
            self.send_unit("save_title", self.http.put(url).json(&TitleBody { title }))
                .await
        })
        .await
    }

    async fn save_description(&self, video_id: &VideoId, description: &str) -> GatewayResult<()> {
        self.execute("save_description", Some(video_id), async {
            let url = self.video_url(video_id, "description")?;
            self.send_unit(
                "save_description",
                self.http.put(url).json(&DescriptionBody { description }),
            )
            .await
        })
        .await
    }

    async fn save_timestamps(&self, video_id: &VideoId, timestamps: &str) -> GatewayResult<()> {
        self.execute("save_timestamps", Some(video_id), async {
            let url = self.video_url(video_id, "timestamps")?;
            self.send_unit(
                "save_timestamps",
                self.http.put(url).json(&TimestampsBody { timestamps }),
            )
            .await
        })
        .await
    }

    async fn save_thumbnail(&self, video_id: &VideoId, thumbnail_url: &str) -> GatewayResult<()> {
        self.execute("save_thumbnail", Some(video_id), async {
            let url = self.video_url(video_id, "thumbnail")?;
            self.send_unit(
                "save_thumbnail",
                self.http.put(url).json(&ThumbnailBody { thumbnail_url }),
            )
            .await
        })
        .await
    }

    async fn upload_thumbnail(
        &self,
        video_id: &VideoId,
        upload: ThumbnailUpload,
    ) -> GatewayResult<()> {
        self.execute("upload_thumbnail", Some(video_id), async {
            let url = self.video_url(video_id, "thumbnail/upload")?;
            let part = Part::bytes(upload.bytes)
                .file_name(upload.filename)
                .mime_str(&upload.mime)?;
            let form = Form::new().part("file", part);
            self.send_unit("upload_thumbnail", self.http.post(url).multipart(form))
                .await
        })
        .await
    }

    async fn publish(&self, video_id: &VideoId, request: &PublishRequest) -> GatewayResult<()> {
        self.execute("publish", Some(video_id), async {
            let url = self.video_url(video_id, "publish")?;
            self.send_unit("publish", self.http.post(url).json(request))
                .await
        })
        .await
    }

    async fn list_videos(&self) -> GatewayResult<Vec<VideoSummary>> {
        self.execute("list_videos", None, async {
            let body: VideosResponse = self.get_json("list_videos", &self.url("/api/videos")).await?;
            Ok(body.videos)
        })
        .await
    }

    async fn list_playlists(&self) -> GatewayResult<Vec<Playlist>> {
        self.execute("list_playlists", None, async {
            let body: PlaylistsResponse = self
                .get_json("list_playlists", &self.url("/api/playlists"))
                .await?;
            Ok(body.playlists)
        })
        .await
    }

    async fn get_key(&self) -> GatewayResult<Option<ApiKeyPreview>> {
        self.execute("get_key", None, async {
            match self
                .get_json::<ApiKeyPreview>("get_key", &self.url("/api/gemini-key"))
                .await
            {
                Ok(preview) => Ok(Some(preview)),
                Err(GatewayError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn save_key(&self, key: &str) -> GatewayResult<()> {
        self.execute("save_key", None, async {
            let key = non_blank_key(key)?;
            self.send_unit(
                "save_key",
                self.http
                    .post(self.url("/api/gemini-key"))
                    .json(&ApiKeyBody { api_key: key }),
            )
            .await
        })
        .await
    }

    async fn update_key(&self, key: &str) -> GatewayResult<()> {
        self.execute("update_key", None, async {
            let key = non_blank_key(key)?;
            self.send_unit(
                "update_key",
                self.http
                    .put(self.url("/api/gemini-key"))
                    .json(&ApiKeyBody { api_key: key }),
            )
            .await
        })
        .await
    }

    async fn delete_key(&self) -> GatewayResult<()> {
        self.execute("delete_key", None, async {
            self.send_unit("delete_key", self.http.delete(self.url("/api/gemini-key")))
                .await
        })
        .await
    }

    async fn get_token(&self) -> GatewayResult<TokenRecord> {
        self.execute("get_token", None, async {
            self.get_json("get_token", &self.url("/api/youtube/token"))
                .await
        })
        .await
    }

    async fn refresh_token(&self) -> GatewayResult<TokenRecord> {
        self.execute("refresh_token", None, async {
            self.post_empty("refresh_token", &self.url("/api/youtube/token/refresh"))
                .await
        })
        .await
    }

    async fn create_token(&self) -> GatewayResult<AuthorizationUrl> {
        self.execute("create_token", None, async {
            self.post_empty("create_token", &self.url("/api/youtube/token/create"))
                .await
        })
        .await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_thumbnails(thumbnails: Vec<String>) -> GatewayResult<Vec<String>> {
    if thumbnails.len() != THUMBNAIL_BATCH_SIZE {
        return Err(GatewayError::invalid_response(format!(
            "expected {} thumbnails, got {}",
            THUMBNAIL_BATCH_SIZE,
            thumbnails.len()
        )));
    }
    if thumbnails.iter().any(|t| t.trim().is_empty()) {
        return Err(GatewayError::invalid_response("empty thumbnail reference"));
    }
    Ok(thumbnails)
}

fn non_blank_key(key: &str) -> GatewayResult<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(GatewayError::invalid_argument("API key cannot be empty"));
    }
    Ok(key)
}

/// Read `reader` in chunks, reporting the share of `total` handed to the
/// transport after each one.
fn progress_stream<R>(
    reader: R,
    total: u64,
    progress: Option<ProgressFn>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static
where
    R: AsyncRead + Send + Sync + 'static,
{
    let total = total.max(1);
    let mut sent = 0u64;

    ReaderStream::with_capacity(reader, UPLOAD_CHUNK_SIZE).map(move |chunk| {
        if let (Ok(bytes), Some(report)) = (&chunk, &progress) {
            sent += bytes.len() as u64;
            report(((sent * 100) / total).min(100) as u8);
        }
        chunk
    })
}

fn video_mime(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_validate_thumbnails_requires_full_batch() {
        let four: Vec<String> = (0..4).map(|i| format!("https://img/{}.jpg", i)).collect();
        assert!(matches!(
            validate_thumbnails(four),
            Err(GatewayError::InvalidResponse(_))
        ));

        let mut five: Vec<String> = (0..5).map(|i| format!("https://img/{}.jpg", i)).collect();
        assert_eq!(validate_thumbnails(five.clone()).unwrap().len(), 5);

        five[2] = " ".into();
        assert!(validate_thumbnails(five).is_err());
    }

    #[tokio::test]
    async fn test_progress_stream_reads_in_chunks() {
        let size = UPLOAD_CHUNK_SIZE * 2 + 1000;
        let reports = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&reports);
        let progress: ProgressFn = Arc::new(move |pct| seen.lock().push(pct));

        let reader = std::io::Cursor::new(vec![1u8; size]);
        let chunks: Vec<Bytes> = progress_stream(reader, size as u64, Some(progress))
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert!(chunks.iter().all(|c| c.len() <= UPLOAD_CHUNK_SIZE));
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), size);

        let reports = reports.lock().clone();
        assert_eq!(reports.len(), chunks.len());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last(), Some(&100));
    }

    #[test]
    fn test_video_mime() {
        assert_eq!(video_mime("clip.MP4"), "video/mp4");
        assert_eq!(video_mime("clip.mov"), "video/quicktime");
        assert_eq!(video_mime("clip"), "application/octet-stream");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(ERROR_BODY_LIMIT);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= ERROR_BODY_LIMIT + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_non_blank_key() {
        assert_eq!(non_blank_key("  AIza123 ").unwrap(), "AIza123");
        assert!(non_blank_key("   ").is_err());
    }

    #[test]
    fn test_video_url_rejects_blank_id() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://localhost:1"), Session::default())
            .unwrap();
        assert!(matches!(
            gateway.video_url(&VideoId::from(""), "title"),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert_eq!(
            gateway.video_url(&VideoId::from("a b"), "title").unwrap(),
            "http://localhost:1/api/videos/a%20b/title"
        );
    }
}
