//! Wizard handler tests against a mocked backend gateway.

use std::io::Write;
use std::sync::Arc;

use chrono::{Duration, Utc};
use mockall::predicate::eq;

use tubeflow_gateway::{GatewayError, MockBackendGateway, ThumbnailUpload, UploadSource};
use tubeflow_models::{Playlist, Privacy, PublishType, UploadedVideo, VideoId, WizardStep};
use tubeflow_wizard::{
    Field, SaveOutcome, UploadState, UploadStore, UploadWizard, WizardError,
};

fn wizard(mock: MockBackendGateway) -> UploadWizard<MockBackendGateway> {
    UploadWizard::new(Arc::new(mock))
}

fn wizard_at(
    mock: MockBackendGateway,
    step: WizardStep,
    video_id: Option<&str>,
) -> UploadWizard<MockBackendGateway> {
    let store = UploadStore::with_state(UploadState {
        current_step: step,
        reached_step: step,
        uploaded_video: video_id.map(UploadedVideo::with_id),
        ..Default::default()
    });
    UploadWizard::with_store(Arc::new(mock), store)
}

fn is_v1(id: &VideoId) -> bool {
    id.as_str() == "v1"
}

// ============================================================================
// Example scenarios
// ============================================================================

#[tokio::test]
async fn test_upload_generate_select_and_save_title() {
    let mut mock = MockBackendGateway::new();
    mock.expect_upload_video()
        .withf(|source, _| matches!(source, UploadSource::Url(url) if url.host() == "cdn.example.com"))
        .times(1)
        .returning(|_, _| Ok(UploadedVideo::with_id("v1")));
    mock.expect_generate_titles()
        .withf(is_v1)
        .times(1)
        .returning(|_| Ok(vec!["A".into(), "B".into(), "C".into()]));
    mock.expect_save_title()
        .withf(|id, title| is_v1(id) && title == "B")
        .times(1)
        .returning(|_, _| Ok(()));

    let wizard = wizard(mock);

    wizard
        .upload_from_url("https://cdn.example.com/raw/clip.mp4")
        .await
        .unwrap();
    let state = wizard.snapshot();
    assert_eq!(state.current_step, WizardStep::Title);
    assert_eq!(state.video_id().map(VideoId::as_str), Some("v1"));
    assert_eq!(state.uploaded_file.unwrap().name, "clip.mp4");

    let titles = wizard.generate_titles().await.unwrap();
    assert_eq!(titles, vec!["A", "B", "C"]);

    wizard.select_title("B");
    let outcome = wizard.save_title_and_next().await;
    assert!(outcome.is_saved());

    let state = wizard.snapshot();
    assert_eq!(state.current_step, WizardStep::Description);
    assert_eq!(state.content.selected_title, "B");
    assert!(state.errors.is_empty());
    assert!(!state.loading.any());
}

#[tokio::test]
async fn test_failed_save_keeps_step_and_records_error() {
    let mut mock = MockBackendGateway::new();
    mock.expect_save_title()
        .times(1)
        .returning(|_, _| Err(GatewayError::ServerError(502, "bad gateway".into())));

    let wizard = wizard_at(mock, WizardStep::Title, Some("v1"));
    wizard.select_title("B");

    let outcome = wizard.save_title_and_next().await;
    assert!(matches!(outcome, SaveOutcome::Failed(WizardError::Gateway(_))));

    let state = wizard.snapshot();
    assert_eq!(state.current_step, WizardStep::Title);
    assert!(state.error(Field::Title).unwrap().contains("502"));
    assert!(!state.loading.any());
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn test_saves_without_video_never_call_gateway() {
    // No expectations: any gateway call panics
    let wizard = wizard_at(MockBackendGateway::new(), WizardStep::Title, None);
    wizard.select_title("B");
    wizard.edit_description("desc");
    wizard.edit_timestamps("00:00 Intro");
    wizard.select_thumbnail("https://cdn/t1.jpg");

    for outcome in [
        wizard.save_title_and_next().await,
        wizard.save_description().await,
        wizard.save_timestamps().await,
        wizard.save_thumbnail().await,
    ] {
        assert!(matches!(outcome, SaveOutcome::Failed(WizardError::MissingVideo)));
    }

    let state = wizard.snapshot();
    assert_eq!(state.current_step, WizardStep::Title);
    for field in [Field::Title, Field::Description, Field::Timestamps, Field::Thumbnail] {
        assert!(state.error(field).is_some(), "missing error for {}", field);
    }
}

#[tokio::test]
async fn test_generation_without_video_is_rejected() {
    let wizard = wizard_at(MockBackendGateway::new(), WizardStep::Title, None);

    assert!(matches!(
        wizard.generate_titles().await,
        Err(WizardError::MissingVideo)
    ));
    assert!(matches!(
        wizard.generate_thumbnails().await,
        Err(WizardError::MissingVideo)
    ));
}

#[tokio::test]
async fn test_empty_value_is_not_saved() {
    let wizard = wizard_at(MockBackendGateway::new(), WizardStep::Title, Some("v1"));

    let outcome = wizard.save_title().await;
    assert!(matches!(
        outcome,
        SaveOutcome::Failed(WizardError::EmptyValue(Field::Title))
    ));
}

// ============================================================================
// Generation
// ============================================================================

#[tokio::test]
async fn test_description_uses_template_when_set() {
    let mut mock = MockBackendGateway::new();
    mock.expect_regenerate_description_with_template()
        .withf(|id, template| is_v1(id) && template == "  Gaming channel style\n")
        .times(1)
        .returning(|_, _| Ok("templated".into()));
    mock.expect_generate_description().never();

    let wizard = wizard_at(mock, WizardStep::Description, Some("v1"));
    wizard.set_description_template("  Gaming channel style\n");

    let description = wizard.generate_description().await.unwrap();
    assert_eq!(description, "templated");
    assert_eq!(wizard.snapshot().content.description, "templated");
}

#[tokio::test]
async fn test_description_without_template_uses_plain_generation() {
    let mut mock = MockBackendGateway::new();
    mock.expect_generate_description()
        .with(eq(VideoId::from("v1")))
        .times(1)
        .returning(|_| Ok("plain".into()));
    mock.expect_regenerate_description_with_template().never();

    let wizard = wizard_at(mock, WizardStep::Description, Some("v1"));
    wizard.set_description_template("   ");

    assert_eq!(wizard.generate_description().await.unwrap(), "plain");
}

#[tokio::test]
async fn test_failed_generation_keeps_previous_content() {
    let mut mock = MockBackendGateway::new();
    let mut seq = mockall::Sequence::new();
    mock.expect_generate_titles()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(vec!["First".into()]));
    mock.expect_generate_titles()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(GatewayError::RateLimited(2000)));

    let wizard = wizard_at(mock, WizardStep::Title, Some("v1"));
    wizard.generate_titles().await.unwrap();
    assert!(wizard.generate_titles().await.is_err());

    let state = wizard.snapshot();
    assert_eq!(state.content.titles, vec!["First"]);
    assert!(state.error(Field::Title).is_some());
}

#[tokio::test]
async fn test_thumbnail_batch_is_stored() {
    let mut mock = MockBackendGateway::new();
    mock.expect_generate_thumbnails()
        .times(1)
        .returning(|_| Ok((1..=5).map(|i| format!("https://cdn/t{}.jpg", i)).collect()));

    let wizard = wizard_at(mock, WizardStep::Thumbnail, Some("v1"));
    let thumbnails = wizard.generate_thumbnails().await.unwrap();

    assert_eq!(thumbnails.len(), 5);
    assert_eq!(wizard.snapshot().content.thumbnails, thumbnails);
}

#[tokio::test]
async fn test_unauthorized_generation_is_reported() {
    let mut mock = MockBackendGateway::new();
    mock.expect_generate_timestamps()
        .times(1)
        .returning(|_| Err(GatewayError::unauthorized("session expired")));

    let wizard = wizard_at(mock, WizardStep::Timestamps, Some("v1"));
    let err = wizard.generate_timestamps().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(wizard.snapshot().error(Field::Timestamps).is_some());
}

// ============================================================================
// Step progression
// ============================================================================

#[tokio::test]
async fn test_save_and_next_walks_to_preview() {
    let mut mock = MockBackendGateway::new();
    mock.expect_save_title().times(1).returning(|_, _| Ok(()));
    mock.expect_save_description()
        .withf(|_, d| d == "desc")
        .times(1)
        .returning(|_, _| Ok(()));
    mock.expect_save_timestamps()
        .withf(|_, t| t == "00:00 Intro")
        .times(1)
        .returning(|_, _| Ok(()));
    mock.expect_save_thumbnail()
        .withf(|_, url| url == "https://cdn/t4.jpg")
        .times(1)
        .returning(|_, _| Ok(()));

    let wizard = wizard_at(mock, WizardStep::Title, Some("v1"));
    wizard.select_title("T");
    wizard.set_custom_description("desc");
    wizard.set_custom_timestamps("00:00 Intro");
    wizard.select_thumbnail("https://cdn/t4.jpg");

    let mut visited = vec![wizard.current_step()];
    while !wizard.current_step().is_terminal() {
        assert!(wizard.save_and_next().await.is_saved());
        visited.push(wizard.current_step());
    }
    assert_eq!(visited, WizardStep::ORDER[1..].to_vec());

    // Preview is terminal
    let outcome = wizard.save_and_next().await;
    assert!(matches!(
        outcome,
        SaveOutcome::Failed(WizardError::NoSaveOnStep(WizardStep::Preview))
    ));
    assert_eq!(wizard.current_step(), WizardStep::Preview);
}

#[tokio::test]
async fn test_back_navigation_then_resave() {
    let mut mock = MockBackendGateway::new();
    mock.expect_save_title().times(2).returning(|_, _| Ok(()));

    let wizard = wizard_at(mock, WizardStep::Title, Some("v1"));
    wizard.select_title("T");
    assert!(wizard.save_title_and_next().await.is_saved());
    assert_eq!(wizard.go_back(), Some(WizardStep::Title));

    wizard.select_title("T2");
    assert!(wizard.save_title_and_next().await.is_saved());
    assert_eq!(wizard.current_step(), WizardStep::Description);
    assert_eq!(wizard.snapshot().content.selected_title, "T2");
}

#[tokio::test]
async fn test_back_to_upload_and_forward_again() {
    let mut mock = MockBackendGateway::new();
    mock.expect_upload_video()
        .times(1)
        .returning(|_, _| Ok(UploadedVideo::with_id("v1")));
    mock.expect_save_title().times(1).returning(|_, _| Ok(()));

    let wizard = wizard(mock);
    wizard.upload_from_url("https://cdn.example.com/clip.mp4").await.unwrap();
    wizard.select_title("T");
    assert!(wizard.save_title_and_next().await.is_saved());

    assert_eq!(wizard.go_back(), Some(WizardStep::Title));
    assert_eq!(wizard.go_back(), Some(WizardStep::Upload));

    // Nothing to save on the upload step; jumping forward is how to leave it
    assert!(matches!(
        wizard.save_and_next().await,
        SaveOutcome::Failed(WizardError::NoSaveOnStep(WizardStep::Upload))
    ));
    assert!(matches!(
        wizard.go_to(WizardStep::Timestamps),
        Err(WizardError::StepLocked {
            current: WizardStep::Upload,
            requested: WizardStep::Timestamps
        })
    ));

    wizard.go_to(WizardStep::Description).unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Description);
    assert_eq!(wizard.snapshot().video_id().map(VideoId::as_str), Some("v1"));
}

// ============================================================================
// Thumbnails
// ============================================================================

#[tokio::test]
async fn test_custom_thumbnail_is_uploaded_as_file() {
    let mut mock = MockBackendGateway::new();
    mock.expect_upload_thumbnail()
        .withf(|id, upload| is_v1(id) && upload.filename == "mine.png" && upload.bytes == [9, 9, 9])
        .times(1)
        .returning(|_, _| Ok(()));
    mock.expect_save_thumbnail().never();

    let wizard = wizard_at(mock, WizardStep::Thumbnail, Some("v1"));
    wizard
        .select_custom_thumbnail(ThumbnailUpload {
            bytes: vec![9, 9, 9],
            filename: "mine.png".into(),
            mime: "image/png".into(),
        })
        .unwrap();

    assert!(wizard.save_thumbnail_and_next().await.is_saved());
    assert_eq!(wizard.current_step(), WizardStep::Preview);
}

#[tokio::test]
async fn test_custom_thumbnail_revoked_when_wizard_dropped() {
    let wizard = wizard_at(MockBackendGateway::new(), WizardStep::Thumbnail, Some("v1"));
    let url = wizard
        .select_custom_thumbnail(ThumbnailUpload {
            bytes: vec![1],
            filename: "a.jpg".into(),
            mime: "image/jpeg".into(),
        })
        .unwrap();
    let registry = wizard.blobs().clone();
    assert!(registry.contains(&url));

    drop(wizard);
    assert_eq!(registry.live_count(), 0);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_file_reports_progress() {
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(&[0u8; 2048]).unwrap();
    let path = file.path().to_path_buf();

    let mut mock = MockBackendGateway::new();
    let expected = path.clone();
    mock.expect_upload_video()
        .withf(move |source, progress| {
            matches!(source, UploadSource::File(p) if *p == expected) && progress.is_some()
        })
        .times(1)
        .returning(|_, progress| {
            if let Some(report) = progress {
                report(40);
                report(100);
            }
            Ok(UploadedVideo::with_id("v1"))
        });

    let wizard = wizard(mock);
    let video = wizard.upload_file(&path).await.unwrap();
    assert_eq!(video.id.as_str(), "v1");

    let state = wizard.snapshot();
    assert_eq!(state.upload_progress, 100);
    assert_eq!(state.uploaded_file.unwrap().size_bytes, 2048);
    assert_eq!(state.current_step, WizardStep::Title);
}

#[tokio::test]
async fn test_upload_rejects_bad_url_without_calling_gateway() {
    let wizard = wizard(MockBackendGateway::new());

    let err = wizard.upload_from_url("ftp://example.com/a.mp4").await.unwrap_err();
    assert!(matches!(err, WizardError::InvalidUrl(_)));

    let state = wizard.snapshot();
    assert_eq!(state.current_step, WizardStep::Upload);
    assert!(state.error(Field::Upload).is_some());
}

#[tokio::test]
async fn test_upload_rejected_once_video_exists() {
    let mut mock = MockBackendGateway::new();
    mock.expect_upload_video().never();

    let wizard = wizard_at(mock, WizardStep::Title, Some("v1"));
    wizard.select_title("Title generated for v1");
    wizard.go_back();

    let err = wizard
        .upload_from_url("https://cdn.example.com/other.mp4")
        .await
        .unwrap_err();
    assert!(matches!(&err, WizardError::AlreadyUploaded(id) if is_v1(id)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.mp4");
    std::fs::write(&path, b"video").unwrap();
    assert!(matches!(
        wizard.upload_file(&path).await,
        Err(WizardError::AlreadyUploaded(_))
    ));

    let state = wizard.snapshot();
    assert_eq!(state.video_id().map(VideoId::as_str), Some("v1"));
    assert_eq!(state.content.selected_title, "Title generated for v1");
    assert!(state.error(Field::Upload).is_some());
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let wizard = wizard(MockBackendGateway::new());

    let err = wizard
        .upload_file(dir.path().join("missing.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Io(_)));
}

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn test_publish_sends_settings() {
    let mut mock = MockBackendGateway::new();
    mock.expect_list_playlists().times(1).returning(|| {
        Ok(vec![Playlist {
            id: "pl-1".into(),
            title: "Highlights".into(),
            item_count: Some(3),
        }])
    });
    mock.expect_publish()
        .withf(|id, request| {
            is_v1(id)
                && request.privacy == Privacy::Unlisted
                && request.scheduled_at.is_some()
                && request.playlist_id.as_deref() == Some("pl-1")
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let wizard = wizard_at(mock, WizardStep::Preview, Some("v1"));
    assert_eq!(wizard.load_playlists().await.unwrap(), 1);

    assert!(matches!(
        wizard.select_playlist(Some("pl-9".into())),
        Err(WizardError::UnknownPlaylist(_))
    ));
    wizard.select_playlist(Some("pl-1".into())).unwrap();
    wizard.set_privacy(Privacy::Unlisted);
    wizard.set_publish_type(PublishType::Scheduled(Utc::now() + Duration::days(1)));

    wizard.publish().await.unwrap();
    let state = wizard.snapshot();
    assert!(state.published);
    assert!(state.error(Field::Playlist).is_none());
}

#[tokio::test]
async fn test_publish_rejects_past_schedule() {
    let mut mock = MockBackendGateway::new();
    mock.expect_publish().never();

    let wizard = wizard_at(mock, WizardStep::Preview, Some("v1"));
    wizard.set_publish_type(PublishType::Scheduled(Utc::now() - Duration::minutes(5)));

    assert!(matches!(
        wizard.publish().await,
        Err(WizardError::InvalidSchedule)
    ));
    assert!(!wizard.snapshot().published);
}

#[tokio::test]
async fn test_publish_requires_preview_step() {
    let wizard = wizard_at(MockBackendGateway::new(), WizardStep::Thumbnail, Some("v1"));
    assert!(matches!(
        wizard.publish().await,
        Err(WizardError::WrongStep {
            expected: WizardStep::Preview,
            ..
        })
    ));
}
