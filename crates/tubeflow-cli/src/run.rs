//! Non-interactive wizard run: upload, generate, save and publish in one go.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use tubeflow_gateway::{BackendGateway, ThumbnailUpload};
use tubeflow_models::{Privacy, PublishType, VideoId, WizardStep};
use tubeflow_wizard::{PreviewSection, UploadWizard};

use crate::{image_mime, is_remote_source};

/// Choices for each wizard step.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    /// Local path or http(s) URL.
    pub source: String,
    /// Use this title instead of a generated one.
    pub title: Option<String>,
    pub title_index: usize,
    pub description_template: Option<String>,
    pub thumbnail_index: usize,
    pub thumbnail_file: Option<PathBuf>,
    pub privacy: Privacy,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub playlist: Option<String>,
    pub publish: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub video_id: VideoId,
    pub preview: PreviewSection,
}

pub async fn run_wizard<G: BackendGateway>(
    wizard: &UploadWizard<G>,
    plan: &RunPlan,
) -> Result<RunSummary> {
    // Upload
    let video = if is_remote_source(&plan.source) {
        wizard.upload_from_url(plan.source.trim()).await
    } else {
        wizard.upload_file(&plan.source).await
    }
    .with_context(|| format!("Upload of {} failed", plan.source))?;
    info!(video_id = %video.id, "Video uploaded");

    // Title
    match &plan.title {
        Some(title) => {
            wizard.set_custom_title(title.clone());
            wizard.apply_custom_title();
        }
        None => {
            let titles = wizard.generate_titles().await.context("Title generation failed")?;
            let title = pick(&titles, plan.title_index, "title")?;
            wizard.select_title(title);
        }
    }
    save_and_next(wizard, WizardStep::Title).await?;

    // Description
    if let Some(template) = &plan.description_template {
        wizard.set_description_template(template.clone());
    }
    wizard
        .generate_description()
        .await
        .context("Description generation failed")?;
    save_and_next(wizard, WizardStep::Description).await?;

    // Timestamps
    wizard
        .generate_timestamps()
        .await
        .context("Timestamp generation failed")?;
    save_and_next(wizard, WizardStep::Timestamps).await?;

    // Thumbnail
    match &plan.thumbnail_file {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "thumbnail".to_string());
            wizard.select_custom_thumbnail(ThumbnailUpload {
                bytes,
                filename,
                mime: image_mime(path).to_string(),
            })?;
        }
        None => {
            let thumbnails = wizard
                .generate_thumbnails()
                .await
                .context("Thumbnail generation failed")?;
            let url = pick(&thumbnails, plan.thumbnail_index, "thumbnail")?;
            wizard.select_thumbnail(url);
        }
    }
    save_and_next(wizard, WizardStep::Thumbnail).await?;

    // Preview
    if let Some(playlist) = &plan.playlist {
        wizard.load_playlists().await.context("Failed to load playlists")?;
        wizard.select_playlist(Some(playlist.clone()))?;
    }
    wizard.set_privacy(plan.privacy);
    wizard.set_publish_type(match plan.scheduled_at {
        Some(at) => PublishType::Scheduled(at),
        None => PublishType::Now,
    });

    if plan.publish {
        wizard.publish().await.context("Publish failed")?;
        info!(video_id = %video.id, privacy = %plan.privacy, "Video published");
    }

    Ok(RunSummary {
        video_id: video.id,
        preview: PreviewSection::from_state(&wizard.snapshot()),
    })
}

async fn save_and_next<G: BackendGateway>(wizard: &UploadWizard<G>, step: WizardStep) -> Result<()> {
    if wizard.current_step() != step {
        bail!("Expected the {} step, wizard is on {}", step, wizard.current_step());
    }
    wizard
        .save_and_next()
        .await
        .into_result()
        .with_context(|| format!("Saving {} failed", step))
}

fn pick<'a>(options: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    match options.get(index) {
        Some(option) => Ok(option.as_str()),
        None => bail!(
            "No {} at index {} ({} generated)",
            what,
            index,
            options.len()
        ),
    }
}
