//! Tubeflow CLI: drive the upload wizard and manage credentials.
//!
//! Set TUBEFLOW_API_URL and TUBEFLOW_TOKEN (or pass --token).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use tubeflow_cli::run::{run_wizard, RunPlan};
use tubeflow_cli::{init_tracing, truncate};
use tubeflow_gateway::{BackendGateway, HttpGateway, Session};
use tubeflow_models::Privacy;
use tubeflow_wizard::{CredentialsPanel, TokenStatus, UploadWizard};

#[derive(Parser)]
#[command(name = "tubeflow", about = "Upload, describe and publish videos to YouTube")]
struct Cli {
    /// Session token for the Tubeflow backend
    #[arg(long, env = "TUBEFLOW_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload wizard end to end
    Upload {
        /// Video file path or http(s) URL
        source: String,
        /// Use this title instead of a generated suggestion
        #[arg(long)]
        title: Option<String>,
        /// Which generated title to pick
        #[arg(long, default_value = "0")]
        title_index: usize,
        /// Style template for the generated description
        #[arg(long)]
        template: Option<String>,
        /// Which generated thumbnail to pick
        #[arg(long, default_value = "0", conflicts_with = "thumbnail_file")]
        thumbnail_index: usize,
        /// Upload this image as the thumbnail instead
        #[arg(long)]
        thumbnail_file: Option<PathBuf>,
        /// public, private or unlisted
        #[arg(long, default_value = "private")]
        privacy: Privacy,
        /// Publish at this RFC 3339 time instead of now
        #[arg(long)]
        schedule: Option<DateTime<Utc>>,
        /// Add the video to this playlist id
        #[arg(long)]
        playlist: Option<String>,
        /// Save everything but stop before publishing
        #[arg(long)]
        no_publish: bool,
    },
    /// List uploaded videos
    Videos,
    /// List YouTube playlists
    Playlists,
    /// Manage the AI provider API key
    Key {
        #[command(subcommand)]
        sub: KeyCommands,
    },
    /// Manage the YouTube connection
    Youtube {
        #[command(subcommand)]
        sub: YoutubeCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Show the masked key
    Show,
    /// Store a key, replacing any existing one
    Set {
        key: String,
    },
    /// Delete the stored key
    Delete,
}

#[derive(Subcommand)]
enum YoutubeCommands {
    /// Show the token status
    Status,
    /// Print the authorization URL to connect an account
    Connect,
    /// Refresh the access token
    Refresh,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn build_gateway(token: Option<String>) -> anyhow::Result<Arc<HttpGateway>> {
    let on_unauthorized = |operation: &str| {
        warn!(operation = %operation, "Session rejected");
        eprintln!("Session expired during {}. Sign in again and update TUBEFLOW_TOKEN.", operation);
    };
    let session = match token {
        Some(token) => Session::initialize(token, on_unauthorized),
        None => Session::new(on_unauthorized),
    };
    let gateway = HttpGateway::from_env(session)
        .context("Failed to create gateway. Check TUBEFLOW_API_URL")?;
    info!(base_url = %gateway.base_url(), "Gateway ready");
    Ok(Arc::new(gateway))
}

async fn key_command<G: BackendGateway>(panel: &CredentialsPanel<G>, sub: KeyCommands) -> anyhow::Result<()> {
    match sub {
        KeyCommands::Show => match panel.refresh_key().await? {
            Some(preview) => println!("{}", preview.preview),
            None => println!("No API key stored"),
        },
        KeyCommands::Set { key } => {
            let preview = panel.store_key(&key).await?;
            println!(
                "Stored key {}",
                preview.map(|p| p.preview).unwrap_or_default()
            );
        }
        KeyCommands::Delete => {
            panel.remove_key().await?;
            println!("API key deleted");
        }
    }
    Ok(())
}

async fn youtube_command<G: BackendGateway>(
    panel: &CredentialsPanel<G>,
    sub: YoutubeCommands,
) -> anyhow::Result<()> {
    match sub {
        YoutubeCommands::Status => {
            panel.refresh_token_status().await?;
            match panel.snapshot().token_status(Utc::now()) {
                TokenStatus::Missing => println!("Not connected"),
                TokenStatus::Expired => println!("Connected, token expired (run `tubeflow youtube refresh`)"),
                TokenStatus::Valid { remaining_secs } => {
                    println!("Connected, token valid for {}s", remaining_secs)
                }
            }
        }
        YoutubeCommands::Connect => {
            let url = panel.connect_youtube().await?;
            println!("Open this URL to connect your YouTube account:\n{}", url);
        }
        YoutubeCommands::Refresh => {
            let token = panel.refresh_youtube_token().await?;
            println!("Token refreshed, expires at {}", token.expires_at);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let gateway = build_gateway(cli.token)?;

    match cli.command {
        Commands::Upload {
            source,
            title,
            title_index,
            template,
            thumbnail_index,
            thumbnail_file,
            privacy,
            schedule,
            playlist,
            no_publish,
        } => {
            let plan = RunPlan {
                source,
                title,
                title_index,
                description_template: template,
                thumbnail_index,
                thumbnail_file,
                privacy,
                scheduled_at: schedule,
                playlist,
                publish: !no_publish,
            };
            let wizard = UploadWizard::new(Arc::clone(&gateway));
            let summary = run_wizard(&wizard, &plan).await?;
            let preview = &summary.preview;

            println!("Video:       {}", summary.video_id);
            println!("Title:       {}", preview.title);
            println!("Description: {}", truncate(&preview.description, 120));
            if let Some(thumbnail) = &preview.thumbnail {
                println!("Thumbnail:   {}", thumbnail);
            }
            println!("Privacy:     {}", preview.privacy);
            if let Some(at) = preview.publish_type.scheduled_at() {
                println!("Scheduled:   {}", at.to_rfc3339());
            }
            println!(
                "Status:      {}",
                if preview.published { "published" } else { "saved, not published" }
            );
        }
        Commands::Videos => {
            let videos = gateway.list_videos().await?;
            print_json(&videos)?;
        }
        Commands::Playlists => {
            let playlists = gateway.list_playlists().await?;
            print_json(&playlists)?;
        }
        Commands::Key { sub } => {
            let panel = CredentialsPanel::new(gateway);
            key_command(&panel, sub).await?;
        }
        Commands::Youtube { sub } => {
            let panel = CredentialsPanel::new(gateway);
            youtube_command(&panel, sub).await?;
        }
    }

    Ok(())
}
