//! Bunny Stream CLI.
//!
//! Reads BUNNY_STREAM_ACCESS_KEY, BUNNY_STREAM_LIBRARY_ID and optionally
//! BUNNY_STREAM_BASE_URL. Every command prints the response envelope as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bunny_stream_cli::{
    default_title, format_progress, guess_filetype, init_tracing, print_envelope, print_json,
};
use bunny_stream_client::stream::{
    CollectionListParams, CollectionParams, CreateCollectionParams, CreateVideoParams,
    FetchVideoParams, UpdateCollectionParams, VideoListParams, VideoParams,
    VideoStatisticsParams,
};
use bunny_stream_client::upload::{
    JsonFileRecordStore, UploadJob, UploadMetadata, UploadSource, UploadState,
};
use bunny_stream_client::{ApiClient, BunnyStreamClient};
use bunny_stream_core::ClientOptions;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "bunny", about = "Bunny Stream API CLI")]
struct Cli {
    /// Library ID (overrides BUNNY_STREAM_LIBRARY_ID)
    #[arg(long, global = true)]
    library_id: Option<u64>,
    /// API base URL (overrides BUNNY_STREAM_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collection operations
    Collections {
        #[command(subcommand)]
        sub: CollectionCommands,
    },
    /// Video operations
    Videos {
        #[command(subcommand)]
        sub: VideoCommands,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// List collections
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        order_by: Option<String>,
    },
    /// Get a collection by ID
    Get { collection_id: String },
    /// Create a collection
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// Rename a collection
    Update { collection_id: String, name: String },
    /// Delete a collection
    Delete { collection_id: String },
}

#[derive(Subcommand)]
enum VideoCommands {
    /// List videos
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Only videos in this collection
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        order_by: Option<String>,
    },
    /// Get a video by ID
    Get { video_id: String },
    /// Create an empty video object
    Create {
        title: String,
        #[arg(long)]
        collection: Option<String>,
        /// Thumbnail time passed through to the API
        #[arg(long)]
        thumbnail_time: Option<u64>,
    },
    /// Delete a video
    Delete { video_id: String },
    /// Get the watch heatmap of a video
    Heatmap { video_id: String },
    /// Get library statistics, optionally for one video
    Statistics {
        #[arg(long)]
        video: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        hourly: bool,
    },
    /// Re-encode a video
    Reencode { video_id: String },
    /// Fetch a video from a remote URL
    Fetch {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        thumbnail_time: Option<u64>,
    },
    /// Upload a file, creating the video object unless --video-id is given
    Upload {
        /// Path to the video file
        file: PathBuf,
        #[arg(long)]
        video_id: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        thumbnail_time: Option<u64>,
        /// MIME type (guessed from the extension by default)
        #[arg(long)]
        filetype: Option<String>,
        /// File recording unfinished uploads so they can resume
        #[arg(long, default_value = ".bunny-uploads.json")]
        state_file: PathBuf,
    },
}

fn build_client(cli: &Cli, state_file: Option<PathBuf>) -> anyhow::Result<BunnyStreamClient> {
    let mut options = ClientOptions::new();
    if let Some(base_url) = &cli.base_url {
        options = options.base_url(base_url.clone());
    }
    if let Some(library_id) = cli.library_id {
        options = options.library_id(library_id);
    }

    let settings = options.resolve().context(
        "Failed to configure client. Set BUNNY_STREAM_ACCESS_KEY and BUNNY_STREAM_LIBRARY_ID",
    )?;
    let client = match state_file {
        Some(path) => {
            let store = JsonFileRecordStore::new(path);
            tracing::debug!(state_file = %store.path().display(), "Recording uploads for resume");
            ApiClient::from_settings_with_store(settings, Arc::new(store))?
        }
        None => ApiClient::from_settings(settings)?,
    };
    Ok(BunnyStreamClient::from_client(client))
}

async fn run_collections(client: &BunnyStreamClient, sub: CollectionCommands) -> anyhow::Result<()> {
    let collections = client.collections();
    match sub {
        CollectionCommands::List {
            page,
            per_page,
            search,
            order_by,
        } => {
            let envelope = collections
                .get_list(CollectionListParams {
                    page,
                    items_per_page: per_page,
                    search,
                    order_by,
                    ..Default::default()
                })
                .await?;
            print_envelope(&envelope)
        }
        CollectionCommands::Get { collection_id } => {
            print_envelope(&collections.get(CollectionParams::new(collection_id)).await?)
        }
        CollectionCommands::Create { name } => {
            let envelope = collections
                .create(CreateCollectionParams {
                    library_id: None,
                    name,
                })
                .await?;
            print_envelope(&envelope)
        }
        CollectionCommands::Update {
            collection_id,
            name,
        } => {
            let envelope = collections
                .update(UpdateCollectionParams {
                    library_id: None,
                    collection_id,
                    name,
                })
                .await?;
            print_envelope(&envelope)
        }
        CollectionCommands::Delete { collection_id } => {
            print_envelope(&collections.delete(CollectionParams::new(collection_id)).await?)
        }
    }
}

async fn run_videos(client: &BunnyStreamClient, sub: VideoCommands) -> anyhow::Result<()> {
    let videos = client.videos();
    match sub {
        VideoCommands::List {
            page,
            per_page,
            search,
            collection,
            order_by,
        } => {
            let envelope = videos
                .get_list(VideoListParams {
                    library_id: None,
                    page,
                    items_per_page: per_page,
                    search,
                    collection,
                    order_by,
                })
                .await?;
            print_envelope(&envelope)
        }
        VideoCommands::Get { video_id } => {
            print_envelope(&videos.get(VideoParams::new(video_id)).await?)
        }
        VideoCommands::Create {
            title,
            collection,
            thumbnail_time,
        } => {
            let envelope = videos
                .create(CreateVideoParams {
                    library_id: None,
                    title,
                    collection_id: collection,
                    thumbnail_time,
                })
                .await?;
            print_envelope(&envelope)
        }
        VideoCommands::Delete { video_id } => {
            print_envelope(&videos.delete(VideoParams::new(video_id)).await?)
        }
        VideoCommands::Heatmap { video_id } => {
            print_envelope(&videos.get_heatmap(VideoParams::new(video_id)).await?)
        }
        VideoCommands::Statistics {
            video,
            from,
            to,
            hourly,
        } => {
            let envelope = videos
                .get_statistics(VideoStatisticsParams {
                    library_id: None,
                    video_guid: video,
                    date_from: from,
                    date_to: to,
                    hourly: hourly.then_some(true),
                })
                .await?;
            print_envelope(&envelope)
        }
        VideoCommands::Reencode { video_id } => {
            print_envelope(&videos.reencode(VideoParams::new(video_id)).await?)
        }
        VideoCommands::Fetch {
            url,
            title,
            collection,
            thumbnail_time,
        } => {
            let envelope = videos
                .fetch(FetchVideoParams {
                    library_id: None,
                    collection_id: collection,
                    thumbnail_time,
                    url,
                    headers: None,
                    title,
                })
                .await?;
            print_envelope(&envelope)
        }
        VideoCommands::Upload {
            file,
            video_id,
            title,
            collection,
            thumbnail_time,
            filetype,
            ..
        } => {
            let title = title.unwrap_or_else(|| default_title(&file));
            let video_id = match video_id {
                Some(id) => id,
                None => {
                    let created = videos
                        .create(CreateVideoParams {
                            library_id: None,
                            title: title.clone(),
                            collection_id: collection.clone(),
                            thumbnail_time,
                        })
                        .await?;
                    if created.error().is_some() {
                        return print_envelope(&created);
                    }
                    let guid = created
                        .data()
                        .map(|video| video.guid.clone())
                        .filter(|guid| !guid.is_empty())
                        .context("Created video has no guid")?;
                    tracing::info!(video_id = %guid, "Created video object");
                    guid
                }
            };

            let mut metadata = UploadMetadata::new(
                filetype.unwrap_or_else(|| guess_filetype(&file).to_string()),
                title,
            );
            if let Some(collection) = collection {
                metadata = metadata.collection(collection);
            }
            if let Some(seconds) = thumbnail_time {
                metadata = metadata.thumbnail_time(seconds);
            }

            let job = UploadJob::new(video_id.clone(), UploadSource::Path(file), metadata)
                .on_progress(|uploaded, total| {
                    eprint!("\r{}", format_progress(uploaded, total));
                })
                .on_error(|error| {
                    eprintln!();
                    tracing::error!(error = %error, "Upload failed");
                });

            let handle = videos.upload(job).await.context("Failed to start upload")?;
            let state = handle.wait().await;
            eprintln!();

            print_json(&json!({ "videoId": video_id, "state": format!("{:?}", state) }))?;
            if state != UploadState::Succeeded {
                anyhow::bail!("Upload did not complete");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let state_file = match &cli.command {
        Commands::Videos {
            sub: VideoCommands::Upload { state_file, .. },
        } => Some(state_file.clone()),
        _ => None,
    };
    let client = build_client(&cli, state_file)?;

    match cli.command {
        Commands::Collections { sub } => run_collections(&client, sub).await,
        Commands::Videos { sub } => run_videos(&client, sub).await,
    }
}
