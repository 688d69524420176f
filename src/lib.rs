pub mod backend;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod playback;
pub mod prefetch;
pub mod reply;
pub mod seen;
pub mod settings;
mod utils;

use std::{collections::HashSet, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use backend::{SqliteStoryBackend, StorageConfig};
use db::Database;
use models::MediaType;
use playback::{MediaStatus, PlayerEvent, StoryPlayer};
use settings::{PlaybackSettings, SettingsStore};

pub use error::{StoryError, StoryResult};

const DEFAULT_DATA_DIR: &str = "storyview-data";
const DEFAULT_VIEWER: &str = "viewer";

/// Process-wide setup shared by every viewing session.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub backend: Arc<SqliteStoryBackend>,
}

impl AppState {
    pub fn init(data_dir: PathBuf, viewer_id: String, storage: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("storyview.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let backend = Arc::new(SqliteStoryBackend::new(db.clone(), viewer_id, storage));

        Ok(Self {
            db,
            settings,
            backend,
        })
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        self.settings.playback().with_env_overrides()
    }
}

fn storage_from_env() -> StorageConfig {
    StorageConfig {
        base_url: std::env::var("STORYVIEW_STORAGE_URL").ok(),
        ..StorageConfig::default()
    }
}

/// Plays one story set headlessly, printing player events as JSON lines.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let segment_id = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: storyview <segment-id>"))?;
    let data_dir = std::env::var("STORYVIEW_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
    let viewer_id = std::env::var("STORYVIEW_VIEWER").unwrap_or_else(|_| DEFAULT_VIEWER.into());

    info!("storyview starting up as {viewer_id}...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let state = AppState::init(data_dir, viewer_id, storage_from_env())?;
        play(&state, &segment_id).await
    })
}

async fn play(state: &AppState, segment_id: &str) -> Result<()> {
    let player = StoryPlayer::builder(state.backend.clone())
        .settings(state.playback_settings())
        .open(segment_id)
        .await?;

    let result = tokio::select! {
        result = drive(&player) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };
    player.close().await;
    result
}

/// Auto-plays until the set is exhausted or closed, printing events as JSON lines.
async fn drive(player: &StoryPlayer) -> Result<()> {
    let mut events = player.subscribe();
    let mut retried = HashSet::new();

    // The opening entry fired before we subscribed.
    let opening = player.snapshot().await;
    if let (Some(segment), Some(playback)) = (&opening.segment, &opening.playback) {
        on_entered(player, segment.media_type, playback.generation).await?;
    }
    recover_media(player, &mut retried).await?;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("skipped {skipped} player events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        println!("{}", serde_json::to_string(&event)?);

        match event {
            PlayerEvent::SegmentEntered { generation, .. } => {
                let snapshot = player.snapshot().await;
                if let Some(segment) = snapshot.segment {
                    on_entered(player, segment.media_type, generation).await?;
                }
            }
            PlayerEvent::MediaFailed { .. } => recover_media(player, &mut retried).await?,
            PlayerEvent::Exhausted | PlayerEvent::Closed => break,
            _ => {}
        }
    }
    Ok(())
}

/// A failed segment gets one retry per entry; a second failure skips it.
async fn recover_media(player: &StoryPlayer, retried: &mut HashSet<u64>) -> Result<()> {
    let snapshot = player.snapshot().await;
    let Some(playback) = snapshot.playback else {
        return Ok(());
    };
    let MediaStatus::Failed { reason } = &playback.media else {
        return Ok(());
    };

    if retried.insert(playback.generation) {
        warn!("media failed ({reason}), retrying");
        player.retry_media().await?;
    } else {
        warn!("media failed again ({reason}), skipping segment");
        player.advance().await?;
    }
    Ok(())
}

/// Stands in for a video player and the owner's "seen by" sheet.
async fn on_entered(player: &StoryPlayer, media_type: MediaType, generation: u64) -> Result<()> {
    if media_type == MediaType::Video {
        player.report_video_duration(generation, None).await?;
    }
    if player.is_owner().await {
        match player.load_viewers().await {
            Ok(viewers) => info!("seen by {} viewer(s)", viewers.len()),
            Err(err) => warn!("{err}"),
        }
    }
    Ok(())
}
