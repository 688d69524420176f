//! Collaborators the player consumes: story storage, seen tracking, replies
//! and media URL resolution. Implemented by the hosting platform's data layer.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{StorySegment, ViewerEntry};

#[cfg(test)]
pub mod mock;
pub mod sqlite;

pub use sqlite::{SqliteStoryBackend, StorageConfig};

#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// Id of the signed-in viewer.
    fn viewer_id(&self) -> &str;

    /// `Ok(None)` when the segment does not exist or has expired.
    async fn resolve_segment(&self, segment_id: &str) -> Result<Option<StorySegment>>;

    /// Active segments of `owner_id`, oldest first.
    async fn list_active_segments_for_owner(&self, owner_id: &str) -> Result<Vec<StorySegment>>;

    /// Records that the current viewer has seen `segment_id`. Must be idempotent.
    async fn record_seen(&self, segment_id: &str) -> Result<()>;

    /// Viewers of `segment_id`, in the order the data source provides them.
    async fn list_viewers(&self, segment_id: &str) -> Result<Vec<ViewerEntry>>;

    async fn send_reply(&self, segment_id: &str, text: &str) -> Result<()>;

    /// Turns a segment's `media_url` into something the player can fetch.
    async fn resolve_playable_url(&self, raw_ref: &str) -> Result<String>;
}
