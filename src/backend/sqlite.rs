use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::StoryBackend;
use crate::{
    db::Database,
    models::{SeenRecord, StorySegment, ViewerEntry},
};

const DIRECT_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Base URL of the object store that storage references are signed against.
    pub base_url: Option<String>,
    pub signed_url_ttl_secs: u64,
    /// How long a posted story stays active.
    pub retention_hours: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            signed_url_ttl_secs: 3600,
            retention_hours: 24,
        }
    }
}

/// `StoryBackend` over the local SQLite database, acting as `viewer_id`.
#[derive(Clone)]
pub struct SqliteStoryBackend {
    db: Database,
    viewer_id: String,
    storage: StorageConfig,
}

impl SqliteStoryBackend {
    pub fn new(db: Database, viewer_id: impl Into<String>, storage: StorageConfig) -> Self {
        Self {
            db,
            viewer_id: viewer_id.into(),
            storage,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Stores a new story, expiring after the configured retention window.
    pub async fn post_story(&self, segment: &StorySegment) -> Result<()> {
        let expires_at = segment.created_at + Duration::hours(self.storage.retention_hours);
        self.db.insert_story(segment, expires_at).await
    }

    fn sign_storage_ref(&self, raw_ref: &str) -> Result<String> {
        let base = self
            .storage
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("no storage endpoint configured for '{raw_ref}'"))?;
        let object = raw_ref.trim_start_matches('/');
        if object.is_empty() {
            bail!("empty storage reference");
        }
        let ttl = i64::try_from(self.storage.signed_url_ttl_secs)
            .context("signed url ttl out of range")?;
        let expires = Utc::now().timestamp() + ttl;
        Ok(format!(
            "{}/object/sign/{}?expires={}",
            base.trim_end_matches('/'),
            object,
            expires
        ))
    }
}

#[async_trait]
impl StoryBackend for SqliteStoryBackend {
    fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    async fn resolve_segment(&self, segment_id: &str) -> Result<Option<StorySegment>> {
        self.db.get_active_story(segment_id, Utc::now()).await
    }

    async fn list_active_segments_for_owner(&self, owner_id: &str) -> Result<Vec<StorySegment>> {
        self.db
            .list_active_stories_for_owner(owner_id, Utc::now())
            .await
    }

    async fn record_seen(&self, segment_id: &str) -> Result<()> {
        let record = SeenRecord {
            viewer_id: self.viewer_id.clone(),
            segment_id: segment_id.to_string(),
            seen_at: Utc::now(),
        };
        let inserted = self.db.insert_story_view(&record).await?;
        if !inserted {
            debug!("view of {segment_id} by {} already recorded", self.viewer_id);
        }
        Ok(())
    }

    async fn list_viewers(&self, segment_id: &str) -> Result<Vec<ViewerEntry>> {
        self.db.list_story_viewers(segment_id).await
    }

    async fn send_reply(&self, segment_id: &str, text: &str) -> Result<()> {
        self.db
            .insert_story_reply(segment_id, &self.viewer_id, text, Utc::now())
            .await
            .map(|_| ())
    }

    async fn resolve_playable_url(&self, raw_ref: &str) -> Result<String> {
        if DIRECT_SCHEMES
            .iter()
            .any(|scheme| raw_ref.starts_with(scheme))
        {
            return Ok(raw_ref.to_string());
        }
        self.sign_storage_ref(raw_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaType, Profile};
    use tempfile::TempDir;

    fn profile(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: format!("{id} name"),
            handle: id.to_string(),
            avatar_uri: None,
        }
    }

    fn story(id: &str, owner: &str, minutes_ago: i64) -> StorySegment {
        StorySegment {
            id: id.to_string(),
            owner_id: owner.to_string(),
            media_type: MediaType::Image,
            media_url: format!("stories/{owner}/{id}.jpg"),
            caption: Some(format!("caption {id}")),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    async fn setup(viewer: &str, storage: StorageConfig) -> (TempDir, SqliteStoryBackend) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("stories.sqlite3")).unwrap();
        for id in ["alice", "bob", "carol"] {
            db.upsert_profile(&profile(id)).await.unwrap();
        }
        (dir, SqliteStoryBackend::new(db, viewer, storage))
    }

    #[tokio::test]
    async fn active_segments_are_ordered_oldest_first_and_exclude_expired() {
        let (_dir, backend) = setup("bob", StorageConfig::default()).await;
        backend.post_story(&story("s2", "alice", 10)).await.unwrap();
        backend.post_story(&story("s1", "alice", 30)).await.unwrap();
        backend
            .post_story(&story("old", "alice", 60 * 25))
            .await
            .unwrap();
        backend.post_story(&story("other", "carol", 5)).await.unwrap();

        let ids: Vec<String> = backend
            .list_active_segments_for_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        assert!(backend.resolve_segment("old").await.unwrap().is_none());
        let resolved = backend.resolve_segment("s1").await.unwrap().unwrap();
        assert_eq!(resolved.caption.as_deref(), Some("caption s1"));
    }

    #[tokio::test]
    async fn profile_upsert_updates_display_fields() {
        let (_dir, backend) = setup("bob", StorageConfig::default()).await;
        let db = backend.database();
        let mut renamed = profile("alice");
        renamed.display_name = "Alice L.".into();
        renamed.avatar_uri = Some("avatars/alice.png".into());
        db.upsert_profile(&renamed).await.unwrap();

        assert_eq!(db.get_profile("alice").await.unwrap(), Some(renamed));
        assert_eq!(db.get_profile("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn record_seen_twice_yields_one_viewer_entry() {
        let (_dir, backend) = setup("bob", StorageConfig::default()).await;
        backend.post_story(&story("s1", "alice", 1)).await.unwrap();

        backend.record_seen("s1").await.unwrap();
        backend.record_seen("s1").await.unwrap();

        let viewers = backend.list_viewers("s1").await.unwrap();
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].viewer_id, "bob");
        assert_eq!(viewers[0].display_name, "bob name");
    }

    #[tokio::test]
    async fn viewers_are_listed_most_recent_first() {
        let (_dir, backend) = setup("alice", StorageConfig::default()).await;
        backend.post_story(&story("s1", "alice", 1)).await.unwrap();
        let db = backend.database();
        let now = Utc::now();
        let view = |viewer: &str, seen_at| SeenRecord {
            viewer_id: viewer.to_string(),
            segment_id: "s1".to_string(),
            seen_at,
        };
        assert!(db
            .insert_story_view(&view("bob", now - Duration::minutes(5)))
            .await
            .unwrap());
        assert!(db.insert_story_view(&view("carol", now)).await.unwrap());
        assert!(!db.insert_story_view(&view("carol", now)).await.unwrap());

        let handles: Vec<String> = backend
            .list_viewers("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.handle)
            .collect();
        assert_eq!(handles, vec!["carol", "bob"]);
    }

    #[tokio::test]
    async fn viewers_of_unseen_story_is_empty() {
        let (_dir, backend) = setup("alice", StorageConfig::default()).await;
        backend.post_story(&story("s1", "alice", 1)).await.unwrap();
        assert!(backend.list_viewers("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replies_are_stored_against_the_story() {
        let (_dir, backend) = setup("bob", StorageConfig::default()).await;
        backend.post_story(&story("s1", "alice", 1)).await.unwrap();

        backend.send_reply("s1", "nice").await.unwrap();
        assert_eq!(backend.database().count_story_replies("s1").await.unwrap(), 1);
        assert!(backend.send_reply("missing", "nice").await.is_err());
    }

    #[tokio::test]
    async fn direct_urls_pass_through_and_refs_are_signed() {
        let storage = StorageConfig {
            base_url: Some("https://media.example/".into()),
            ..StorageConfig::default()
        };
        let (_dir, backend) = setup("bob", storage).await;

        let direct = "https://cdn.example/a.jpg";
        assert_eq!(backend.resolve_playable_url(direct).await.unwrap(), direct);

        let signed = backend
            .resolve_playable_url("stories/alice/a.mp4")
            .await
            .unwrap();
        assert!(
            signed.starts_with("https://media.example/object/sign/stories/alice/a.mp4?expires=")
        );
    }

    #[tokio::test]
    async fn storage_refs_fail_without_endpoint() {
        let (_dir, backend) = setup("bob", StorageConfig::default()).await;
        assert!(backend.resolve_playable_url("stories/a.jpg").await.is_err());
    }
}
