//! Scripted in-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::StoryBackend;
use crate::models::{MediaType, StorySegment, ViewerEntry};

pub fn segment(id: &str, owner: &str, media_type: MediaType, minute: u32) -> StorySegment {
    StorySegment {
        id: id.to_string(),
        owner_id: owner.to_string(),
        media_type,
        media_url: format!("https://cdn.test/{id}"),
        caption: None,
        created_at: at_minute(minute),
    }
}

pub fn at_minute(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, minute, 0)
        .single()
        .unwrap()
}

pub struct MockBackend {
    viewer_id: String,
    segments: Mutex<Vec<StorySegment>>,
    /// segment id -> viewer ids, in insertion order
    seen: Mutex<HashMap<String, Vec<String>>>,
    replies: Mutex<Vec<(String, String)>>,
    resolved: Mutex<Vec<String>>,

    pub fail_load: AtomicBool,
    pub fail_record_seen: AtomicBool,
    pub fail_list_viewers: AtomicBool,
    pub fail_send_reply: AtomicBool,
    pub fail_resolve: AtomicBool,
    reply_delay: Mutex<Option<Duration>>,

    record_seen_calls: AtomicUsize,
    send_reply_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(viewer_id: &str, segments: Vec<StorySegment>) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
            segments: Mutex::new(segments),
            seen: Mutex::new(HashMap::new()),
            replies: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            fail_load: AtomicBool::new(false),
            fail_record_seen: AtomicBool::new(false),
            fail_list_viewers: AtomicBool::new(false),
            fail_send_reply: AtomicBool::new(false),
            fail_resolve: AtomicBool::new(false),
            reply_delay: Mutex::new(None),
            record_seen_calls: AtomicUsize::new(0),
            send_reply_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    pub fn set_reply_delay(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = Some(delay);
    }

    pub fn record_seen_calls(&self) -> usize {
        self.record_seen_calls.load(Ordering::SeqCst)
    }

    pub fn send_reply_calls(&self) -> usize {
        self.send_reply_calls.load(Ordering::SeqCst)
    }

    /// Every resolution attempt, including failed ones.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn seen_by(&self, segment_id: &str) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .get(segment_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn mark_seen_by(&self, segment_id: &str, viewer_id: &str) {
        let mut seen = self.seen.lock().unwrap();
        let viewers = seen.entry(segment_id.to_string()).or_default();
        if !viewers.iter().any(|v| v == viewer_id) {
            viewers.push(viewer_id.to_string());
        }
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn resolved_urls(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    pub fn remove_all_segments(&self) {
        self.segments.lock().unwrap().clear();
    }
}

#[async_trait]
impl StoryBackend for MockBackend {
    fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    async fn resolve_segment(&self, segment_id: &str) -> Result<Option<StorySegment>> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(anyhow!("backend offline"));
        }
        Ok(self
            .segments
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == segment_id)
            .cloned())
    }

    async fn list_active_segments_for_owner(&self, owner_id: &str) -> Result<Vec<StorySegment>> {
        let mut segments: Vec<StorySegment> = self
            .segments
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.created_at);
        Ok(segments)
    }

    async fn record_seen(&self, segment_id: &str) -> Result<()> {
        self.record_seen_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_record_seen.load(Ordering::SeqCst) {
            return Err(anyhow!("permission denied"));
        }
        self.mark_seen_by(segment_id, &self.viewer_id);
        Ok(())
    }

    async fn list_viewers(&self, segment_id: &str) -> Result<Vec<ViewerEntry>> {
        if self.fail_list_viewers.load(Ordering::SeqCst) {
            return Err(anyhow!("timeout"));
        }
        Ok(self
            .seen_by(segment_id)
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, viewer_id)| ViewerEntry {
                display_name: viewer_id.to_uppercase(),
                handle: format!("@{viewer_id}"),
                avatar_uri: None,
                seen_at: at_minute(59 - i as u32),
                viewer_id,
            })
            .collect())
    }

    async fn send_reply(&self, segment_id: &str, text: &str) -> Result<()> {
        self.send_reply_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.reply_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_send_reply.load(Ordering::SeqCst) {
            return Err(anyhow!("network unreachable"));
        }
        self.replies
            .lock()
            .unwrap()
            .push((segment_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn resolve_playable_url(&self, raw_ref: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(anyhow!("signed url exchange failed"));
        }
        self.resolved.lock().unwrap().push(raw_ref.to_string());
        Ok(raw_ref.to_string())
    }
}
