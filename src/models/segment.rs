use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// One story item. Read-only to the player once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorySegment {
    pub id: String,
    pub owner_id: String,
    pub media_type: MediaType,
    /// Either a directly fetchable URL or an opaque storage reference.
    pub media_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The ordered segments of one owner, fixed for a viewing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySequence {
    pub segments: Vec<StorySegment>,
    pub current_index: usize,
}

impl StorySequence {
    /// Returns `None` for an empty list or an out-of-range start index.
    pub fn new(segments: Vec<StorySegment>, start_index: usize) -> Option<Self> {
        if start_index >= segments.len() {
            return None;
        }
        Some(Self {
            segments,
            current_index: start_index,
        })
    }
}
