use serde::Serialize;

use super::{sequencer::SequencerState, state::PlaybackState};
use crate::models::{ReplyDraft, StorySegment, ViewerEntry};

/// Point-in-time view of a session for the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub sequencer: SequencerState,
    pub total: usize,
    pub is_owner: bool,
    pub segment: Option<StorySegment>,
    pub playback: Option<PlaybackState>,
    pub progress: f64,
    pub reply: ReplyDraft,
    pub reply_in_flight: bool,
    pub viewers: Vec<ViewerEntry>,
    pub closed: bool,
}

impl PlayerSnapshot {
    pub fn current_index(&self) -> Option<usize> {
        match self.sequencer {
            SequencerState::Viewing(index) => Some(index),
            _ => None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.playback.as_ref().map_or(0, |p| p.elapsed_ms)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    #[serde(rename_all = "camelCase")]
    SegmentEntered {
        index: usize,
        segment_id: String,
        generation: u64,
    },
    #[serde(rename_all = "camelCase")]
    Progress {
        index: usize,
        elapsed_ms: u64,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    PauseChanged { index: usize, paused: bool },
    #[serde(rename_all = "camelCase")]
    MediaReady { index: usize, url: String },
    #[serde(rename_all = "camelCase")]
    MediaFailed { index: usize, reason: String },
    #[serde(rename_all = "camelCase")]
    ReplySent { segment_id: String },
    #[serde(rename_all = "camelCase")]
    ReplyFailed { segment_id: String, reason: String },
    Exhausted,
    Closed,
}
