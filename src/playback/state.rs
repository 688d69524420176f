use serde::Serialize;
use tokio::time::Instant;

use crate::models::MediaType;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MediaStatus {
    Resolving,
    Ready { url: String },
    Failed { reason: String },
}

impl MediaStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, MediaStatus::Failed { .. })
    }
}

/// Progress of the visible segment.
///
/// Elapsed time is `elapsed_ms_baseline` plus the time since `running_anchor`,
/// capped at the duration. The anchor only exists while the segment is
/// counting, so pausing folds it into the baseline and resuming re-anchors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Bumped on every segment entry; late results for an older entry are dropped.
    pub generation: u64,
    pub media_type: MediaType,
    pub elapsed_ms: u64,
    /// `None` until a video reports its duration.
    pub duration_ms: Option<u64>,
    pub hold_paused: bool,
    pub input_focused: bool,
    pub media: MediaStatus,
    /// Set once the segment has signalled Advance.
    pub completed: bool,
    #[serde(skip)]
    elapsed_ms_baseline: u64,
    #[serde(skip)]
    running_anchor: Option<Instant>,
}

impl PlaybackState {
    pub fn enter(
        generation: u64,
        media_type: MediaType,
        image_duration_ms: u64,
        now: Instant,
    ) -> Self {
        let duration_ms = match media_type {
            MediaType::Image => Some(image_duration_ms),
            MediaType::Video => None,
        };
        let mut state = Self {
            generation,
            media_type,
            elapsed_ms: 0,
            duration_ms,
            hold_paused: false,
            input_focused: false,
            media: MediaStatus::Resolving,
            completed: false,
            elapsed_ms_baseline: 0,
            running_anchor: None,
        };
        state.rearm(now);
        state
    }

    pub fn paused(&self) -> bool {
        self.hold_paused || self.input_focused
    }

    pub fn is_counting(&self) -> bool {
        self.duration_ms.is_some() && !self.paused() && !self.media.is_failed() && !self.completed
    }

    pub fn current_elapsed_ms(&self, now: Instant) -> u64 {
        match self.running_anchor {
            Some(anchor) => {
                let running = now.saturating_duration_since(anchor).as_millis() as u64;
                let elapsed = self.elapsed_ms_baseline.saturating_add(running);
                match self.duration_ms {
                    Some(duration) => elapsed.min(duration),
                    None => elapsed,
                }
            }
            None => self.elapsed_ms,
        }
    }

    pub fn sync_elapsed(&mut self, now: Instant) {
        self.elapsed_ms = self.current_elapsed_ms(now);
    }

    /// Fraction of the segment shown on the progress bar, 0.0 when the duration is unknown.
    pub fn progress(&self, now: Instant) -> f64 {
        match self.duration_ms {
            Some(duration) if duration > 0 => {
                self.current_elapsed_ms(now) as f64 / duration as f64
            }
            _ => 0.0,
        }
    }

    /// Sets the hold input. Returns true when the combined paused flag changed.
    pub fn set_hold(&mut self, held: bool, now: Instant) -> bool {
        let was_paused = self.paused();
        self.sync_elapsed(now);
        self.hold_paused = held;
        self.rearm(now);
        was_paused != self.paused()
    }

    /// Sets the reply-input focus. Returns true when the combined paused flag changed.
    pub fn set_input_focus(&mut self, focused: bool, now: Instant) -> bool {
        let was_paused = self.paused();
        self.sync_elapsed(now);
        self.input_focused = focused;
        self.rearm(now);
        was_paused != self.paused()
    }

    /// Accepts the first duration report for a video; `None` or zero selects `fallback_ms`.
    pub fn report_duration(
        &mut self,
        reported_ms: Option<u64>,
        fallback_ms: u64,
        now: Instant,
    ) -> bool {
        if self.media_type != MediaType::Video || self.duration_ms.is_some() {
            return false;
        }
        let duration = reported_ms.filter(|ms| *ms > 0).unwrap_or(fallback_ms);
        self.duration_ms = Some(duration);
        self.rearm(now);
        true
    }

    pub fn media_ready(&mut self, url: String, now: Instant) {
        self.sync_elapsed(now);
        self.media = MediaStatus::Ready { url };
        self.rearm(now);
    }

    pub fn media_failed(&mut self, reason: String, now: Instant) {
        self.sync_elapsed(now);
        self.media = MediaStatus::Failed { reason };
        self.rearm(now);
    }

    pub fn media_retrying(&mut self, now: Instant) {
        self.sync_elapsed(now);
        self.media = MediaStatus::Resolving;
        self.rearm(now);
    }

    /// Returns true exactly once, when elapsed reaches the duration while counting.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_counting() {
            return false;
        }
        self.sync_elapsed(now);
        match self.duration_ms {
            Some(duration) if self.elapsed_ms >= duration => {
                self.completed = true;
                self.rearm(now);
                true
            }
            _ => false,
        }
    }

    /// Anchors or freezes the elapsed clock to match `is_counting`.
    /// Callers must have synced `elapsed_ms` first.
    fn rearm(&mut self, now: Instant) {
        match (self.is_counting(), self.running_anchor.is_some()) {
            (true, false) => {
                self.elapsed_ms_baseline = self.elapsed_ms;
                self.running_anchor = Some(now);
            }
            (false, true) => {
                self.elapsed_ms_baseline = self.elapsed_ms;
                self.running_anchor = None;
            }
            _ => {}
        }
    }
}
