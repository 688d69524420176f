use std::collections::HashSet;

use crate::{
    error::{StoryError, StoryResult},
    models::ReplyDraft,
};

/// A reply that passed validation and is being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub segment_id: String,
    pub text: String,
}

/// Reply draft for the active segment plus the set of segments with a send in flight.
#[derive(Debug, Default)]
pub struct ReplyChannel {
    draft: ReplyDraft,
    segment_id: Option<String>,
    in_flight: HashSet<String>,
    max_chars: usize,
}

impl ReplyChannel {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &ReplyDraft {
        &self.draft
    }

    pub fn is_in_flight(&self) -> bool {
        self.segment_id
            .as_ref()
            .is_some_and(|id| self.in_flight.contains(id))
    }

    /// Moves the channel to a new segment, discarding the old draft.
    pub fn reset_for(&mut self, segment_id: &str) {
        self.draft.clear();
        self.segment_id = Some(segment_id.to_string());
    }

    pub fn set_text(&mut self, text: &str) {
        self.draft.set_text(text, self.max_chars);
    }

    /// Validates the draft and marks the segment as sending.
    pub fn begin_send(&mut self) -> StoryResult<PendingReply> {
        let segment_id = self.segment_id.clone().ok_or(StoryError::SessionClosed)?;
        let text = self.draft.trimmed();
        if text.is_empty() {
            return Err(StoryError::EmptyReply);
        }
        if self.in_flight.contains(&segment_id) {
            return Err(StoryError::ReplyInFlight);
        }

        let pending = PendingReply {
            segment_id: segment_id.clone(),
            text: text.to_string(),
        };
        self.in_flight.insert(segment_id);
        Ok(pending)
    }

    /// Clears the draft on success if the viewer is still on the same segment.
    pub fn finish_send(&mut self, pending: &PendingReply, succeeded: bool) {
        self.in_flight.remove(&pending.segment_id);
        if succeeded && self.segment_id.as_deref() == Some(pending.segment_id.as_str()) {
            self.draft.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ReplyChannel {
        let mut channel = ReplyChannel::new(200);
        channel.reset_for("s1");
        channel
    }

    #[test]
    fn blank_drafts_are_rejected() {
        let mut channel = channel();
        assert_eq!(channel.begin_send(), Err(StoryError::EmptyReply));
        channel.set_text("   \t");
        assert_eq!(channel.begin_send(), Err(StoryError::EmptyReply));
        assert!(!channel.is_in_flight());
    }

    #[test]
    fn sends_trimmed_text() {
        let mut channel = channel();
        channel.set_text("  so good  ");
        let pending = channel.begin_send().unwrap();
        assert_eq!(pending.text, "so good");
        assert_eq!(pending.segment_id, "s1");
        assert!(channel.is_in_flight());
    }

    #[test]
    fn second_send_while_in_flight_is_rejected() {
        let mut channel = channel();
        channel.set_text("hi");
        let pending = channel.begin_send().unwrap();
        assert_eq!(channel.begin_send(), Err(StoryError::ReplyInFlight));

        channel.finish_send(&pending, false);
        assert_eq!(channel.draft().text, "hi");
        assert!(channel.begin_send().is_ok());
    }

    #[test]
    fn success_clears_draft_only_on_same_segment() {
        let mut channel = channel();
        channel.set_text("first");
        let pending = channel.begin_send().unwrap();
        channel.finish_send(&pending, true);
        assert!(channel.draft().is_blank());

        channel.set_text("second");
        let pending = channel.begin_send().unwrap();
        channel.reset_for("s2");
        channel.set_text("typed on s2");
        channel.finish_send(&pending, true);
        assert_eq!(channel.draft().text, "typed on s2");
    }

    #[test]
    fn in_flight_is_tracked_per_segment() {
        let mut channel = channel();
        channel.set_text("one");
        let _pending = channel.begin_send().unwrap();

        channel.reset_for("s2");
        channel.set_text("two");
        assert!(channel.begin_send().is_ok());
    }

    #[test]
    fn input_is_bounded() {
        let mut channel = ReplyChannel::new(3);
        channel.reset_for("s1");
        channel.set_text("abcdef");
        assert_eq!(channel.draft().text, "abc");

        let pending = channel.begin_send().unwrap();
        assert_eq!(pending.text, "abc");
    }
}
