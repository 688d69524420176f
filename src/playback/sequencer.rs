use serde::Serialize;

use crate::models::{StorySegment, StorySequence};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", content = "index", rename_all = "camelCase")]
pub enum SequencerState {
    #[default]
    Idle,
    Viewing(usize),
    Exhausted,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A (possibly identical) index became current; playback must be reset.
    Entered(usize),
    /// Nothing changed.
    Stayed,
    /// Advance ran past the last segment.
    Exhausted,
}

/// Current position within one owner's sequence.
#[derive(Debug, Clone)]
pub struct Sequencer {
    segments: Vec<StorySegment>,
    state: SequencerState,
}

impl Sequencer {
    pub fn new(sequence: StorySequence) -> (Self, usize) {
        let start = sequence.current_index;
        (
            Self {
                segments: sequence.segments,
                state: SequencerState::Idle,
            },
            start,
        )
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SequencerState::Viewing(index) => Some(index),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&StorySegment> {
        self.current_index().and_then(|i| self.segments.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&StorySegment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[StorySegment] {
        &self.segments
    }

    /// Idle -> Viewing(start). Out-of-range starts clamp to the last segment.
    pub fn start(&mut self, start_index: usize) -> Transition {
        if self.state != SequencerState::Idle || self.segments.is_empty() {
            return Transition::Stayed;
        }
        let index = start_index.min(self.segments.len() - 1);
        self.state = SequencerState::Viewing(index);
        Transition::Entered(index)
    }

    pub fn advance(&mut self) -> Transition {
        match self.state {
            SequencerState::Viewing(index) if index + 1 < self.segments.len() => {
                self.state = SequencerState::Viewing(index + 1);
                Transition::Entered(index + 1)
            }
            SequencerState::Viewing(_) => {
                self.state = SequencerState::Exhausted;
                Transition::Exhausted
            }
            SequencerState::Idle | SequencerState::Exhausted => Transition::Stayed,
        }
    }

    /// Retreat from index 0 is a no-op.
    pub fn retreat(&mut self) -> Transition {
        match self.state {
            SequencerState::Viewing(index) if index > 0 => {
                self.state = SequencerState::Viewing(index - 1);
                Transition::Entered(index - 1)
            }
            _ => Transition::Stayed,
        }
    }
}
