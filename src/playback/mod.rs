pub mod clock;
pub mod controller;
pub mod events;
pub mod input;
pub mod sequencer;
pub mod state;

pub use clock::{Clock, TokioClock};
pub use controller::{StoryPlayer, StoryPlayerBuilder};
pub use events::{PlayerEvent, PlayerSnapshot};
pub use input::TapZone;
pub use sequencer::{SequencerState, Transition};
pub use state::{MediaStatus, PlaybackState};
