pub mod reply;
pub mod segment;
pub mod viewer;

pub use reply::ReplyDraft;
pub use segment::{MediaType, StorySegment, StorySequence};
pub use viewer::{Profile, SeenRecord, ViewerEntry};
