use thiserror::Error;

/// Failures surfaced by the story player.
///
/// Collaborator errors arrive as `anyhow::Error` and are flattened into the
/// variant matching the operation that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoryError {
    #[error("segment id must not be empty")]
    InvalidSegmentId,

    #[error("story not found or no longer active")]
    NotFound,

    #[error("failed to load story: {0}")]
    Load(String),

    #[error("media could not be resolved: {0}")]
    MediaResolution(String),

    #[error("failed to record seen: {0}")]
    RecordSeen(String),

    #[error("failed to load viewers: {0}")]
    ViewerListFetch(String),

    #[error("only the story owner can list viewers")]
    NotOwner,

    #[error("reply is empty")]
    EmptyReply,

    #[error("a reply is already being sent")]
    ReplyInFlight,

    #[error("failed to send reply: {0}")]
    ReplySend(String),

    #[error("story session is closed")]
    SessionClosed,
}

pub type StoryResult<T> = Result<T, StoryError>;

/// Flattens an error chain into one line for display.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
