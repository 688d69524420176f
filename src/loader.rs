use log::{info, warn};

use crate::{
    backend::StoryBackend,
    error::{describe, StoryError, StoryResult},
    models::StorySequence,
};

#[derive(Debug, Clone)]
pub struct LoadedStory {
    pub sequence: StorySequence,
    pub is_owner: bool,
}

/// Resolves a tapped segment to its owner's full active set and the start index.
pub async fn load_story_set(
    backend: &dyn StoryBackend,
    segment_id: &str,
) -> StoryResult<LoadedStory> {
    let segment_id = segment_id.trim();
    if segment_id.is_empty() {
        return Err(StoryError::InvalidSegmentId);
    }

    let requested = backend
        .resolve_segment(segment_id)
        .await
        .map_err(|err| StoryError::Load(describe(&err)))?
        .ok_or(StoryError::NotFound)?;

    let segments = backend
        .list_active_segments_for_owner(&requested.owner_id)
        .await
        .map_err(|err| StoryError::Load(describe(&err)))?;

    let start_index = match segments.iter().position(|s| s.id == requested.id) {
        Some(index) => index,
        None => {
            warn!(
                "segment {} missing from active set of {}; starting at the first segment",
                requested.id, requested.owner_id
            );
            0
        }
    };

    let sequence = StorySequence::new(segments, start_index).ok_or(StoryError::NotFound)?;
    let is_owner = requested.owner_id == backend.viewer_id();

    info!(
        "loaded {} segment(s) of {} starting at {} (owner view: {})",
        sequence.segments.len(),
        requested.owner_id,
        start_index,
        is_owner
    );

    Ok(LoadedStory { sequence, is_owner })
}
