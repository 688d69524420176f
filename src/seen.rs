use std::{collections::HashSet, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    backend::StoryBackend,
    error::{describe, StoryError, StoryResult},
    models::ViewerEntry,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Records seen-facts for viewers and lists viewers for owners.
#[derive(Clone)]
pub struct SeenTracker {
    backend: Arc<dyn StoryBackend>,
    recorded: Arc<Mutex<HashSet<String>>>,
}

impl SeenTracker {
    pub fn new(backend: Arc<dyn StoryBackend>) -> Self {
        Self {
            backend,
            recorded: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Fire-and-forget. Segments already recorded this session are skipped;
    /// failed attempts are retried on the next entry.
    pub fn record(&self, segment_id: &str) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let recorded = self.recorded.clone();
        let segment_id = segment_id.to_string();

        tokio::spawn(async move {
            if recorded.lock().await.contains(&segment_id) {
                return;
            }
            match backend.record_seen(&segment_id).await {
                Ok(()) => {
                    recorded.lock().await.insert(segment_id.clone());
                    log_info!("recorded view of {segment_id}");
                }
                Err(err) => {
                    let err = StoryError::RecordSeen(describe(&err));
                    log_warn!("{segment_id}: {err}");
                }
            }
        })
    }

    pub async fn is_recorded(&self, segment_id: &str) -> bool {
        self.recorded.lock().await.contains(segment_id)
    }

    pub async fn list_viewers(&self, segment_id: &str) -> StoryResult<Vec<ViewerEntry>> {
        self.backend
            .list_viewers(segment_id)
            .await
            .map_err(|err| StoryError::ViewerListFetch(describe(&err)))
    }
}
