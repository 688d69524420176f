use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{
    backend::StoryBackend,
    models::{MediaType, StorySegment},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Warms media caches ahead of playback.
#[async_trait]
pub trait MediaWarmer: Send + Sync {
    /// Fetches the image so the next render hits cache.
    async fn warm_image(&self, url: &str) -> Result<()>;

    /// Opens a connection to the video host without downloading the body.
    async fn warm_video(&self, url: &str) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct HttpMediaWarmer {
    client: reqwest::Client,
}

fn is_local(url: &str) -> bool {
    url.starts_with("file://")
}

#[async_trait]
impl MediaWarmer for HttpMediaWarmer {
    async fn warm_image(&self, url: &str) -> Result<()> {
        if is_local(url) {
            return Ok(());
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !response.status().is_success() {
            bail!("GET {url} returned {}", response.status());
        }
        response.bytes().await.context("failed to read image body")?;
        Ok(())
    }

    async fn warm_video(&self, url: &str) -> Result<()> {
        if is_local(url) {
            return Ok(());
        }
        let response = self
            .client
            .head(url)
            .send()
            .await
            .with_context(|| format!("HEAD {url}"))?;
        if !response.status().is_success() {
            bail!("HEAD {url} returned {}", response.status());
        }
        Ok(())
    }
}

/// Best-effort warm-up of the segment after the current one.
#[derive(Clone)]
pub struct Prefetcher {
    backend: Arc<dyn StoryBackend>,
    warmer: Arc<dyn MediaWarmer>,
    enabled: bool,
}

impl Prefetcher {
    pub fn new(
        backend: Arc<dyn StoryBackend>,
        warmer: Arc<dyn MediaWarmer>,
        enabled: bool,
    ) -> Self {
        Self {
            backend,
            warmer,
            enabled,
        }
    }

    /// Spawns a warm-up for `segments[current + 1]`. Failures are logged, never returned.
    pub fn prefetch_after(
        &self,
        segments: &[StorySegment],
        current: usize,
    ) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }
        let next = segments.get(current.checked_add(1)?)?.clone();
        let backend = self.backend.clone();
        let warmer = self.warmer.clone();

        Some(tokio::spawn(async move {
            match warm(backend.as_ref(), warmer.as_ref(), &next).await {
                Ok(()) => log_info!("prefetched {} ({})", next.id, next.media_type.as_str()),
                Err(err) => log_warn!("prefetch of {} failed: {err:#}", next.id),
            }
        }))
    }
}

async fn warm(
    backend: &dyn StoryBackend,
    warmer: &dyn MediaWarmer,
    segment: &StorySegment,
) -> Result<()> {
    let url = backend.resolve_playable_url(&segment.media_url).await?;
    match segment.media_type {
        MediaType::Image => warmer.warm_image(&url).await,
        MediaType::Video => warmer.warm_video(&url).await,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::mock::{segment, MockBackend};
    use std::sync::Mutex;

    /// Records warm-ups instead of touching the network.
    #[derive(Default)]
    pub struct RecordingWarmer {
        pub calls: Mutex<Vec<(MediaType, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MediaWarmer for RecordingWarmer {
        async fn warm_image(&self, url: &str) -> Result<()> {
            self.calls.lock().unwrap().push((MediaType::Image, url.to_string()));
            if self.fail {
                bail!("cache full");
            }
            Ok(())
        }

        async fn warm_video(&self, url: &str) -> Result<()> {
            self.calls.lock().unwrap().push((MediaType::Video, url.to_string()));
            if self.fail {
                bail!("connection refused");
            }
            Ok(())
        }
    }

    fn segments() -> Vec<StorySegment> {
        vec![
            segment("a", "alice", MediaType::Image, 1),
            segment("b", "alice", MediaType::Video, 2),
        ]
    }

    #[tokio::test]
    async fn warms_next_segment_by_media_type() {
        let backend = Arc::new(MockBackend::new("bob", segments()));
        let warmer = Arc::new(RecordingWarmer::default());
        let prefetcher = Prefetcher::new(backend, warmer.clone(), true);

        prefetcher.prefetch_after(&segments(), 0).unwrap().await.unwrap();

        let calls = warmer.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(MediaType::Video, "https://cdn.test/b".to_string())]);
    }

    #[tokio::test]
    async fn no_next_segment_is_a_noop() {
        let backend = Arc::new(MockBackend::new("bob", segments()));
        let warmer = Arc::new(RecordingWarmer::default());
        let prefetcher = Prefetcher::new(backend, warmer.clone(), true);

        assert!(prefetcher.prefetch_after(&segments(), 1).is_none());
        assert!(warmer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let backend = Arc::new(MockBackend::new("bob", segments()));
        MockBackend::fail(&backend.fail_resolve);
        let warmer = Arc::new(RecordingWarmer {
            fail: true,
            ..RecordingWarmer::default()
        });
        let prefetcher = Prefetcher::new(backend, warmer.clone(), true);

        assert!(prefetcher.prefetch_after(&segments(), 0).unwrap().await.is_ok());
        assert!(warmer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_prefetcher_does_nothing() {
        let backend = Arc::new(MockBackend::new("bob", segments()));
        let warmer = Arc::new(RecordingWarmer::default());
        let prefetcher = Prefetcher::new(backend, warmer, false);
        assert!(prefetcher.prefetch_after(&segments(), 0).is_none());
    }
}
