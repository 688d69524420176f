use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use log::{debug, info};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{
    clock::{Clock, TokioClock},
    events::{PlayerEvent, PlayerSnapshot},
    input::TapZone,
    sequencer::{Sequencer, SequencerState, Transition},
    state::PlaybackState,
};
use crate::{
    backend::StoryBackend,
    error::{describe, StoryError, StoryResult},
    loader::load_story_set,
    models::ViewerEntry,
    prefetch::{HttpMediaWarmer, MediaWarmer, Prefetcher},
    reply::ReplyChannel,
    seen::SeenTracker,
    settings::PlaybackSettings,
};

const ENABLE_LOGS: bool = true;

use crate::log_error;

const EVENT_CAPACITY: usize = 64;

struct PlayerInner {
    sequencer: Sequencer,
    playback: Option<PlaybackState>,
    generation: u64,
    reply: ReplyChannel,
    viewers: Vec<ViewerEntry>,
    is_owner: bool,
    closed: bool,
    ticks: u32,
}

/// Everything the ticker task and side-effect tasks share with the handle.
struct PlayerCore {
    inner: Mutex<PlayerInner>,
    backend: Arc<dyn StoryBackend>,
    clock: Arc<dyn Clock>,
    settings: PlaybackSettings,
    prefetcher: Prefetcher,
    seen: SeenTracker,
    events: broadcast::Sender<PlayerEvent>,
}

/// Stops the ticker when the last player handle goes away.
struct TickerHandle {
    cancel: CancellationToken,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl TickerHandle {
    fn stop(&self) {
        self.cancel.cancel();
        let mut guard = match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct StoryPlayerBuilder {
    backend: Arc<dyn StoryBackend>,
    warmer: Option<Arc<dyn MediaWarmer>>,
    clock: Arc<dyn Clock>,
    settings: PlaybackSettings,
}

impl StoryPlayerBuilder {
    pub fn warmer(mut self, warmer: Arc<dyn MediaWarmer>) -> Self {
        self.warmer = Some(warmer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: PlaybackSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads the story set for `segment_id` and starts playback at it.
    pub async fn open(self, segment_id: &str) -> StoryResult<StoryPlayer> {
        let loaded = load_story_set(self.backend.as_ref(), segment_id).await?;
        let warmer = self
            .warmer
            .unwrap_or_else(|| Arc::new(HttpMediaWarmer::default()));
        let prefetcher = Prefetcher::new(
            self.backend.clone(),
            warmer,
            self.settings.prefetch_enabled,
        );
        let seen = SeenTracker::new(self.backend.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (sequencer, start_index) = Sequencer::new(loaded.sequence);

        let core = Arc::new(PlayerCore {
            inner: Mutex::new(PlayerInner {
                sequencer,
                playback: None,
                generation: 0,
                reply: ReplyChannel::new(self.settings.reply_max_chars),
                viewers: Vec::new(),
                is_owner: loaded.is_owner,
                closed: false,
                ticks: 0,
            }),
            backend: self.backend,
            clock: self.clock,
            settings: self.settings,
            prefetcher,
            seen,
            events,
        });

        {
            let mut inner = core.inner.lock().await;
            let transition = inner.sequencer.start(start_index);
            core.apply_transition(&mut inner, transition);
        }

        let cancel = CancellationToken::new();
        let handle = spawn_ticker(core.clone(), cancel.clone());

        Ok(StoryPlayer {
            core,
            ticker: Arc::new(TickerHandle {
                cancel,
                handle: StdMutex::new(Some(handle)),
            }),
        })
    }
}

/// One viewing session of an owner's story set.
#[derive(Clone)]
pub struct StoryPlayer {
    core: Arc<PlayerCore>,
    ticker: Arc<TickerHandle>,
}

impl StoryPlayer {
    pub fn builder(backend: Arc<dyn StoryBackend>) -> StoryPlayerBuilder {
        StoryPlayerBuilder {
            backend,
            warmer: None,
            clock: Arc::new(TokioClock),
            settings: PlaybackSettings::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.core.events.subscribe()
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let now = self.core.clock.now();
        let inner = self.core.inner.lock().await;
        let playback = inner.playback.clone().map(|mut playback| {
            playback.sync_elapsed(now);
            playback
        });
        let progress = inner
            .playback
            .as_ref()
            .map_or(0.0, |playback| playback.progress(now));

        PlayerSnapshot {
            sequencer: inner.sequencer.state(),
            total: inner.sequencer.len(),
            is_owner: inner.is_owner,
            segment: inner.sequencer.current().cloned(),
            playback,
            progress,
            reply: inner.reply.draft().clone(),
            reply_in_flight: inner.reply.is_in_flight(),
            viewers: inner.viewers.clone(),
            closed: inner.closed,
        }
    }

    pub async fn is_owner(&self) -> bool {
        self.core.inner.lock().await.is_owner
    }

    /// Tap at horizontal position `x` on a surface `width` wide.
    /// Taps outside both hit zones are ignored.
    pub async fn tap(&self, x: f64, width: f64) -> StoryResult<Transition> {
        match TapZone::classify(x, width) {
            Some(TapZone::Left) => self.retreat().await,
            Some(TapZone::Right) => self.advance().await,
            None => {
                self.core.ensure_open().await?;
                Ok(Transition::Stayed)
            }
        }
    }

    pub async fn advance(&self) -> StoryResult<Transition> {
        let mut inner = self.core.lock_open().await?;
        let transition = inner.sequencer.advance();
        self.core.apply_transition(&mut inner, transition);
        Ok(transition)
    }

    pub async fn retreat(&self) -> StoryResult<Transition> {
        let mut inner = self.core.lock_open().await?;
        let transition = inner.sequencer.retreat();
        self.core.apply_transition(&mut inner, transition);
        Ok(transition)
    }

    /// Press-and-hold anywhere on the surface.
    pub async fn set_hold(&self, held: bool) -> StoryResult<()> {
        let now = self.core.clock.now();
        let mut inner = self.core.lock_open().await?;
        let index = inner.sequencer.current_index();
        if let (Some(index), Some(playback)) = (index, inner.playback.as_mut()) {
            if playback.set_hold(held, now) {
                self.core.emit(PlayerEvent::PauseChanged {
                    index,
                    paused: playback.paused(),
                });
            }
        }
        Ok(())
    }

    /// Focus state of the reply input; focus pauses playback like a hold.
    pub async fn set_reply_focus(&self, focused: bool) -> StoryResult<()> {
        let now = self.core.clock.now();
        let mut inner = self.core.lock_open().await?;
        let index = inner.sequencer.current_index();
        if let (Some(index), Some(playback)) = (index, inner.playback.as_mut()) {
            if playback.set_input_focus(focused, now) {
                self.core.emit(PlayerEvent::PauseChanged {
                    index,
                    paused: playback.paused(),
                });
            }
        }
        Ok(())
    }

    /// Called by the video player once it knows the duration of the segment
    /// entered with `generation`. `None` selects the fallback duration.
    pub async fn report_video_duration(
        &self,
        generation: u64,
        duration_ms: Option<u64>,
    ) -> StoryResult<bool> {
        let now = self.core.clock.now();
        let fallback = self.core.settings.video_fallback_duration_ms;
        let mut inner = self.core.lock_open().await?;
        match inner.playback.as_mut() {
            Some(playback) if playback.generation == generation => {
                let accepted = playback.report_duration(duration_ms, fallback, now);
                if accepted {
                    debug!(
                        "video duration for generation {generation}: {:?}",
                        playback.duration_ms
                    );
                }
                Ok(accepted)
            }
            _ => Ok(false),
        }
    }

    /// Called by the media player when the segment entered with `generation` fails to play.
    pub async fn report_media_error(&self, generation: u64, reason: &str) -> StoryResult<()> {
        self.core
            .apply_media_result(generation, Err(reason.to_string()))
            .await;
        self.core.ensure_open().await
    }

    /// Re-resolves the current segment's media after a failure.
    pub async fn retry_media(&self) -> StoryResult<()> {
        let now = self.core.clock.now();
        let mut inner = self.core.lock_open().await?;
        let Some(segment) = inner.sequencer.current().cloned() else {
            return Ok(());
        };
        let Some(playback) = inner.playback.as_mut() else {
            return Ok(());
        };
        if !playback.media.is_failed() {
            return Ok(());
        }
        playback.media_retrying(now);
        let generation = playback.generation;
        drop(inner);

        info!("retrying media for {}", segment.id);
        self.core.spawn_media_resolution(generation, segment.media_url);
        Ok(())
    }

    pub async fn set_reply_text(&self, text: &str) -> StoryResult<()> {
        let mut inner = self.core.lock_open().await?;
        inner.reply.set_text(text);
        Ok(())
    }

    /// Sends the draft for the current segment. The draft survives a failed send.
    pub async fn send_reply(&self) -> StoryResult<()> {
        let pending = {
            let mut inner = self.core.lock_open().await?;
            inner.reply.begin_send()?
        };

        let result = self
            .core
            .backend
            .send_reply(&pending.segment_id, &pending.text)
            .await;

        let mut inner = self.core.inner.lock().await;
        inner.reply.finish_send(&pending, result.is_ok());
        match result {
            Ok(()) => {
                self.core.emit(PlayerEvent::ReplySent {
                    segment_id: pending.segment_id,
                });
                Ok(())
            }
            Err(err) => {
                let reason = describe(&err);
                self.core.emit(PlayerEvent::ReplyFailed {
                    segment_id: pending.segment_id,
                    reason: reason.clone(),
                });
                Err(StoryError::ReplySend(reason))
            }
        }
    }

    /// Owner only: who has seen the current segment. On failure the list is cleared.
    pub async fn load_viewers(&self) -> StoryResult<Vec<ViewerEntry>> {
        let segment_id = {
            let inner = self.core.lock_open().await?;
            if !inner.is_owner {
                return Err(StoryError::NotOwner);
            }
            match inner.sequencer.current() {
                Some(segment) => segment.id.clone(),
                None => return Ok(Vec::new()),
            }
        };

        let result = self.core.seen.list_viewers(&segment_id).await;

        let mut inner = self.core.inner.lock().await;
        inner.viewers = result.as_ref().cloned().unwrap_or_default();
        result
    }

    /// Ends the session. Pending sends may still complete.
    pub async fn close(&self) {
        {
            let mut inner = self.core.inner.lock().await;
            if inner.closed {
                return;
            }
            inner.closed = true;
        }
        self.ticker.stop();
        self.core.emit(PlayerEvent::Closed);
        info!("story session closed");
    }
}

impl PlayerCore {
    async fn lock_open(&self) -> StoryResult<tokio::sync::MutexGuard<'_, PlayerInner>> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(StoryError::SessionClosed);
        }
        Ok(inner)
    }

    async fn ensure_open(&self) -> StoryResult<()> {
        self.lock_open().await.map(|_| ())
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Resets playback and fires entry side effects for `Entered`; emits `Exhausted`.
    fn apply_transition(self: &Arc<Self>, inner: &mut PlayerInner, transition: Transition) {
        match transition {
            Transition::Entered(index) => self.enter_segment(inner, index),
            Transition::Exhausted => {
                inner.playback = None;
                info!("story set exhausted");
                self.emit(PlayerEvent::Exhausted);
            }
            Transition::Stayed => {}
        }
    }

    fn enter_segment(self: &Arc<Self>, inner: &mut PlayerInner, index: usize) {
        let Some(segment) = inner.sequencer.get(index).cloned() else {
            return;
        };
        let now = self.clock.now();

        inner.generation += 1;
        inner.ticks = 0;
        inner.playback = Some(PlaybackState::enter(
            inner.generation,
            segment.media_type,
            self.settings.image_duration_ms,
            now,
        ));
        inner.reply.reset_for(&segment.id);
        inner.viewers.clear();

        debug!(
            "entered segment {} ({}/{}, generation {})",
            segment.id,
            index + 1,
            inner.sequencer.len(),
            inner.generation
        );
        self.emit(PlayerEvent::SegmentEntered {
            index,
            segment_id: segment.id.clone(),
            generation: inner.generation,
        });

        self.spawn_media_resolution(inner.generation, segment.media_url.clone());
        if !inner.is_owner {
            self.seen.record(&segment.id);
        }
        self.prefetcher
            .prefetch_after(inner.sequencer.segments(), index);
    }

    fn spawn_media_resolution(self: &Arc<Self>, generation: u64, raw_ref: String) {
        let core = self.clone();
        tokio::spawn(async move {
            let result = core
                .backend
                .resolve_playable_url(&raw_ref)
                .await
                .map_err(|err| StoryError::MediaResolution(describe(&err)).to_string());
            core.apply_media_result(generation, result).await;
        });
    }

    async fn apply_media_result(&self, generation: u64, result: Result<String, String>) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        let Some(index) = inner.sequencer.current_index() else {
            return;
        };
        let Some(playback) = inner.playback.as_mut() else {
            return;
        };
        if playback.generation != generation {
            debug!(
                "dropping media result for generation {generation}, now at {}",
                playback.generation
            );
            return;
        }

        match result {
            Ok(url) => {
                if playback.media.is_failed() {
                    return;
                }
                playback.media_ready(url.clone(), now);
                self.emit(PlayerEvent::MediaReady { index, url });
            }
            Err(reason) => {
                log_error!("media for segment {index} failed: {reason}");
                playback.media_failed(reason.clone(), now);
                self.emit(PlayerEvent::MediaFailed { index, reason });
            }
        }
    }

    /// One ticker step. Returns false once the session can no longer advance.
    async fn on_tick(self: &Arc<Self>) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return false;
        }
        let SequencerState::Viewing(index) = inner.sequencer.state() else {
            return false;
        };
        let Some(playback) = inner.playback.as_mut() else {
            return true;
        };

        if playback.tick(now) {
            let transition = inner.sequencer.advance();
            self.apply_transition(&mut inner, transition);
            return transition != Transition::Exhausted;
        }

        let heartbeat = if playback.is_counting() {
            playback
                .duration_ms
                .map(|duration_ms| (playback.current_elapsed_ms(now), duration_ms))
        } else {
            None
        };

        inner.ticks = inner.ticks.wrapping_add(1);
        let every = self.settings.heartbeat_every_ticks.max(1);
        if let Some((elapsed_ms, duration_ms)) = heartbeat {
            if inner.ticks % every == 0 {
                self.emit(PlayerEvent::Progress {
                    index,
                    elapsed_ms,
                    duration_ms,
                });
            }
        }
        true
    }
}

fn spawn_ticker(core: Arc<PlayerCore>, cancel: CancellationToken) -> JoinHandle<()> {
    let tick_interval = Duration::from_millis(core.settings.tick_interval_ms.max(1));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = core.clock.sleep(tick_interval) => {}
                _ = cancel.cancelled() => break,
            }
            if !core.on_tick().await {
                break;
            }
        }
        debug!("playback ticker stopped");
    })
}
