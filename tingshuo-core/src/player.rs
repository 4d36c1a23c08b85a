//! Sequential playback sessions.
//!
//! One session plays an ordered list of audio keys back-to-back, advancing on
//! natural end-of-media or on unrecoverable per-item failure. At most one
//! session is live process-wide; starting a new one supersedes the previous.

use crate::cache::AudioCache;
use crate::engine::PlaybackEngine;
use crate::highlight::{AnchorId, Highlighter};
use crate::media::SharedHandle;
use crate::resolver::AudioKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Observable player state.
///
/// `Stopped` and `Completed` are terminal for their session and yield
/// implicitly to a fresh session on the next `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Idle,
    Playing,
    Stopped,
    Completed,
}

/// Events emitted by the player, consumed by UI bridges and tests.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A new session began
    SessionStarted { total: usize },
    /// Item `index` loaded and started playing
    ItemStarted { index: usize, key: AudioKey },
    /// Item `index` reached its natural end
    ItemEnded { index: usize, key: AudioKey },
    /// Item `index` could not be loaded or played; the session advances
    ItemSkipped { index: usize, key: AudioKey },
    /// The session played through its whole list
    SessionCompleted,
    /// The session was stopped or superseded
    SessionStopped,
}

/// One run of a sequential playback request, cancelable as a unit.
#[derive(Clone)]
struct Session {
    generation: u64,
    cancel: CancellationToken,
    /// The handle currently playing, so stop can pause it.
    current: Arc<Mutex<Option<SharedHandle>>>,
}

struct PlayerInner {
    status: PlayerStatus,
    session: Option<Session>,
}

/// Drives ordered lists of audio keys through the cache and engine, one item
/// at a time, with highlight sync and broadcast events.
pub struct SequencePlayer {
    cache: Arc<AudioCache>,
    engine: Arc<PlaybackEngine>,
    highlighter: Arc<Highlighter>,
    root_cancel: CancellationToken,
    /// Live session generation; stale async completions compare against it
    /// and become no-ops.
    generation: AtomicU64,
    inner: Mutex<PlayerInner>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl SequencePlayer {
    /// Create a new player.
    ///
    /// `cancel_token` optionally ties all sessions to an external shutdown
    /// signal.
    #[must_use]
    pub fn new(
        cache: Arc<AudioCache>,
        engine: Arc<PlaybackEngine>,
        highlighter: Arc<Highlighter>,
        cancel_token: Option<CancellationToken>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            cache,
            engine,
            highlighter,
            root_cancel: cancel_token.unwrap_or_default(),
            generation: AtomicU64::new(0),
            inner: Mutex::new(PlayerInner {
                status: PlayerStatus::Idle,
                session: None,
            }),
            event_tx,
        })
    }

    /// Subscribe to player events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> PlayerStatus {
        self.lock_inner().status
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status() == PlayerStatus::Playing
    }

    fn lock_inner(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A session is live while its token is uncancelled and its generation is
    /// still the newest one.
    fn session_live(&self, session: &Session) -> bool {
        !session.cancel.is_cancelled()
            && self.generation.load(Ordering::Acquire) == session.generation
    }

    /// Start a new session at item 0, superseding any live session.
    pub fn start(self: &Arc<Self>, keys: Vec<AudioKey>) {
        let session = {
            let mut inner = self.lock_inner();
            self.halt_session(&mut inner);
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            let session = Session {
                generation,
                cancel: self.root_cancel.child_token(),
                current: Arc::new(Mutex::new(None)),
            };
            inner.status = PlayerStatus::Playing;
            inner.session = Some(session.clone());
            session
        };

        info!("Starting playback session of {} items", keys.len());
        let _ = self
            .event_tx
            .send(PlayerEvent::SessionStarted { total: keys.len() });

        let player = Arc::clone(self);
        tokio::spawn(async move {
            player.run_session(&keys, &session).await;
        });
    }

    /// Stop the live session: pause the active handle, clear the highlight.
    /// Idempotent when nothing is playing.
    pub fn stop(&self) {
        let mut inner = self.lock_inner();
        if inner.status != PlayerStatus::Playing {
            return;
        }
        self.halt_session(&mut inner);
        info!("Playback session stopped");
    }

    /// Stop if playing, otherwise start from the first item.
    ///
    /// There is no resume-from-pause: every activation replays the full
    /// sequence from the beginning.
    pub fn toggle(self: &Arc<Self>, keys: Vec<AudioKey>) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start(keys);
        }
    }

    fn halt_session(&self, inner: &mut PlayerInner) {
        if let Some(session) = inner.session.take() {
            session.cancel.cancel();
            let paused = session
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(handle) = paused {
                handle.pause();
            }
            self.highlighter.clear_all();
            if inner.status == PlayerStatus::Playing {
                inner.status = PlayerStatus::Stopped;
                let _ = self.event_tx.send(PlayerEvent::SessionStopped);
            }
        }
    }

    async fn run_session(&self, keys: &[AudioKey], session: &Session) {
        for (index, key) in keys.iter().enumerate() {
            if !self.session_live(session) {
                return;
            }

            let loaded = tokio::select! {
                () = session.cancel.cancelled() => return,
                loaded = self.cache.get(key) => loaded,
            };

            // The session may have been stopped or superseded while the load
            // was in flight; a stale completion must not touch anything.
            if !self.session_live(session) {
                return;
            }

            let handle = match loaded {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Skipping unloadable item {}: {}", key, e);
                    self.highlighter.clear_all();
                    let _ = self.event_tx.send(PlayerEvent::ItemSkipped {
                        index,
                        key: key.clone(),
                    });
                    continue;
                }
            };

            *session
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&handle));
            self.highlighter.activate(AnchorId::from(key));
            let _ = self.event_tx.send(PlayerEvent::ItemStarted {
                index,
                key: key.clone(),
            });

            let done = match self.engine.play(key, &handle).await {
                Ok(done) => done,
                Err(e) => {
                    if !self.session_live(session) {
                        return;
                    }
                    warn!("Skipping unplayable item {}: {}", key, e);
                    self.highlighter.clear_all();
                    let _ = self.event_tx.send(PlayerEvent::ItemSkipped {
                        index,
                        key: key.clone(),
                    });
                    continue;
                }
            };

            tokio::select! {
                () = session.cancel.cancelled() => return,
                () = done.wait() => {
                    // A stop between the end event firing and this handler
                    // running must short-circuit the advance.
                    if !self.session_live(session) {
                        return;
                    }
                    self.highlighter.clear_all();
                    let _ = self.event_tx.send(PlayerEvent::ItemEnded {
                        index,
                        key: key.clone(),
                    });
                }
            }
        }

        self.finish(session);
    }

    fn finish(&self, session: &Session) {
        let mut inner = self.lock_inner();
        if !self.session_live(session) || inner.status != PlayerStatus::Playing {
            return;
        }
        inner.session = None;
        inner.status = PlayerStatus::Completed;
        self.highlighter.clear_all();
        info!("Playback session completed");
        let _ = self.event_tx.send(PlayerEvent::SessionCompleted);
    }
}
