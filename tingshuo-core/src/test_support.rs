//! Scripted fakes shared by the async test modules.

use crate::error::{CoreError, Result};
use crate::highlight::{AnchorId, HighlightSink};
use crate::media::{AudioHandle, MediaBackend, PlaybackDone, SharedHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};

pub(crate) type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy)]
enum Script {
    Fail,
    Succeed { playable: bool, auto_end: bool },
}

struct Inner {
    scripts: Mutex<HashMap<String, Script>>,
    default_script: Mutex<Script>,
    attempts: Mutex<Vec<String>>,
    events: EventLog,
    gate: watch::Sender<bool>,
    pending_ends: Mutex<HashMap<String, Vec<oneshot::Sender<()>>>>,
}

/// Media backend whose per-URL behavior is scripted by the test.
///
/// Unscripted URLs fail to load by default. Loads can be held open with
/// [`hold_loads`](Self::hold_loads) to observe coalescing, and manually-ended
/// clips stay "playing" until [`finish`](Self::finish).
#[derive(Clone)]
pub(crate) struct ScriptedBackend {
    inner: Arc<Inner>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::with_events(Arc::new(Mutex::new(Vec::new())))
    }

    pub(crate) fn with_events(events: EventLog) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                scripts: Mutex::new(HashMap::new()),
                default_script: Mutex::new(Script::Fail),
                attempts: Mutex::new(Vec::new()),
                events,
                gate,
                pending_ends: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn clone_arc(&self) -> Arc<dyn MediaBackend> {
        Arc::new(self.clone())
    }

    fn script(&self, url: &str, script: Script) {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.script(url, Script::Fail);
    }

    /// Loadable clip that ends as soon as it is played.
    pub(crate) fn succeed_url(&self, url: &str) {
        self.script(
            url,
            Script::Succeed {
                playable: true,
                auto_end: true,
            },
        );
    }

    /// Loadable clip that keeps playing until [`finish`](Self::finish).
    pub(crate) fn succeed_url_manual(&self, url: &str) {
        self.script(
            url,
            Script::Succeed {
                playable: true,
                auto_end: false,
            },
        );
    }

    /// Loadable clip whose playback start always fails.
    pub(crate) fn succeed_url_unplayable(&self, url: &str) {
        self.script(
            url,
            Script::Succeed {
                playable: false,
                auto_end: true,
            },
        );
    }

    /// Make unscripted URLs load successfully (auto-ending).
    pub(crate) fn succeed_all(&self) {
        *self.inner.default_script.lock().unwrap() = Script::Succeed {
            playable: true,
            auto_end: true,
        };
    }

    /// Block all loads until [`release_loads`](Self::release_loads).
    pub(crate) fn hold_loads(&self) {
        self.inner.gate.send_replace(false);
    }

    pub(crate) fn release_loads(&self) {
        self.inner.gate.send_replace(true);
    }

    /// Signal end-of-media for every live playback of `url`.
    pub(crate) fn finish(&self, url: &str) {
        let senders = self
            .inner
            .pending_ends
            .lock()
            .unwrap()
            .remove(url)
            .unwrap_or_default();
        for tx in senders {
            let _ = tx.send(());
        }
    }

    pub(crate) fn load_attempts(&self) -> Vec<String> {
        self.inner.attempts.lock().unwrap().clone()
    }

    pub(crate) fn load_count(&self, url: &str) -> usize {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == url)
            .count()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.inner.events.lock().unwrap().clone()
    }

    pub(crate) fn event_log(&self) -> EventLog {
        Arc::clone(&self.inner.events)
    }
}

#[async_trait]
impl MediaBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn load(&self, url: &str) -> Result<SharedHandle> {
        self.inner.attempts.lock().unwrap().push(url.to_string());

        let mut gate = self.inner.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let script = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(*self.inner.default_script.lock().unwrap());

        match script {
            Script::Fail => Err(CoreError::MediaLoad {
                url: url.to_string(),
                reason: "scripted load failure".to_string(),
            }),
            Script::Succeed { playable, auto_end } => {
                self.inner
                    .events
                    .lock()
                    .unwrap()
                    .push(format!("load:{url}"));
                Ok(Arc::new(FakeHandle {
                    url: url.to_string(),
                    playable,
                    auto_end,
                    inner: Arc::clone(&self.inner),
                }))
            }
        }
    }
}

struct FakeHandle {
    url: String,
    playable: bool,
    auto_end: bool,
    inner: Arc<Inner>,
}

#[async_trait]
impl AudioHandle for FakeHandle {
    fn url(&self) -> &str {
        &self.url
    }

    async fn play(&self) -> Result<PlaybackDone> {
        if !self.playable {
            return Err(CoreError::PlaybackFailed {
                filename: self.url.clone(),
                reason: "scripted play failure".to_string(),
            });
        }
        self.inner
            .events
            .lock()
            .unwrap()
            .push(format!("play:{}", self.url));
        let (tx, rx) = oneshot::channel();
        if self.auto_end {
            let _ = tx.send(());
        } else {
            self.inner
                .pending_ends
                .lock()
                .unwrap()
                .entry(self.url.clone())
                .or_default()
                .push(tx);
        }
        Ok(PlaybackDone::new(rx))
    }

    fn pause(&self) {
        self.inner
            .events
            .lock()
            .unwrap()
            .push(format!("pause:{}", self.url));
    }
}

/// Highlight sink that records activations into the shared event log and
/// tracks how many anchors were ever active at once.
pub(crate) struct RecordingSink {
    events: EventLog,
    active: Mutex<Vec<String>>,
    max_active: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn new(events: EventLog) -> Self {
        Self {
            events,
            active: Mutex::new(Vec::new()),
            max_active: AtomicUsize::new(0),
        }
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn active_anchors(&self) -> Vec<String> {
        self.active.lock().unwrap().clone()
    }
}

impl HighlightSink for RecordingSink {
    fn activate(&self, anchor: &AnchorId) {
        let mut active = self.active.lock().unwrap();
        active.push(anchor.as_str().to_string());
        self.max_active.fetch_max(active.len(), Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(format!("highlight:{anchor}"));
    }

    fn clear_all(&self) {
        self.active.lock().unwrap().clear();
    }
}
