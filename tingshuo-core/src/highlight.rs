//! Visual highlight state synchronized with playback.
//!
//! The engine only deals in logical [`AnchorId`]s; a UI adapter implements
//! [`HighlightSink`] and resolves each anchor to its concrete nodes (the
//! speaker button and the input element paired with it).

use crate::resolver::AudioKey;
use std::sync::{Arc, Mutex, PoisonError};

/// Logical identity of a highlightable anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorId(String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&AudioKey> for AnchorId {
    fn from(key: &AudioKey) -> Self {
        Self(key.filename.clone())
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// UI adapter for toggling highlight state.
///
/// Implementations mark the anchor's nodes active and must treat `clear_all`
/// as idempotent; the engine may call it when nothing is active.
pub trait HighlightSink: Send + Sync {
    fn activate(&self, anchor: &AnchorId);
    fn clear_all(&self);
}

/// Sink that renders nothing. Used when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHighlightSink;

impl HighlightSink for NoopHighlightSink {
    fn activate(&self, _anchor: &AnchorId) {}
    fn clear_all(&self) {}
}

/// Enforces mutually-exclusive highlighting over a [`HighlightSink`].
///
/// At most one anchor (and its paired element) is active at any time; the
/// previous anchor is always cleared before a new one is activated.
pub struct Highlighter {
    sink: Arc<dyn HighlightSink>,
    active: Mutex<Option<AnchorId>>,
}

impl Highlighter {
    pub fn new(sink: Arc<dyn HighlightSink>) -> Self {
        Self {
            sink,
            active: Mutex::new(None),
        }
    }

    /// Make `anchor` the single active anchor.
    pub fn activate(&self, anchor: AnchorId) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref() == Some(&anchor) {
            return;
        }
        self.sink.clear_all();
        self.sink.activate(&anchor);
        *active = Some(anchor);
    }

    /// Deactivate everything. Safe to call when nothing is active.
    pub fn clear_all(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        self.sink.clear_all();
        *active = None;
    }

    /// Currently active anchor, if any.
    #[must_use]
    pub fn active(&self) -> Option<AnchorId> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Category;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        active: Mutex<Vec<AnchorId>>,
        max_active: AtomicUsize,
    }

    impl HighlightSink for CountingSink {
        fn activate(&self, anchor: &AnchorId) {
            let mut active = self.active.lock().unwrap();
            active.push(anchor.clone());
            self.max_active.fetch_max(active.len(), Ordering::SeqCst);
        }

        fn clear_all(&self) {
            self.active.lock().unwrap().clear();
        }
    }

    #[test]
    fn test_anchor_from_key_uses_filename() {
        let key = AudioKey::new(Category::Stories, "story_1_part_2.mp3");
        assert_eq!(AnchorId::from(&key).as_str(), "story_1_part_2.mp3");
    }

    #[test]
    fn test_at_most_one_active() {
        let sink = Arc::new(CountingSink::default());
        let highlighter = Highlighter::new(sink.clone());

        highlighter.activate(AnchorId::new("a"));
        highlighter.activate(AnchorId::new("b"));
        highlighter.activate(AnchorId::new("c"));

        assert_eq!(sink.max_active.load(Ordering::SeqCst), 1);
        let active = sink.active.lock().unwrap();
        assert_eq!(active.as_slice(), &[AnchorId::new("c")]);
    }

    #[test]
    fn test_activating_next_deactivates_previous() {
        let sink = Arc::new(CountingSink::default());
        let highlighter = Highlighter::new(sink.clone());

        highlighter.activate(AnchorId::new("a"));
        highlighter.activate(AnchorId::new("b"));

        assert_eq!(highlighter.active(), Some(AnchorId::new("b")));
        assert_eq!(sink.active.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_reactivating_same_anchor_is_noop() {
        let sink = Arc::new(CountingSink::default());
        let highlighter = Highlighter::new(sink.clone());

        highlighter.activate(AnchorId::new("a"));
        highlighter.activate(AnchorId::new("a"));

        assert_eq!(sink.active.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_all_idempotent() {
        let sink = Arc::new(CountingSink::default());
        let highlighter = Highlighter::new(sink.clone());

        highlighter.clear_all();
        highlighter.activate(AnchorId::new("a"));
        highlighter.clear_all();
        highlighter.clear_all();

        assert_eq!(highlighter.active(), None);
        assert!(sink.active.lock().unwrap().is_empty());
    }
}
