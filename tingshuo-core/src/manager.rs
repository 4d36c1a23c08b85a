//! Facade wiring the engine together for the UI layer.
//!
//! The UI's triggers (sentence buttons, the conversation play/stop toggle,
//! stroke-order popups) are thin calls into [`AudioManager`]; it owns the
//! cache, the player, and the manifest.

use crate::cache::AudioCache;
use crate::config::TingshuoConfig;
use crate::engine::PlaybackEngine;
use crate::highlight::{HighlightSink, Highlighter};
use crate::manifest::{AudioManifest, GroupEntry, ManifestClient};
use crate::media::MediaBackend;
use crate::player::{PlayerEvent, PlayerStatus, SequencePlayer};
use crate::resolver::AudioKey;
use crate::strokes::{hanzi_in, StrokeOrderCarousel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cache and manifest counters, for diagnostics panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStats {
    pub cached_files: usize,
    pub loading_files: usize,
    pub total_files: u64,
}

/// The engine's front door.
pub struct AudioManager {
    cache: Arc<AudioCache>,
    player: Arc<SequencePlayer>,
    manifest_client: ManifestClient,
    manifest: RwLock<Option<AudioManifest>>,
    carousel: Mutex<StrokeOrderCarousel>,
    preload_enabled: bool,
}

impl AudioManager {
    /// Wire the engine from a configuration, media backend, and highlight
    /// sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest HTTP client cannot be created.
    pub fn new(
        config: &TingshuoConfig,
        backend: Arc<dyn MediaBackend>,
        sink: Arc<dyn HighlightSink>,
        cancel_token: Option<CancellationToken>,
    ) -> crate::error::Result<Arc<Self>> {
        let engine = Arc::new(PlaybackEngine::new(backend, config.resolver()));
        let cache = Arc::new(AudioCache::new(Arc::clone(&engine)));
        let highlighter = Arc::new(Highlighter::new(sink));
        let player = SequencePlayer::new(
            Arc::clone(&cache),
            engine,
            highlighter,
            cancel_token,
        );
        let manifest_client = ManifestClient::new(config.manifest_url())?;

        Ok(Arc::new(Self {
            cache,
            player,
            manifest_client,
            manifest: RwLock::new(None),
            carousel: Mutex::new(StrokeOrderCarousel::default()),
            preload_enabled: config.audio.preload_enabled,
        }))
    }

    /// Fetch the audio manifest. Absence is non-fatal: preload and info
    /// features stay disabled and everything else keeps working.
    pub async fn initialize(&self) {
        match self.manifest_client.fetch().await {
            Ok(manifest) => {
                info!("Audio manifest loaded: {} files", manifest.total_files);
                *self.manifest.write().await = Some(manifest);
            }
            Err(e) => {
                warn!("Could not load audio manifest: {}", e);
            }
        }
    }

    /// Install a manifest obtained by the host application itself.
    pub async fn install_manifest(&self, manifest: AudioManifest) {
        *self.manifest.write().await = Some(manifest);
    }

    /// Play one sentence clip, superseding any live session.
    ///
    /// The category is inferred from the filename. Empty and `"None"`
    /// filenames (absent audio in the page data) are ignored.
    pub fn play_sentence(&self, filename: &str) {
        if filename.is_empty() || filename == "None" {
            warn!("No audio file provided");
            return;
        }
        self.player.start(vec![AudioKey::infer(filename)]);
    }

    /// Play a whole conversation, sentence by sentence.
    pub fn play_conversation(&self, filenames: &[String]) {
        let keys: Vec<AudioKey> = filenames
            .iter()
            .filter(|f| !f.is_empty() && f.as_str() != "None")
            .map(|f| AudioKey::infer(f.as_str()))
            .collect();
        if keys.is_empty() {
            warn!("No audio files found");
            return;
        }
        self.player.start(keys);
    }

    /// Stop the live session, if any.
    pub fn stop_conversation(&self) {
        self.player.stop();
    }

    /// Stop if playing, else play the conversation from the first sentence.
    pub fn toggle_conversation(&self, filenames: &[String]) {
        if self.player.is_playing() {
            self.player.stop();
        } else {
            self.play_conversation(filenames);
        }
    }

    /// Best-effort warm of a conversation's clips.
    ///
    /// A no-op (returning 0) when preloading is disabled, the manifest is
    /// absent, or the conversation is unknown.
    pub async fn preload_conversation(&self, conversation_id: &str) -> usize {
        if !self.preload_enabled {
            return 0;
        }
        let keys = self
            .manifest
            .read()
            .await
            .as_ref()
            .map(|m| m.conversation_keys(conversation_id))
            .unwrap_or_default();
        if keys.is_empty() {
            return 0;
        }
        self.cache.preload(&keys).await
    }

    /// Manifest info for one conversation, when available.
    pub async fn conversation_info(&self, conversation_id: &str) -> Option<GroupEntry> {
        self.manifest
            .read()
            .await
            .as_ref()
            .and_then(|m| m.conversation(conversation_id).cloned())
    }

    /// Open the stroke-order carousel on the hanzi of `text`.
    pub fn show_stroke_order(&self, text: &str) {
        let characters = hanzi_in(text);
        if characters.is_empty() {
            return;
        }
        self.lock_carousel().show(characters, 0);
    }

    /// The carousel state, for the widget to drive and render.
    #[must_use]
    pub fn carousel(&self) -> MutexGuard<'_, StrokeOrderCarousel> {
        self.lock_carousel()
    }

    fn lock_carousel(&self) -> MutexGuard<'_, StrokeOrderCarousel> {
        self.carousel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop all cached handles to free memory.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn stats(&self) -> ManagerStats {
        let cache = self.cache.stats();
        let total_files = self
            .manifest
            .read()
            .await
            .as_ref()
            .map_or(0, |m| m.total_files);
        ManagerStats {
            cached_files: cache.ready,
            loading_files: cache.pending,
            total_files,
        }
    }

    /// Subscribe to playback events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.player.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> PlayerStatus {
        self.player.status()
    }
}
