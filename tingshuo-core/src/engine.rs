//! Candidate fallback and playback start.

use crate::error::{CoreError, ResolutionExhausted, Result};
use crate::media::{MediaBackend, PlaybackDone, SharedHandle};
use crate::resolver::{AssetResolver, AudioKey};
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads audio keys by walking their candidate URLs in order and starts
/// playback on loaded handles.
pub struct PlaybackEngine {
    backend: Arc<dyn MediaBackend>,
    resolver: AssetResolver,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn MediaBackend>, resolver: AssetResolver) -> Self {
        Self { backend, resolver }
    }

    /// Resolve a key and load the first candidate that succeeds.
    ///
    /// Candidates are attempted strictly in order; the point is the
    /// legacy-path fallback, not latency hiding, so attempts are never
    /// parallel. No attempt is made past the first success.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionExhausted`] only when every candidate has been
    /// attempted and failed.
    pub async fn load(&self, key: &AudioKey) -> std::result::Result<SharedHandle, ResolutionExhausted> {
        let candidates = self.resolver.resolve(key);
        self.load_candidates(key, candidates).await
    }

    /// Load from an explicit candidate list, most-preferred first.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionExhausted`] when all candidates fail.
    pub async fn load_candidates(
        &self,
        key: &AudioKey,
        candidates: Vec<String>,
    ) -> std::result::Result<SharedHandle, ResolutionExhausted> {
        let mut tried = Vec::with_capacity(candidates.len());
        for url in candidates {
            debug!("Trying audio path: {}", url);
            match self.backend.load(&url).await {
                Ok(handle) => {
                    debug!("Loaded {} from {}", key, url);
                    return Ok(handle);
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", url, e);
                    tried.push(url);
                }
            }
        }
        Err(ResolutionExhausted {
            filename: key.filename.clone(),
            tried,
        })
    }

    /// Start playback on a loaded handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackFailed`] on a play-time error. Playback
    /// errors are reported, not retried.
    pub async fn play(&self, key: &AudioKey, handle: &SharedHandle) -> Result<PlaybackDone> {
        handle.play().await.map_err(|e| {
            warn!("Error playing {}: {}", key, e);
            CoreError::PlaybackFailed {
                filename: key.filename.clone(),
                reason: e.to_string(),
            }
        })
    }
}
