//! Media subsystem seam.
//!
//! The engine never decodes or plays audio itself; it drives a
//! [`MediaBackend`] that turns candidate URLs into ready-to-play
//! [`AudioHandle`]s. Backends own their timeouts and error signaling.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Shared, ready-to-play audio handle.
pub type SharedHandle = Arc<dyn AudioHandle>;

/// Resolves when the associated playback reaches its natural end.
///
/// Handed out by [`AudioHandle::play`] at the moment playback starts, so a
/// clip that fails synchronously surfaces as the `Err` arm of `play` and can
/// never slip past an unregistered listener. If the playback is superseded or
/// the backend goes away, the future resolves as well; callers that must
/// distinguish a stale completion check their session token.
#[derive(Debug)]
pub struct PlaybackDone {
    rx: oneshot::Receiver<()>,
}

impl PlaybackDone {
    /// Wrap a receiver that will be signalled at end of media.
    #[must_use]
    pub fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Wait for the end of playback.
    pub async fn wait(self) {
        // A dropped sender means the playback was superseded; treat it the
        // same as a natural end and let the session token sort it out.
        let _ = self.rx.await;
    }
}

/// A loaded, decodable audio resource.
///
/// Handles are cached and replayed; `play` always starts from the beginning
/// of the clip.
#[async_trait]
pub trait AudioHandle: Send + Sync {
    /// Source URL this handle was loaded from.
    fn url(&self) -> &str;

    /// Start playback from the beginning.
    ///
    /// Returns the end-of-media future on success. A play-time failure is
    /// distinct from a load failure and is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackFailed`](crate::CoreError::PlaybackFailed)
    /// when playback cannot be started.
    async fn play(&self) -> Result<PlaybackDone>;

    /// Pause playback. No-op when the handle is not playing.
    fn pause(&self);
}

/// Loads one candidate URL into a ready-to-play handle.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Human-readable backend name for logging.
    fn name(&self) -> &'static str;

    /// Attempt to load a single candidate URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MediaLoad`](crate::CoreError::MediaLoad) when the
    /// resource cannot be fetched or decoded; the caller treats this as a
    /// load-level failure and moves on to the next candidate.
    async fn load(&self, url: &str) -> Result<SharedHandle>;
}
