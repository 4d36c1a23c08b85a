use thiserror::Error;

/// Every candidate location for an audio key was attempted and failed.
///
/// Kept as its own cloneable type so the cache can fan the same failure out
/// to every caller coalesced onto one in-flight load.
#[derive(Debug, Clone, Error)]
#[error("all {} candidate paths failed for {filename}: {}", .tried.len(), .tried.join(", "))]
pub struct ResolutionExhausted {
    /// Filename of the audio key that could not be resolved
    pub filename: String,
    /// Candidate URLs attempted, in order
    pub tried: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CoreError {
    // Resolution / playback errors
    #[error(transparent)]
    ResolutionExhausted(#[from] ResolutionExhausted),

    #[error("playback failed for {filename}: {reason}")]
    PlaybackFailed { filename: String, reason: String },

    #[error("media backend could not load {url}: {reason}")]
    MediaLoad { url: String, reason: String },

    // Manifest errors (non-fatal: preload and info features degrade to no-ops)
    #[error("audio manifest unavailable: {reason}")]
    ManifestUnavailable { reason: String },

    // Configuration errors
    #[error("failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Network errors
    #[error("network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
