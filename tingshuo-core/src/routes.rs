//! URL route constants for audio assets.

/// Root of the categorized audio layout (`/audio/{category}/{filename}`)
pub const AUDIO_ROOT: &str = "/audio";

/// Legacy flat layout the categorized one migrated away from
pub const LEGACY_AUDIO_ROOT: &str = "/static/audio_files";

/// Oldest flat layout, still carrying a handful of story files
pub const LEGACY_STATIC_ROOT: &str = "/static";

/// Server-generated catalog of available audio files
pub const MANIFEST_PATH: &str = "/audio/manifest.json";
