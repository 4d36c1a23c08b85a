use crate::error::Result;
use crate::resolver::AssetResolver;
use crate::routes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TingshuoConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Absolute base URL prepended to every asset path; empty means
    /// same-origin relative URLs.
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Root of the categorized audio layout
    #[serde(default = "default_audio_root")]
    pub root: String,
    /// Flat legacy roots tried after the categorized path, in order
    #[serde(default = "default_legacy_roots")]
    pub legacy_roots: Vec<String>,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Whether manifest-driven preloading is enabled
    #[serde(default = "default_true")]
    pub preload_enabled: bool,
}

fn default_audio_root() -> String {
    routes::AUDIO_ROOT.to_string()
}

fn default_legacy_roots() -> Vec<String> {
    vec![
        routes::LEGACY_AUDIO_ROOT.to_string(),
        routes::LEGACY_STATIC_ROOT.to_string(),
    ]
}

fn default_manifest_path() -> String {
    routes::MANIFEST_PATH.to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            root: default_audio_root(),
            legacy_roots: default_legacy_roots(),
            manifest_path: default_manifest_path(),
            preload_enabled: default_true(),
        }
    }
}

impl TingshuoConfig {
    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(Into::into)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Build the asset resolver described by this configuration.
    #[must_use]
    pub fn resolver(&self) -> AssetResolver {
        AssetResolver::new(
            self.server.base_url.clone(),
            self.audio.root.clone(),
            self.audio.legacy_roots.clone(),
        )
    }

    /// Full URL of the audio manifest.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        format!("{}{}", self.server.base_url, self.audio.manifest_path)
    }
}
