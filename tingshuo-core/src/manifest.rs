//! Server-generated catalog of available audio files.
//!
//! The manifest is read-only and loaded once at startup. Its absence is
//! non-fatal: preload and info features simply degrade to no-ops.

use crate::error::{CoreError, Result};
use crate::resolver::{AudioKey, Category};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Metadata for one audio file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct FileMeta {
    #[serde(default)]
    pub size_mb: f64,
    #[serde(default)]
    pub path: String,
}

/// A group of related clips (one conversation or one story).
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct GroupEntry {
    #[serde(default)]
    pub files: HashMap<String, FileMeta>,
    #[serde(default)]
    pub total_size_mb: f64,
    #[serde(default, alias = "total_files")]
    pub file_count: u64,
}

/// The full manifest tree as produced by the audio pipeline.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct AudioManifest {
    #[serde(default)]
    pub hsk_characters: HashMap<String, FileMeta>,
    #[serde(default)]
    pub conversations: HashMap<String, GroupEntry>,
    #[serde(default)]
    pub stories: HashMap<String, GroupEntry>,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub total_size_mb: f64,
}

impl AudioManifest {
    /// Info for one conversation, if the manifest knows it.
    #[must_use]
    pub fn conversation(&self, conversation_id: &str) -> Option<&GroupEntry> {
        self.conversations.get(conversation_id)
    }

    /// Audio keys of all clips in a conversation, for preloading.
    ///
    /// Empty when the conversation is unknown.
    #[must_use]
    pub fn conversation_keys(&self, conversation_id: &str) -> Vec<AudioKey> {
        self.conversation(conversation_id).map_or_else(Vec::new, |entry| {
            entry
                .files
                .keys()
                .map(|filename| AudioKey::new(Category::Conversations, filename.clone()))
                .collect()
        })
    }

    /// Audio keys of all parts of a story, for preloading.
    #[must_use]
    pub fn story_keys(&self, story_id: &str) -> Vec<AudioKey> {
        self.stories.get(story_id).map_or_else(Vec::new, |entry| {
            entry
                .files
                .keys()
                .map(|filename| AudioKey::new(Category::Stories, filename.clone()))
                .collect()
        })
    }
}

/// Fetches the manifest JSON from the server.
pub struct ManifestClient {
    client: reqwest::Client,
    url: String,
}

impl ManifestClient {
    /// Create a client for the given manifest URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Fetch and parse the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ManifestUnavailable`] on any network, status, or
    /// parse problem. Callers treat this as a degradation, not a failure.
    pub async fn fetch(&self) -> Result<AudioManifest> {
        debug!("Fetching audio manifest from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CoreError::ManifestUnavailable {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::ManifestUnavailable {
                reason: format!("server returned {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::ManifestUnavailable {
                reason: e.to_string(),
            })
    }
}
