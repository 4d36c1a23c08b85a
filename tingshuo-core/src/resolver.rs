//! Audio key identity and candidate URL derivation.

use crate::routes;
use serde::{Deserialize, Serialize};

/// Audio category, matching the directory layout under the audio root.
///
/// The string identifiers are stable and appear in URLs and the manifest,
/// so they must not change once established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Per-sentence conversation clips
    Conversations,
    /// Single-character HSK pronunciation clips
    HskCharacters,
    /// Short-story narration clips
    Stories,
}

impl Category {
    /// Get the string identifier used in URLs and manifest lookups.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversations => "conversations",
            Self::HskCharacters => "hsk_characters",
            Self::Stories => "stories",
        }
    }

    /// Infer the category from a bare filename.
    ///
    /// Filenames carrying an HSK marker belong to the character set, a
    /// `story_` prefix marks narration clips, and everything else is treated
    /// as conversation audio.
    #[must_use]
    pub fn infer(filename: &str) -> Self {
        if filename.contains("_HSK") {
            Self::HskCharacters
        } else if filename.starts_with("story_") {
            Self::Stories
        } else {
            Self::Conversations
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one audio resource: category plus filename.
///
/// Exact value equality; used as the cache lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioKey {
    pub category: Category,
    pub filename: String,
}

impl AudioKey {
    /// Create a key with an explicit category.
    pub fn new(category: Category, filename: impl Into<String>) -> Self {
        Self {
            category,
            filename: filename.into(),
        }
    }

    /// Create a key, inferring the category from the filename.
    pub fn infer(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            category: Category::infer(&filename),
            filename,
        }
    }
}

impl std::fmt::Display for AudioKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.filename)
    }
}

/// Derives the ordered list of candidate URLs for an audio key.
///
/// Pure and deterministic; no I/O. The categorized path comes first, then the
/// legacy flat roots in migration order. A malformed or empty filename still
/// yields candidates; it fails at load time, not here.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base_url: String,
    audio_root: String,
    legacy_roots: Vec<String>,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            audio_root: routes::AUDIO_ROOT.to_string(),
            legacy_roots: vec![
                routes::LEGACY_AUDIO_ROOT.to_string(),
                routes::LEGACY_STATIC_ROOT.to_string(),
            ],
        }
    }
}

impl AssetResolver {
    /// Create a resolver with explicit roots.
    ///
    /// `base_url` is prepended to every candidate; empty means same-origin
    /// relative URLs.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        audio_root: impl Into<String>,
        legacy_roots: Vec<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            audio_root: audio_root.into(),
            legacy_roots,
        }
    }

    /// Derive the candidate URLs for a key, most-preferred first.
    #[must_use]
    pub fn resolve(&self, key: &AudioKey) -> Vec<String> {
        let filename = urlencoding::encode(&key.filename);
        let mut candidates = Vec::with_capacity(1 + self.legacy_roots.len());
        candidates.push(format!(
            "{}{}/{}/{}",
            self.base_url,
            self.audio_root,
            key.category.as_str(),
            filename
        ));
        for root in &self.legacy_roots {
            candidates.push(format!("{}{}/{}", self.base_url, root, filename));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_as_str() {
        assert_eq!(Category::Conversations.as_str(), "conversations");
        assert_eq!(Category::HskCharacters.as_str(), "hsk_characters");
        assert_eq!(Category::Stories.as_str(), "stories");
    }

    #[test]
    fn test_infer_hsk_marker() {
        assert_eq!(Category::infer("ni_HSK1.mp3"), Category::HskCharacters);
        assert_eq!(Category::infer("hao_HSK2.mp3"), Category::HskCharacters);
    }

    #[test]
    fn test_infer_story_prefix() {
        assert_eq!(Category::infer("story_3_part_1.mp3"), Category::Stories);
    }

    #[test]
    fn test_infer_default_is_conversation() {
        assert_eq!(Category::infer("conv_12_s01.mp3"), Category::Conversations);
        assert_eq!(Category::infer(""), Category::Conversations);
    }

    #[test]
    fn test_resolve_order_new_path_first() {
        let resolver = AssetResolver::default();
        let key = AudioKey::new(Category::Conversations, "conv_1_s01.mp3");
        let candidates = resolver.resolve(&key);
        assert_eq!(
            candidates,
            vec![
                "/audio/conversations/conv_1_s01.mp3",
                "/static/audio_files/conv_1_s01.mp3",
                "/static/conv_1_s01.mp3",
            ]
        );
    }

    #[test]
    fn test_resolve_uses_category_segment() {
        let resolver = AssetResolver::default();
        let key = AudioKey::infer("story_2_part_3.mp3");
        let candidates = resolver.resolve(&key);
        assert_eq!(candidates[0], "/audio/stories/story_2_part_3.mp3");
    }

    #[test]
    fn test_resolve_with_base_url() {
        let resolver = AssetResolver::new(
            "https://cdn.example.com",
            "/audio",
            vec!["/static/audio_files".to_string()],
        );
        let key = AudioKey::new(Category::HskCharacters, "ni_HSK1.mp3");
        let candidates = resolver.resolve(&key);
        assert_eq!(
            candidates,
            vec![
                "https://cdn.example.com/audio/hsk_characters/ni_HSK1.mp3",
                "https://cdn.example.com/static/audio_files/ni_HSK1.mp3",
            ]
        );
    }

    #[test]
    fn test_resolve_encodes_filename() {
        let resolver = AssetResolver::default();
        let key = AudioKey::new(Category::Conversations, "你好 1.mp3");
        let candidates = resolver.resolve(&key);
        assert!(candidates[0].starts_with("/audio/conversations/%"));
        assert!(!candidates[0].contains(' '));
    }

    #[test]
    fn test_resolve_empty_filename_still_yields_candidates() {
        let resolver = AssetResolver::default();
        let key = AudioKey::new(Category::Conversations, "");
        let candidates = resolver.resolve(&key);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], "/audio/conversations/");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = AssetResolver::default();
        let key = AudioKey::infer("conv_9_s02.mp3");
        assert_eq!(resolver.resolve(&key), resolver.resolve(&key));
    }
}
