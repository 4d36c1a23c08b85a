pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod manager;
pub mod manifest;
pub mod media;
pub mod player;
pub mod resolver;
pub mod routes;
pub mod strokes;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{AudioCache, CacheStats};
pub use config::{AudioConfig, ServerConfig, TingshuoConfig};
pub use engine::PlaybackEngine;
pub use error::{CoreError, ResolutionExhausted, Result};
pub use highlight::{AnchorId, HighlightSink, Highlighter, NoopHighlightSink};
pub use manager::{AudioManager, ManagerStats};
pub use manifest::{AudioManifest, FileMeta, GroupEntry, ManifestClient};
pub use media::{AudioHandle, MediaBackend, PlaybackDone, SharedHandle};
pub use player::{PlayerEvent, PlayerStatus, SequencePlayer};
pub use resolver::{AssetResolver, AudioKey, Category};
pub use strokes::{hanzi_in, StrokeOrderCarousel};
