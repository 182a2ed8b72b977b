//! # Cache Module
//!
//! In-memory metadata cache for the resolver backends.
//!
//! yt-dlp lookups take seconds, and the same video or search phrase is
//! requested many times across guilds (popular songs, catalog playlists that
//! share tracks). Results are cached by URL or search phrase with a TTL so
//! stale metadata eventually refreshes.
//!
//! ```env
//! CACHE_SIZE=500              # Maximum number of entries
//! CACHE_TTL_SECS=3600         # Time-to-live in seconds
//! ```

pub mod lru_cache;

use lru_cache::LRUCache;
use tracing::info;

use crate::sources::{VideoInfo, VideoPlaylist};

/// Cached yt-dlp answers, keyed by lookup kind + URL or phrase.
pub type MusicCache = LRUCache<String, CachedLookup>;

/// A cached backend answer. `Missing` records a confirmed not-found.
#[derive(Debug, Clone)]
pub enum CachedLookup {
    Video(VideoInfo),
    Playlist(VideoPlaylist),
    Missing,
}

impl MusicCache {
    /// Removes expired entries; meant to be called from a periodic task.
    pub fn cleanup_old_entries(&self) {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!(
                "🧹 Cache cleanup: removed {} expired entries ({}/{} in use)",
                removed,
                self.len(),
                self.capacity()
            );
        }
    }
}
