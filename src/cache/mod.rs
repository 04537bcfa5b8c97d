//! # Cache Module
//!
//! Display-title cache for BeatBuddy.
//!
//! Queue rendering and "now playing" announcements need a human readable
//! title for every stored locator. Looking titles up on each render means one
//! external request per queued song, so resolved titles are kept here, keyed
//! by video identifier.
//!
//! ## Configuration
//!
//! ```env
//! TITLE_CACHE_SIZE=500        # Maximum number of cached titles
//! TITLE_CACHE_TTL_SECS=3600   # Entry lifetime; renamed videos show up after this
//! ```

pub mod lru_cache;

use lru_cache::LRUCache;
use tracing::info;

/// Video id (or raw URL when no id can be extracted) → display title.
pub type TitleCache = LRUCache<String, String>;

impl TitleCache {
    /// Performs cache maintenance by removing expired entries.
    ///
    /// Called hourly from the bot's maintenance task.
    pub fn cleanup_old_entries(&self) {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired titles", removed);
        }
    }
}
