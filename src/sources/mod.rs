//! # Sources Module
//!
//! Everything that talks to YouTube tooling:
//!
//! - [`LocatorResolver`] turns user input into a playable [`Locator`] and
//!   produces display titles through the title cache.
//! - [`youtube::YouTubeClient`] is the search backend (text search through
//!   `yt-dlp`, title lookup through oEmbed).
//! - [`ytdlp::YtDlpStreamProvider`] spawns the extraction process that feeds
//!   the voice sink.

pub mod youtube;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::{fmt, sync::Arc, sync::LazyLock, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::{cache::TitleCache, error::MusicError};

pub use youtube::YouTubeClient;
pub use ytdlp::YtDlpStreamProvider;

/// Título mostrado cuando no se puede obtener el real
pub const UNKNOWN_TITLE: &str = "Unknown Title";

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://((www|m|music)\.)?(youtube\.com|youtu\.be)/")
        .expect("patrón de URL de YouTube inválido")
});

/// Resolved, playable track URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the text already looks like a YouTube video URL.
    pub fn is_video_url(input: &str) -> bool {
        YOUTUBE_URL.is_match(input)
    }

    /// Extrae el video ID (`watch?v=ID` o `youtu.be/ID`)
    pub fn video_id(&self) -> Option<String> {
        let parsed = Url::parse(&self.0).ok()?;

        if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            if !value.is_empty() {
                return Some(value.into_owned());
            }
        }

        if parsed.host_str() == Some("youtu.be") {
            return parsed
                .path_segments()?
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string);
        }

        None
    }

    /// Clave para la caché de títulos
    fn cache_key(&self) -> String {
        self.video_id().unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mejor resultado de una búsqueda de texto
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// Search service seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Top-ranked result for a free-text query, `None` when nothing matches.
    async fn search_top(&self, query: &str) -> Result<Option<SearchHit>>;

    /// Display title for a video id, `None` when the video is unknown.
    async fn lookup_title(&self, video_id: &str) -> Result<Option<String>>;
}

/// Turns user input into locators and locators into titles.
pub struct LocatorResolver {
    backend: Arc<dyn SearchBackend>,
    titles: TitleCache,
    search_timeout: Duration,
}

impl LocatorResolver {
    pub fn new(backend: Arc<dyn SearchBackend>, titles: TitleCache, search_timeout: Duration) -> Self {
        Self {
            backend,
            titles,
            search_timeout,
        }
    }

    pub fn titles(&self) -> &TitleCache {
        &self.titles
    }

    /// Resolves free text or a URL into a playable locator.
    ///
    /// URLs that already point at YouTube pass through untouched; anything
    /// else is searched and the top result wins.
    pub async fn resolve(&self, input: &str) -> Result<Locator, MusicError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MusicError::MissingQuery);
        }

        if Locator::is_video_url(input) {
            debug!("🔗 URL directa de YouTube: {}", input);
            return Ok(Locator::new(input));
        }

        info!("🔍 Buscando en YouTube: {}", input);
        let hit = timeout(self.search_timeout, self.backend.search_top(input))
            .await
            .map_err(|_| MusicError::Timeout("search"))?
            .map_err(|e| MusicError::Search(format!("{:#}", e)))?
            .ok_or(MusicError::NotFound)?;

        let locator = Locator::new(hit.url);
        self.titles.insert(locator.cache_key(), hit.title);
        Ok(locator)
    }

    /// Display title for a stored locator; never fails.
    pub async fn title(&self, locator: &Locator) -> String {
        let key = locator.cache_key();
        if let Some(title) = self.titles.get(&key) {
            return title;
        }

        let Some(video_id) = locator.video_id() else {
            return UNKNOWN_TITLE.to_string();
        };

        match timeout(self.search_timeout, self.backend.lookup_title(&video_id)).await {
            Ok(Ok(Some(title))) => {
                self.titles.insert(key, title.clone());
                title
            }
            Ok(Ok(None)) => {
                debug!("Video {} sin título disponible", video_id);
                UNKNOWN_TITLE.to_string()
            }
            Ok(Err(e)) => {
                warn!("⚠️ No se pudo obtener el título de {}: {:#}", video_id, e);
                UNKNOWN_TITLE.to_string()
            }
            Err(_) => {
                warn!("⏰ Timeout obteniendo el título de {}", video_id);
                UNKNOWN_TITLE.to_string()
            }
        }
    }
}
