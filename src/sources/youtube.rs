use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{SearchBackend, SearchHit};

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Cliente para interactuar con YouTube/yt-dlp
pub struct YouTubeClient {
    client: reqwest::Client,
    ytdlp_path: String,
}

/// Entrada devuelta por `yt-dlp --dump-json --flat-playlist`
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl YtDlpEntry {
    fn into_hit(self) -> SearchHit {
        let url = self
            .webpage_url
            .or(self.url.filter(|u| u.starts_with("http")))
            .unwrap_or_else(|| watch_url(&self.id));

        SearchHit {
            url,
            title: self.title.unwrap_or_else(|| super::UNKNOWN_TITLE.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

impl YouTubeClient {
    pub fn new(ytdlp_path: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("beatbuddy/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Error creando cliente HTTP")?;

        Ok(Self {
            client,
            ytdlp_path: ytdlp_path.into(),
        })
    }

    /// Parses the first JSON line printed by a `ytsearch1:` run.
    fn parse_search_output(stdout: &str) -> Option<SearchHit> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .find_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
            .map(YtDlpEntry::into_hit)
    }
}

#[async_trait]
impl SearchBackend for YouTubeClient {
    async fn search_top(&self, query: &str) -> Result<Option<SearchHit>> {
        let search_query = format!("ytsearch1:{}", query);

        let output = Command::new(&self.ytdlp_path)
            .args([
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                search_query.as_str(),
            ])
            .kill_on_drop(true)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hit = Self::parse_search_output(&stdout);

        match &hit {
            Some(hit) => info!("✅ Mejor resultado: {} ({})", hit.title, hit.url),
            None => info!("📭 Sin resultados para: {}", query),
        }

        Ok(hit)
    }

    async fn lookup_title(&self, video_id: &str) -> Result<Option<String>> {
        debug!("📊 Obteniendo título de: {}", video_id);

        let request_url = format!(
            "{}?format=json&url={}",
            OEMBED_ENDPOINT,
            urlencoding::encode(&watch_url(video_id))
        );

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .context("Error en request a YouTube")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::BAD_REQUEST
        {
            return Ok(None);
        }

        let body: OembedResponse = response
            .error_for_status()
            .context("YouTube rechazó la consulta oEmbed")?
            .json()
            .await
            .context("Error al parsear respuesta oEmbed")?;

        Ok(Some(body.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_flat_search_entry() {
        let stdout = r#"{"_type": "url", "ie_key": "Youtube", "id": "dQw4w9WgXcQ", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "title": "Never Gonna Give You Up", "duration": 212.0}"#;
        assert_eq!(
            YouTubeClient::parse_search_output(stdout),
            Some(SearchHit {
                url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
                title: "Never Gonna Give You Up".into(),
            })
        );
    }

    #[test]
    fn test_parse_entry_without_url_builds_watch_url() {
        let stdout = "\n{\"id\": \"abc123\", \"title\": \"Song\"}\n";
        let hit = YouTubeClient::parse_search_output(stdout).unwrap();
        assert_eq!(hit.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(YouTubeClient::parse_search_output(""), None);
        assert_eq!(YouTubeClient::parse_search_output("WARNING: nada\n"), None);
    }
}
