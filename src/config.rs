use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Comandos de texto
    pub command_prefix: String,
    pub leave_command: String,

    // Audio
    pub default_volume: f32,
    pub ytdlp_path: String,

    // Timeouts
    pub search_timeout: Duration,
    pub stream_timeout: Duration,
    pub voice_join_timeout: Duration,

    // Caché de títulos
    pub title_cache_size: usize,
    pub title_cache_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// `load()` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            match lookup(key) {
                Some(val) if !val.trim().is_empty() => val.trim().to_string(),
                _ => default.to_string(),
            }
        };
        let secs = |key: &str, default: &str| -> Result<Duration> {
            let raw = var(key, default);
            let value: u64 = raw
                .parse()
                .with_context(|| format!("{} debe ser un número de segundos, recibido: {}", key, raw))?;
            Ok(Duration::from_secs(value))
        };

        let discord_token = lookup("DISCORD_TOKEN")
            .or_else(|| lookup("TOKEN"))
            .filter(|token| !token.trim().is_empty())
            .context("DISCORD_TOKEN no está definido")?;

        Ok(Self {
            // Discord
            discord_token,
            guild_id: match lookup("GUILD_ID") {
                Some(val) if !val.trim().is_empty() => Some(
                    val.trim()
                        .parse()
                        .with_context(|| format!("GUILD_ID inválido: {}", val))?,
                ),
                _ => None,
            },

            // Comandos de texto
            command_prefix: var("COMMAND_PREFIX", "/"),
            leave_command: var("LEAVE_COMMAND", "."),

            // Audio
            default_volume: var("DEFAULT_VOLUME", "0.5")
                .parse()
                .context("DEFAULT_VOLUME inválido")?,
            ytdlp_path: var("YTDLP_PATH", "yt-dlp"),

            // Timeouts
            search_timeout: secs("SEARCH_TIMEOUT_SECS", "15")?,
            stream_timeout: secs("STREAM_TIMEOUT_SECS", "20")?,
            voice_join_timeout: secs("VOICE_JOIN_TIMEOUT_SECS", "15")?,

            // Caché de títulos
            title_cache_size: var("TITLE_CACHE_SIZE", "500")
                .parse()
                .context("TITLE_CACHE_SIZE inválido")?,
            title_cache_ttl: secs("TITLE_CACHE_TTL_SECS", "3600")?,
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Timeouts and the title cache must be non-zero
    /// - Text command tokens must be a single non-empty word
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        for (name, timeout) in [
            ("SEARCH_TIMEOUT_SECS", self.search_timeout),
            ("STREAM_TIMEOUT_SECS", self.stream_timeout),
            ("VOICE_JOIN_TIMEOUT_SECS", self.voice_join_timeout),
            ("TITLE_CACHE_TTL_SECS", self.title_cache_ttl),
        ] {
            if timeout.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.title_cache_size == 0 {
            anyhow::bail!("Title cache size must be greater than 0");
        }

        for (name, token) in [
            ("COMMAND_PREFIX", &self.command_prefix),
            ("LEAVE_COMMAND", &self.leave_command),
        ] {
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                anyhow::bail!("{} must be a single word, got: {:?}", name, token);
            }
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Never includes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Text: prefix {:?}, leave {:?}\n  \
            Audio: {}% vol, extractor {}\n  \
            Timeouts: search {}, stream {}, voice {}\n  \
            Titles: {} entries, ttl {}",
            self.guild_id
                .map_or("global".to_string(), |id| format!("guild {}", id)),
            self.command_prefix,
            self.leave_command,
            (self.default_volume * 100.0) as u32,
            self.ytdlp_path,
            humantime::format_duration(self.search_timeout),
            humantime::format_duration(self.stream_timeout),
            humantime::format_duration(self.voice_join_timeout),
            self.title_cache_size,
            humantime::format_duration(self.title_cache_ttl),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "secret")]).unwrap();
        assert_eq!(config.command_prefix, "/");
        assert_eq!(config.leave_command, ".");
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.ytdlp_path, "yt-dlp");
        assert_eq!(config.search_timeout, Duration::from_secs(15));
        assert_eq!(config.guild_id, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "   ")]).is_err());
    }

    #[test]
    fn test_legacy_token_variable() {
        let config = load(&[("TOKEN", "legacy")]).unwrap();
        assert_eq!(config.discord_token, "legacy");
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("DISCORD_TOKEN", "t"), ("GUILD_ID", "abc")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("SEARCH_TIMEOUT_SECS", "-1")]).is_err());

        let config = load(&[("DISCORD_TOKEN", "t"), ("DEFAULT_VOLUME", "3.0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("DISCORD_TOKEN", "t"), ("STREAM_TIMEOUT_SECS", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("DISCORD_TOKEN", "t"), ("COMMAND_PREFIX", "!")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = load(&[("DISCORD_TOKEN", "super-secret"), ("GUILD_ID", "42")]).unwrap();
        let summary = config.summary();
        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("guild 42"));
    }
}
