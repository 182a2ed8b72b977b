use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ui::messages::Locale;

const DEFAULT_VIDEO_HOSTS: &str =
    "www.youtube.com,youtu.be,youtube.com,music.youtube.com,www.music.youtube.com";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Cola y resolución
    pub default_playlist_limit: usize,
    pub max_queue_size: usize,
    pub search_concurrency: usize,
    pub auto_resume_on_add: bool,
    pub video_hosts: Vec<String>,

    // Caché
    pub cache_size: usize,
    pub cache_ttl_secs: u64,

    // APIs (Opcionales)
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub ytdlp_path: String,

    // Paths
    pub data_dir: PathBuf,

    pub locale: Locale,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            default_playlist_limit: std::env::var("DEFAULT_PLAYLIST_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            search_concurrency: std::env::var("SEARCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            auto_resume_on_add: std::env::var("AUTO_RESUME_ON_ADD")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            video_hosts: parse_hosts(
                &std::env::var("VIDEO_HOSTS").unwrap_or_else(|_| DEFAULT_VIDEO_HOSTS.to_string()),
            ),

            cache_size: std::env::var("CACHE_SIZE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hora
                .parse()?,

            spotify_client_id: non_empty_var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty_var("SPOTIFY_CLIENT_SECRET"),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),

            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            locale: std::env::var("BOT_LOCALE")
                .map(|value| Locale::from_tag(&value))
                .unwrap_or_default(),
        };

        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - Playlist limit, queue size and cache size must be greater than 0
    /// - Search concurrency must be at least 1
    /// - At least one video host must be configured
    pub fn validate(&self) -> Result<()> {
        if self.default_playlist_limit == 0 {
            anyhow::bail!("Default playlist limit must be greater than 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.search_concurrency == 0 {
            anyhow::bail!("Search concurrency must be at least 1");
        }

        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        if self.video_hosts.is_empty() {
            anyhow::bail!("At least one video host must be configured");
        }

        Ok(())
    }

    /// Both Spotify credentials, when configured.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes tokens and API secrets.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Queue: {} max, playlist limit {}, auto-resume={}\n  \
            Resolver: {} video hosts, {} concurrent searches, Spotify={}\n  \
            Cache: {} entries, {}s TTL\n  \
            Locale: {:?}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.max_queue_size,
            self.default_playlist_limit,
            self.auto_resume_on_add,
            self.video_hosts.len(),
            self.search_concurrency,
            self.spotify_credentials().is_some(),
            self.cache_size,
            self.cache_ttl_secs,
            self.locale,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin defaults, deben venir del entorno)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            default_playlist_limit: 50,
            max_queue_size: 1000,
            search_concurrency: 4,
            auto_resume_on_add: true,
            video_hosts: parse_hosts(DEFAULT_VIDEO_HOSTS),

            cache_size: 500,
            cache_ttl_secs: 3600,

            spotify_client_id: None,
            spotify_client_secret: None,
            ytdlp_path: "yt-dlp".to_string(),

            data_dir: "./data".into(),

            locale: Locale::default(),
        }
    }
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|host| host.trim().to_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
