use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{ChapterMark, VideoBackend, VideoInfo, VideoPlaylist};
use crate::cache::{CachedLookup, MusicCache};

/// Cliente para interactuar con YouTube vía yt-dlp
pub struct YouTubeClient {
    ytdlp_path: String,
    rate_limiter: Semaphore,
    cache: Arc<MusicCache>,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
    chapters: Option<Vec<YtDlpChapter>>,
}

#[derive(Debug, Deserialize)]
struct YtDlpChapter {
    start_time: f64,
    end_time: f64,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YtDlpPlaylist {
    title: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    entries: Vec<Option<YtDlpInfo>>,
}

/// Mensajes de yt-dlp que indican que el recurso no existe
const MISSING_MARKERS: [&str; 5] = [
    "video unavailable",
    "does not exist",
    "private video",
    "not found",
    "this playlist type is unviewable",
];

impl YouTubeClient {
    pub fn new(ytdlp_path: impl Into<String>, cache: Arc<MusicCache>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            // Limitar procesos concurrentes para evitar rate limiting
            rate_limiter: Semaphore::new(3),
            cache,
        }
    }

    /// Ejecuta yt-dlp; `Ok(None)` cuando el recurso no existe
    async fn run(&self, args: &[&str]) -> Result<Option<String>> {
        let _permit = self.rate_limiter.acquire().await?;

        let output = Command::new(&self.ytdlp_path)
            .args(args)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            let lowered = error.to_lowercase();
            if MISSING_MARKERS.iter().any(|marker| lowered.contains(marker)) {
                debug!("❓ yt-dlp no encontró el recurso: {}", error.trim());
                return Ok(None);
            }
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    async fn cached_or<F, Fut>(&self, key: String, lookup: F) -> Result<CachedLookup>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<CachedLookup>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            debug!("💾 Cache hit: {}", key);
            return Ok(hit);
        }

        let value = lookup().await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    /// Actualiza yt-dlp (debe ejecutarse periódicamente)
    pub async fn update_ytdlp(&self) -> Result<()> {
        info!("🔄 Actualizando yt-dlp...");

        let output = Command::new(&self.ytdlp_path).arg("-U").output().await?;

        if output.status.success() {
            info!("✅ yt-dlp actualizado exitosamente");
        } else {
            warn!(
                "⚠️ No se pudo actualizar yt-dlp: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(())
    }
}

fn info_to_video(info: YtDlpInfo) -> VideoInfo {
    let url = info
        .webpage_url
        .or_else(|| info.url.filter(|url| url.starts_with("http")))
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", info.id));

    let is_live = info.is_live.unwrap_or(false);
    // La marca de vivo manda sobre la duración reportada
    let duration = if is_live {
        None
    } else {
        info.duration.map(Duration::from_secs_f64)
    };

    let chapters = info
        .chapters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, chapter)| ChapterMark {
            title: chapter
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| format!("Capítulo {}", index + 1)),
            start: Duration::from_secs_f64(chapter.start_time.max(0.0)),
            end: Duration::from_secs_f64(chapter.end_time.max(0.0)),
        })
        .collect();

    VideoInfo {
        title: info.title.unwrap_or_else(|| info.id.clone()),
        artist: info.uploader.or(info.channel),
        url,
        duration,
        thumbnail: info.thumbnail,
        chapters,
    }
}

fn parse_video(stdout: &str) -> Option<VideoInfo> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
        .map(info_to_video)
}

fn parse_playlist(stdout: &str, fallback_url: &str) -> Result<VideoPlaylist> {
    let playlist: YtDlpPlaylist =
        serde_json::from_str(stdout.trim()).context("Error al parsear playlist de yt-dlp")?;

    Ok(VideoPlaylist {
        title: playlist.title.unwrap_or_else(|| "Playlist".to_string()),
        url: playlist
            .webpage_url
            .unwrap_or_else(|| fallback_url.to_string()),
        items: playlist
            .entries
            .into_iter()
            .flatten()
            .map(info_to_video)
            .collect(),
    })
}

#[async_trait]
impl VideoBackend for YouTubeClient {
    async fn video(&self, url: &str) -> Result<Option<VideoInfo>> {
        debug!("📊 Obteniendo info de: {}", url);

        let lookup = self
            .cached_or(format!("video:{url}"), || self.fetch_video(url))
            .await?;

        Ok(match lookup {
            CachedLookup::Video(info) => Some(info),
            _ => None,
        })
    }

    async fn playlist(&self, list_id: &str) -> Result<Option<VideoPlaylist>> {
        let lookup = self
            .cached_or(format!("playlist:{list_id}"), || self.fetch_playlist(list_id))
            .await?;

        Ok(match lookup {
            CachedLookup::Playlist(playlist) => Some(playlist),
            _ => None,
        })
    }

    async fn search(&self, query: &str) -> Result<Option<VideoInfo>> {
        let key = format!("search:{}", query.to_lowercase());
        let lookup = self.cached_or(key, || self.fetch_search(query)).await?;

        Ok(match lookup {
            CachedLookup::Video(info) => Some(info),
            _ => None,
        })
    }
}

impl YouTubeClient {
    async fn fetch_video(&self, url: &str) -> Result<CachedLookup> {
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", url])
            .await?;

        Ok(stdout
            .and_then(|out| parse_video(&out))
            .map_or(CachedLookup::Missing, CachedLookup::Video))
    }

    async fn fetch_playlist(&self, list_id: &str) -> Result<CachedLookup> {
        let url = format!("https://www.youtube.com/playlist?list={list_id}");
        info!("📋 Obteniendo playlist: {}", url);

        let Some(stdout) = self
            .run(&["--flat-playlist", "--dump-single-json", "--no-warnings", url.as_str()])
            .await?
        else {
            return Ok(CachedLookup::Missing);
        };

        let playlist = parse_playlist(&stdout, &url)?;
        if playlist.items.is_empty() {
            return Ok(CachedLookup::Missing);
        }

        Ok(CachedLookup::Playlist(playlist))
    }

    async fn fetch_search(&self, query: &str) -> Result<CachedLookup> {
        info!("🔍 Buscando en YouTube: {}", query);

        let search_query = format!("ytsearch1:{query}");
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", search_query.as_str()])
            .await?;

        Ok(stdout
            .and_then(|out| parse_video(&out))
            .map_or(CachedLookup::Missing, CachedLookup::Video))
    }
}
