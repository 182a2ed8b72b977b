use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64_ENGINE, Engine};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CatalogBackend, CatalogList, CatalogTrack};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

/// Tipo de recurso dentro del catálogo de Spotify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl CatalogKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(Self::Track),
            "album" => Some(Self::Album),
            "playlist" => Some(Self::Playlist),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }
}

fn catalog_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:spotify:(track|album|playlist|artist):([A-Za-z0-9]+)|https?://open\.spotify\.com/(?:intl-[A-Za-z-]+/)?(track|album|playlist|artist)/([A-Za-z0-9]+))",
        )
        .ok()
    })
    .as_ref()
}

/// Extrae tipo e id de una URL `open.spotify.com` o URI `spotify:`
pub fn parse_catalog_url(url: &str) -> Option<(CatalogKind, String)> {
    let captures = catalog_regex()?.captures(url.trim())?;
    let kind = captures.get(1).or_else(|| captures.get(3))?;
    let id = captures.get(2).or_else(|| captures.get(4))?;

    Some((CatalogKind::from_segment(kind.as_str())?, id.as_str().to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    duration_ms: Option<u64>,
}

impl From<ApiTrack> for CatalogTrack {
    fn from(track: ApiTrack) -> Self {
        Self {
            name: track.name,
            artists: track.artists.into_iter().map(|artist| artist.name).collect(),
            duration: track.duration_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    name: String,
    tracks: Page<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: String,
    tracks: Page<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    tracks: Vec<ApiTrack>,
}

/// Cliente de la Web API de Spotify con credenciales de aplicación
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    http: Client,
    token: Mutex<Option<(String, Instant)>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client_id,
            client_secret,
            http,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if let Some((value, expires_at)) = token.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(value.clone());
            }
        }

        debug!("🔑 Solicitando token de Spotify");
        let credentials =
            B64_ENGINE.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()
            .context("Spotify rechazó las credenciales")?
            .json()
            .await?;

        // Renovar un minuto antes de que expire
        let lifetime = Duration::from_secs(response.expires_in.saturating_sub(60));
        *token = Some((response.access_token.clone(), Instant::now() + lifetime));

        Ok(response.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.access_token().await?;
        let value = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Error consultando {url}"))?
            .json()
            .await?;
        Ok(value)
    }

    /// Recorre las páginas siguientes de un listado paginado
    async fn drain_pages<T, U, F>(&self, first: Page<T>, mut push: F) -> Result<Vec<U>>
    where
        T: serde::de::DeserializeOwned,
        F: FnMut(T) -> Option<U>,
    {
        let mut out: Vec<U> = first.items.into_iter().filter_map(&mut push).collect();
        let mut next = first.next;

        while let Some(url) = next {
            let page: Page<T> = self.get(&url).await?;
            out.extend(page.items.into_iter().filter_map(&mut push));
            next = page.next;
        }

        Ok(out)
    }
}

#[async_trait]
impl CatalogBackend for SpotifyClient {
    async fn tracks(&self, url: &str) -> Result<Option<CatalogList>> {
        let Some((kind, id)) = parse_catalog_url(url) else {
            debug!("URL de Spotify no soportada: {}", url);
            return Ok(None);
        };

        info!("🎧 Consultando Spotify {:?} {}", kind, id);

        let list = match kind {
            CatalogKind::Track => {
                let track: ApiTrack = self.get(&format!("{API_URL}/tracks/{id}")).await?;
                CatalogList {
                    title: track.name.clone(),
                    tracks: vec![track.into()],
                }
            }
            CatalogKind::Album => {
                let album: ApiAlbum = self.get(&format!("{API_URL}/albums/{id}")).await?;
                let tracks = self
                    .drain_pages(album.tracks, |track: ApiTrack| Some(CatalogTrack::from(track)))
                    .await?;
                CatalogList {
                    title: album.name,
                    tracks,
                }
            }
            CatalogKind::Playlist => {
                let playlist: ApiPlaylist =
                    self.get(&format!("{API_URL}/playlists/{id}")).await?;
                let tracks = self
                    .drain_pages(playlist.tracks, |item: PlaylistItem| {
                        item.track.map(CatalogTrack::from)
                    })
                    .await?;
                CatalogList {
                    title: playlist.name,
                    tracks,
                }
            }
            CatalogKind::Artist => {
                let artist: ApiArtist = self.get(&format!("{API_URL}/artists/{id}")).await?;
                let top: TopTracks = self
                    .get(&format!("{API_URL}/artists/{id}/top-tracks?market=US"))
                    .await?;
                CatalogList {
                    title: artist.name,
                    tracks: top.tracks.into_iter().map(CatalogTrack::from).collect(),
                }
            }
        };

        Ok(Some(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_open_spotify_urls() {
        assert_eq!(
            parse_catalog_url("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc"),
            Some((CatalogKind::Playlist, "37i9dQZF1DXcBWIGoYBM5M".to_string()))
        );
        assert_eq!(
            parse_catalog_url("https://open.spotify.com/intl-pt/album/4aawyAB9vmqN3uQ7FjRGTy"),
            Some((CatalogKind::Album, "4aawyAB9vmqN3uQ7FjRGTy".to_string()))
        );
    }

    #[test]
    fn test_parse_spotify_uris() {
        assert_eq!(
            parse_catalog_url("spotify:track:11dFghVXANMlKmJXsNCbNl"),
            Some((CatalogKind::Track, "11dFghVXANMlKmJXsNCbNl".to_string()))
        );
        assert_eq!(parse_catalog_url("spotify:show:abc"), None);
        assert_eq!(parse_catalog_url("https://example.com/track/1"), None);
    }

    #[test]
    fn test_playlist_page_skips_removed_tracks() {
        let json = r#"{"name":"Mix","tracks":{"items":[
            {"track":{"name":"A","artists":[{"name":"X"}],"duration_ms":1000}},
            {"track":null}],"next":null}}"#;
        let playlist: ApiPlaylist = serde_json::from_str(json).expect("json válido");

        let tracks: Vec<CatalogTrack> = playlist
            .tracks
            .items
            .into_iter()
            .filter_map(|item| item.track.map(CatalogTrack::from))
            .collect();

        assert_eq!(playlist.name, "Mix");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, vec!["X".to_string()]);
        assert_eq!(tracks[0].duration, Some(Duration::from_secs(1)));
    }
}
