//! # Sources Module
//!
//! Song metadata model and resolution of user queries into playable songs.
//!
//! - [`classify`] decides whether a query is a URL and which route it takes
//! - [`resolver`] runs the decision tree and catalog sampling
//! - [`youtube`], [`spotify`] and [`direct_url`] are the collaborator
//!   backends that talk to yt-dlp, the Spotify Web API and plain HTTP hosts
//!
//! Backends return metadata without requester information; the resolver
//! stamps every entry into a [`Song`] before handing it to a session.

pub mod classify;
pub mod direct_url;
pub mod resolver;
pub mod spotify;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, UserId};
use std::time::Duration;

pub use direct_url::HttpStreamProbe;
pub use resolver::{Resolution, ResolveOptions, SongResolver};
pub use spotify::SpotifyClient;
pub use youtube::YouTubeClient;

/// Plataforma de origen de una canción
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Video único resuelto por URL
    Video,
    /// Elemento de una playlist (de YouTube o de catálogo)
    PlaylistItem,
    /// Primer resultado de una búsqueda de texto libre
    SearchResult,
    /// Stream HTTP genérico
    DirectStream,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Video => "youtube",
            SourceKind::PlaylistItem => "playlist",
            SourceKind::SearchResult => "search",
            SourceKind::DirectStream => "stream",
        }
    }

    /// Las fuentes de video se reproducen a través de yt-dlp.
    pub fn is_video_platform(&self) -> bool {
        !matches!(self, SourceKind::DirectStream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub title: String,
    pub source: String,
}

/// Sub-rango de una fuente más larga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub offset: Duration,
    pub length: Duration,
}

/// Metadata de una canción tal como la devuelve un backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SongMetadata {
    pub kind: SourceKind,
    pub url: String,
    pub title: String,
    pub artist: Option<String>,
    /// `None` solo para streams en vivo
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub playlist: Option<PlaylistRef>,
    pub chapter: Option<ChapterRange>,
}

impl SongMetadata {
    pub fn stamp(self, requested_by: UserId, added_in_channel: ChannelId) -> Song {
        Song {
            metadata: self,
            requested_by,
            added_in_channel,
            added_at: Utc::now(),
        }
    }
}

/// Canción lista para la cola; inmutable una vez resuelta.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub metadata: SongMetadata,
    pub requested_by: UserId,
    pub added_in_channel: ChannelId,
    pub added_at: DateTime<Utc>,
}

impl Song {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn url(&self) -> &str {
        &self.metadata.url
    }

    pub fn kind(&self) -> SourceKind {
        self.metadata.kind
    }

    /// Duración efectiva: la del capítulo cuando la canción es un sub-rango.
    pub fn duration(&self) -> Option<Duration> {
        match self.metadata.chapter {
            Some(chapter) => Some(chapter.length),
            None => self.metadata.duration,
        }
    }

    pub fn is_live(&self) -> bool {
        self.metadata.duration.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMark {
    pub title: String,
    pub start: Duration,
    pub end: Duration,
}

/// Registro de video devuelto por el backend de la plataforma de video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    pub artist: Option<String>,
    pub url: String,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub chapters: Vec<ChapterMark>,
}

impl VideoInfo {
    /// Convierte el video en una o más canciones.
    ///
    /// Con `split_chapters` y al menos dos capítulos, cada capítulo es una
    /// canción: el título del capítulo pasa a ser el título y el del video
    /// ocupa el lugar del artista.
    pub fn into_songs(
        self,
        kind: SourceKind,
        playlist: Option<PlaylistRef>,
        split_chapters: bool,
    ) -> Vec<SongMetadata> {
        if split_chapters && self.chapters.len() >= 2 {
            return self
                .chapters
                .iter()
                .filter(|chapter| chapter.end > chapter.start)
                .map(|chapter| SongMetadata {
                    kind,
                    url: self.url.clone(),
                    title: chapter.title.clone(),
                    artist: Some(self.title.clone()),
                    duration: self.duration,
                    thumbnail: self.thumbnail.clone(),
                    playlist: playlist.clone(),
                    chapter: Some(ChapterRange {
                        offset: chapter.start,
                        length: chapter.end - chapter.start,
                    }),
                })
                .collect();
        }

        vec![SongMetadata {
            kind,
            url: self.url,
            title: self.title,
            artist: self.artist,
            duration: self.duration,
            thumbnail: self.thumbnail,
            playlist,
            chapter: None,
        }]
    }
}

/// Playlist de la plataforma de video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPlaylist {
    pub title: String,
    pub url: String,
    pub items: Vec<VideoInfo>,
}

/// Elemento de un catálogo externo que debe cruzarse con la plataforma de video.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTrack {
    pub name: String,
    pub artists: Vec<String>,
    pub duration: Option<Duration>,
}

impl CatalogTrack {
    pub fn search_phrase(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} {}", self.name, artist),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogList {
    pub title: String,
    pub tracks: Vec<CatalogTrack>,
}

/// Backend de la plataforma de video (video, playlist y búsqueda)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// `Ok(None)` si el video no existe
    async fn video(&self, url: &str) -> Result<Option<VideoInfo>>;

    async fn playlist(&self, list_id: &str) -> Result<Option<VideoPlaylist>>;

    /// Mejor resultado para un texto libre
    async fn search(&self, query: &str) -> Result<Option<VideoInfo>>;
}

/// Backend de catálogo (álbumes, playlists y tracks de Spotify)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// `Ok(None)` si la URL es del catálogo pero de un tipo no soportado
    async fn tracks(&self, url: &str) -> Result<Option<CatalogList>>;
}

/// Sondeo de streams HTTP genéricos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Option<SongMetadata>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn video(title: &str) -> VideoInfo {
        VideoInfo {
            title: title.to_string(),
            artist: Some("Canal".to_string()),
            url: format!("https://www.youtube.com/watch?v={}", title.replace(' ', "_")),
            duration: Some(Duration::from_secs(200)),
            thumbnail: None,
            chapters: Vec::new(),
        }
    }

    pub fn song(title: &str) -> Song {
        video(title)
            .into_songs(SourceKind::Video, None, false)
            .remove(0)
            .stamp(UserId::new(1), ChannelId::new(2))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::video;
    use super::*;
    use pretty_assertions::assert_eq;

    fn chapter(title: &str, start: u64, end: u64) -> ChapterMark {
        ChapterMark {
            title: title.to_string(),
            start: Duration::from_secs(start),
            end: Duration::from_secs(end),
        }
    }

    #[test]
    fn test_split_chapters_creates_sub_songs() {
        let mut info = video("Album completo");
        info.duration = Some(Duration::from_secs(600));
        info.chapters = vec![chapter("Intro", 0, 120), chapter("Faixa 2", 120, 600)];

        let songs = info.into_songs(SourceKind::Video, None, true);

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].title, "Faixa 2");
        assert_eq!(songs[1].artist.as_deref(), Some("Album completo"));
        assert_eq!(
            songs[1].chapter,
            Some(ChapterRange {
                offset: Duration::from_secs(120),
                length: Duration::from_secs(480),
            })
        );
    }

    #[test]
    fn test_chapters_ignored_without_flag() {
        let mut info = video("Album completo");
        info.chapters = vec![chapter("Intro", 0, 120), chapter("Faixa 2", 120, 600)];

        let songs = info.into_songs(SourceKind::Video, None, false);
        assert_eq!(songs.len(), 1);
        assert!(songs[0].chapter.is_none());
    }

    #[test]
    fn test_song_duration_uses_chapter_length() {
        let mut info = video("Album");
        info.chapters = vec![chapter("A", 0, 30), chapter("B", 30, 90)];
        let song = info
            .into_songs(SourceKind::Video, None, true)
            .remove(1)
            .stamp(UserId::new(1), ChannelId::new(2));

        assert_eq!(song.duration(), Some(Duration::from_secs(60)));
        assert!(!song.is_live());
    }

    #[test]
    fn test_catalog_search_phrase() {
        let track = CatalogTrack {
            name: "Garota de Ipanema".to_string(),
            artists: vec!["Tom Jobim".to_string(), "Vinicius".to_string()],
            duration: None,
        };
        assert_eq!(track.search_phrase(), "Garota de Ipanema Tom Jobim");
    }
}
