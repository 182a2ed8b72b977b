use futures::{stream, StreamExt};
use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serenity::model::id::{ChannelId, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    classify::{classify, route, QueryKind, Route},
    CatalogBackend, PlaylistRef, Song, SongMetadata, SourceKind, StreamProbe, VideoBackend,
};
use crate::{
    config::Config,
    error::{PlayerError, PlayerResult},
};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub playlist_limit: usize,
    pub split_chapters: bool,
    pub requested_by: UserId,
    pub added_in_channel: ChannelId,
}

/// Resultado de resolver una consulta; `songs` nunca está vacío.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub songs: Vec<Song>,
    /// Total de elementos del catálogo original
    pub catalog_total: Option<usize>,
    /// Tamaño de la muestra aleatoria cuando el catálogo superó el límite
    pub sampled: Option<usize>,
    /// Elementos del catálogo sin equivalente en la plataforma de video
    pub not_found: usize,
}

struct Resolved {
    items: Vec<SongMetadata>,
    catalog_total: Option<usize>,
    sampled: Option<usize>,
    not_found: usize,
}

impl Resolved {
    fn plain(items: Vec<SongMetadata>) -> Self {
        Self {
            items,
            catalog_total: None,
            sampled: None,
            not_found: 0,
        }
    }
}

/// Clasifica consultas y las despacha al backend correspondiente
pub struct SongResolver {
    video: Arc<dyn VideoBackend>,
    catalog: Option<Arc<dyn CatalogBackend>>,
    streams: Arc<dyn StreamProbe>,
    video_hosts: Vec<String>,
    search_concurrency: usize,
    rng: Mutex<StdRng>,
}

impl SongResolver {
    pub fn new(
        video: Arc<dyn VideoBackend>,
        catalog: Option<Arc<dyn CatalogBackend>>,
        streams: Arc<dyn StreamProbe>,
        config: &Config,
    ) -> Self {
        Self {
            video,
            catalog,
            streams,
            video_hosts: config.video_hosts.clone(),
            search_concurrency: config.search_concurrency.max(1),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reemplaza la fuente aleatoria usada para muestrear catálogos
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Resuelve una consulta en una o más canciones.
    ///
    /// Falla con `NotFound` si nada es reproducible y con `UnsupportedSource`
    /// si la consulta es una URL que ningún backend reclama.
    pub async fn resolve(&self, query: &str, options: &ResolveOptions) -> PlayerResult<Resolution> {
        let resolved = match classify(query) {
            QueryKind::Unparseable => self.resolve_search(query, options).await?,
            QueryKind::DirectUrl(url) => match route(&url, &self.video_hosts) {
                Route::VideoPlaylist(list_id) => self.resolve_playlist(&list_id, options).await?,
                Route::Video(url) => self.resolve_video(&url, options).await?,
                Route::Catalog(url) => self.resolve_catalog(&url, options).await?,
                Route::Stream(url) => self.resolve_stream(&url).await?,
                Route::Unsupported(scheme) => {
                    warn!("🚫 URL con esquema no soportado: {}", scheme);
                    return Err(PlayerError::UnsupportedSource(scheme));
                }
            },
        };

        if resolved.items.is_empty() {
            return Err(PlayerError::NotFound);
        }

        let songs: Vec<Song> = resolved
            .items
            .into_iter()
            .map(|item| item.stamp(options.requested_by, options.added_in_channel))
            .collect();

        info!("🎯 '{}' resuelto en {} canciones", query, songs.len());

        Ok(Resolution {
            songs,
            catalog_total: resolved.catalog_total,
            sampled: resolved.sampled,
            not_found: resolved.not_found,
        })
    }

    async fn resolve_video(&self, url: &str, options: &ResolveOptions) -> PlayerResult<Resolved> {
        let info = self.video.video(url).await?.ok_or(PlayerError::NotFound)?;

        Ok(Resolved::plain(info.into_songs(
            SourceKind::Video,
            None,
            options.split_chapters,
        )))
    }

    async fn resolve_playlist(
        &self,
        list_id: &str,
        options: &ResolveOptions,
    ) -> PlayerResult<Resolved> {
        let playlist = self
            .video
            .playlist(list_id)
            .await?
            .ok_or(PlayerError::NotFound)?;

        info!("📋 Playlist '{}' con {} videos", playlist.title, playlist.items.len());

        let reference = PlaylistRef {
            title: playlist.title,
            source: playlist.url,
        };

        let items = playlist
            .items
            .into_iter()
            .flat_map(|info| {
                info.into_songs(
                    SourceKind::PlaylistItem,
                    Some(reference.clone()),
                    options.split_chapters,
                )
            })
            .collect();

        Ok(Resolved::plain(items))
    }

    /// Resuelve un catálogo cruzando cada elemento con la plataforma de video.
    ///
    /// Cuando el catálogo supera `playlist_limit`, los elementos se recorren en
    /// una permutación uniforme y los que no se encuentran se reemplazan con
    /// los siguientes de la permutación, hasta completar el límite, agotar la
    /// lista o acumular `playlist_limit` no encontrados.
    async fn resolve_catalog(&self, url: &str, options: &ResolveOptions) -> PlayerResult<Resolved> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| PlayerError::UnsupportedSource("spotify".to_string()))?;

        let list = catalog
            .tracks(url)
            .await?
            .ok_or_else(|| PlayerError::UnsupportedSource("spotify".to_string()))?;
        let total = list.tracks.len();
        let limit = options.playlist_limit.max(1);

        if total == 0 {
            return Err(PlayerError::NotFound);
        }

        let mut order: Vec<usize> = (0..total).collect();
        if total > limit {
            let mut rng = self.rng.lock();
            order.shuffle(&mut *rng);
        }

        let mut pending = order.into_iter();
        let mut matched: Vec<(usize, SongMetadata)> = Vec::with_capacity(limit.min(total));
        let mut not_found = 0usize;

        loop {
            let wanted = limit
                .saturating_sub(matched.len())
                .min(limit.saturating_sub(not_found));
            let batch: Vec<usize> = pending.by_ref().take(wanted).collect();

            if batch.is_empty() {
                break;
            }

            debug!("🔎 Cruzando {} elementos del catálogo", batch.len());

            let results: Vec<_> = stream::iter(batch)
                .map(|index| {
                    let phrase = list.tracks[index].search_phrase();
                    let video = Arc::clone(&self.video);
                    async move { (index, video.search(&phrase).await) }
                })
                .buffered(self.search_concurrency)
                .collect()
                .await;

            for (index, result) in results {
                let track = &list.tracks[index];
                match result {
                    Ok(Some(info)) => {
                        let artist = if track.artists.is_empty() {
                            info.artist.clone()
                        } else {
                            Some(track.artists.join(", "))
                        };
                        matched.push((
                            index,
                            SongMetadata {
                                kind: SourceKind::PlaylistItem,
                                url: info.url,
                                title: track.name.clone(),
                                artist,
                                duration: info.duration.or(track.duration),
                                thumbnail: info.thumbnail,
                                playlist: Some(PlaylistRef {
                                    title: list.title.clone(),
                                    source: url.to_string(),
                                }),
                                chapter: None,
                            },
                        ));
                    }
                    Ok(None) => {
                        debug!("❓ Sin equivalente para '{}'", track.name);
                        not_found += 1;
                    }
                    Err(e) => {
                        warn!("⚠️ Error buscando '{}': {:?}", track.name, e);
                        not_found += 1;
                    }
                }
            }
        }

        matched.sort_by_key(|(index, _)| *index);

        let sampled = (total > limit).then_some(limit);
        info!(
            "🎼 Catálogo '{}': {} de {} canciones, {} no encontradas",
            list.title,
            matched.len(),
            total,
            not_found
        );

        Ok(Resolved {
            items: matched.into_iter().map(|(_, song)| song).collect(),
            catalog_total: Some(total),
            sampled,
            not_found,
        })
    }

    async fn resolve_stream(&self, url: &str) -> PlayerResult<Resolved> {
        let song = self.streams.probe(url).await?.ok_or(PlayerError::NotFound)?;
        Ok(Resolved::plain(vec![song]))
    }

    async fn resolve_search(&self, query: &str, options: &ResolveOptions) -> PlayerResult<Resolved> {
        let info = self
            .video
            .search(query.trim())
            .await?
            .ok_or(PlayerError::NotFound)?;

        Ok(Resolved::plain(info.into_songs(
            SourceKind::SearchResult,
            None,
            options.split_chapters,
        )))
    }
}
