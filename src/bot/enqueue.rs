use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{
        manager::SessionRegistry,
        player::{AddOptions, NowPlaying, PlayerStatus},
    },
    config::Config,
    error::{PlayerError, PlayerResult},
    sources::{Resolution, ResolveOptions, SongResolver},
    ui::messages::{added_message, AddedSummary, Locale},
};

/// Qué hacer cuando se agregan canciones a una sesión conectada pero inactiva
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// Arrancar la reproducción automáticamente
    ResumeWhenIdle,
    /// Solo encolar; la reproducción espera un `play` explícito
    Manual,
}

impl ResumePolicy {
    pub fn from_config(config: &Config) -> Self {
        if config.auto_resume_on_add {
            ResumePolicy::ResumeWhenIdle
        } else {
            ResumePolicy::Manual
        }
    }
}

/// Pedido de agregar una consulta a la cola de una guild
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub query: String,
    pub add_to_front: bool,
    pub shuffle_additions: bool,
    pub split_chapters: bool,
    pub guild_id: GuildId,
    pub requested_by: UserId,
    pub origin_channel: ChannelId,
    /// Canal de voz al que unirse si la sesión no tiene conexión
    pub target_voice_channel: Option<ChannelId>,
    pub playlist_limit: usize,
}

#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub message: String,
    /// Presente cuando este pedido inició la conexión de voz
    pub now_playing: Option<NowPlaying>,
}

/// Resuelve consultas fuera del lock de la sesión y luego las encola
pub struct QueueService {
    resolver: Arc<SongResolver>,
    registry: Arc<SessionRegistry>,
    policy: ResumePolicy,
    locale: Locale,
    rng: Mutex<StdRng>,
}

impl QueueService {
    pub fn new(
        resolver: Arc<SongResolver>,
        registry: Arc<SessionRegistry>,
        policy: ResumePolicy,
        locale: Locale,
    ) -> Self {
        Self {
            resolver,
            registry,
            policy,
            locale,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Resuelve `request.query` y la encola en la sesión de la guild.
    ///
    /// La época de la sesión se captura antes de resolver; encolar, conectar
    /// y reproducir fallan con `Stale` si en el medio hubo un `stop()` o la
    /// sesión salió del registro.
    pub async fn add_query(&self, request: AddRequest) -> PlayerResult<AddOutcome> {
        let session = self.registry.get(request.guild_id);
        let epoch = session.epoch().await;
        let before = session.now_playing().await;
        let was_playing = before.current.is_some() || before.interrupted;

        let options = ResolveOptions {
            playlist_limit: request.playlist_limit,
            split_chapters: request.split_chapters,
            requested_by: request.requested_by,
            added_in_channel: request.origin_channel,
        };

        // La resolución ocurre sin tocar la sesión
        let Resolution {
            mut songs,
            catalog_total,
            sampled,
            not_found,
        } = self.resolver.resolve(&request.query, &options).await?;

        if let Some(total) = catalog_total {
            debug!("📚 Catálogo con {} elementos, {} resueltos", total, songs.len());
        }

        if request.shuffle_additions {
            songs.shuffle(&mut *self.rng.lock());
        }

        let first_title = songs
            .first()
            .map(|song| song.title().to_string())
            .ok_or(PlayerError::NotFound)?;

        let added = session
            .add_guarded(
                songs,
                AddOptions {
                    immediate: request.add_to_front,
                },
                epoch,
            )
            .await?;

        let mut resuming = false;
        let mut now_playing = None;

        if !session.has_handle().await {
            let channel = request
                .target_voice_channel
                .ok_or_else(|| PlayerError::Connection("no hay canal de voz destino".to_string()))?;

            session.connect_guarded(channel, epoch).await?;
            session.play_guarded(epoch).await?;

            resuming = was_playing;
            now_playing = Some(session.now_playing().await);
        } else if session.status().await == PlayerStatus::Idle
            && self.policy == ResumePolicy::ResumeWhenIdle
        {
            debug!("▶️ Sesión inactiva con conexión, iniciando reproducción");
            session.play_guarded(epoch).await?;
        }

        info!(
            "📥 Guild {}: {} canciones agregadas por {}",
            request.guild_id, added, request.requested_by
        );

        let message = added_message(
            self.locale,
            &AddedSummary {
                first_title: &first_title,
                extra: added.saturating_sub(1),
                to_front: request.add_to_front,
                sampled,
                not_found,
                resuming,
            },
        );

        Ok(AddOutcome {
            message,
            now_playing,
        })
    }
}
