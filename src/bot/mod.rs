//! # Bot Module
//!
//! Discord layer of Muse. It stays thin: slash commands are parsed here and
//! handed to the playback core in [`crate::audio`].
//!
//! This module contains:
//! - Command registration ([`commands`]) and dispatch ([`handlers`])
//! - The add-to-queue flow shared by `/play` ([`enqueue`])
//! - Event handling (ready, interactions, voice state updates)
//! - Background maintenance tasks
//!
//! ## Architecture
//!
//! The bot is built around the [`MuseBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It holds:
//!
//! - The per-guild sessions through [`SessionRegistry`]
//! - The resolve-then-enqueue service [`QueueService`]
//! - Metadata caching via [`MusicCache`]
//! - Per-guild settings with [`JsonStorage`]

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod enqueue;
pub mod handlers;

use crate::{
    audio::manager::SessionRegistry,
    cache::MusicCache,
    config::Config,
    sources::YouTubeClient,
    storage::JsonStorage,
    ui::messages::Locale,
};
use enqueue::QueueService;

/// Discord event handler for Muse.
///
/// ## Fields
///
/// - `config`: Bot configuration (tokens, limits, locale)
/// - `storage`: Per-guild settings persisted as JSON
/// - `registry`: One playback session per guild
/// - `queue_service`: Resolves queries and feeds them to sessions
///
/// All shared state lives behind [`Arc`]; storage uses a
/// [`tokio::sync::Mutex`] because its writes hit the filesystem.
pub struct MuseBot {
    config: Arc<Config>,
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    cache: Arc<MusicCache>,
    pub registry: Arc<SessionRegistry>,
    pub queue_service: Arc<QueueService>,
    youtube: Arc<YouTubeClient>,
    maintenance_started: AtomicBool,
}

impl MuseBot {
    /// Creates the handler from the already wired playback core.
    ///
    /// # Arguments
    ///
    /// * `config` - Bot configuration
    /// * `storage` - Per-guild settings storage
    /// * `cache` - Metadata cache shared with the yt-dlp client
    /// * `registry` - Session registry driving voice playback
    /// * `queue_service` - Add-to-queue service used by `/play`
    /// * `youtube` - yt-dlp client, kept for periodic self-updates
    pub fn new(
        config: Arc<Config>,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        cache: Arc<MusicCache>,
        registry: Arc<SessionRegistry>,
        queue_service: Arc<QueueService>,
        youtube: Arc<YouTubeClient>,
    ) -> Self {
        Self {
            config,
            storage,
            cache,
            registry,
            queue_service,
            youtube,
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    /// Registers slash commands with Discord.
    ///
    /// With `GUILD_ID` configured the commands are registered on that guild
    /// only (near-instant propagation); otherwise they are registered
    /// globally, which can take up to an hour to show up.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    /// The bot's own voice connection was dropped from outside (kicked,
    /// moved out, channel deleted).
    async fn on_bot_disconnected(&self, guild_id: GuildId) {
        let Some(session) = self.registry.find(guild_id) else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);
        session.release_voice().await;

        let view = session.now_playing().await;
        if view.current.is_none() && view.queue_len == 0 {
            if let Err(e) = self.registry.remove(guild_id) {
                debug!("Sesión de guild {} no removida: {}", guild_id, e);
            }
        }
    }
}

#[async_trait]
impl EventHandler for MuseBot {
    /// Called when the bot is connected to Discord; registers commands and
    /// starts the maintenance loop once.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        // `ready` se repite en cada reconexión del gateway
        if self.maintenance_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let cache = self.cache.clone();
        let youtube = self.youtube.clone();
        let registry = self.registry.clone();
        tokio::spawn(async move {
            maintenance_tasks(cache, youtube, registry).await;
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                self.on_bot_disconnected(guild_id).await;
            }
        }
    }
}

/// Runs periodic maintenance tasks in the background.
///
/// Every hour expired cache entries are dropped and yt-dlp updates itself.
/// Failures are logged and the loop keeps going.
async fn maintenance_tasks(
    cache: Arc<MusicCache>,
    youtube: Arc<YouTubeClient>,
    registry: Arc<SessionRegistry>,
) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600)); // Cada hora
    // El primer tick es inmediato
    interval.tick().await;

    loop {
        interval.tick().await;

        cache.cleanup_old_entries();

        if let Err(e) = youtube.update_ytdlp().await {
            warn!("Error actualizando yt-dlp: {:?}", e);
        }

        info!(
            "🧹 Tareas de mantenimiento completadas ({} sesiones activas)",
            registry.len()
        );
    }
}
