use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

mod audio;
mod bot;
mod cache;
mod config;
mod error;
mod sources;
mod storage;
mod ui;

use crate::audio::{manager::SessionRegistry, voice::SongbirdTransport};
use crate::bot::{
    enqueue::{QueueService, ResumePolicy},
    MuseBot,
};
use crate::cache::{lru_cache::LRUCache, MusicCache};
use crate::config::Config;
use crate::sources::{CatalogBackend, HttpStreamProbe, SongResolver, SpotifyClient, YouTubeClient};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("muse_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Muse v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    // Ajustes por servidor
    let storage = Arc::new(tokio::sync::Mutex::new(
        JsonStorage::new(config.data_dir.clone(), config.default_playlist_limit).await?,
    ));

    // Caché de metadatos
    let cache: Arc<MusicCache> = Arc::new(LRUCache::new(
        config.cache_size,
        Some(Duration::from_secs(config.cache_ttl_secs)),
    ));

    // Backends de resolución
    let youtube = Arc::new(YouTubeClient::new(config.ytdlp_path.clone(), cache.clone()));

    let catalog: Option<Arc<dyn CatalogBackend>> = match config.spotify_credentials() {
        Some((client_id, client_secret)) => {
            info!("🟢 Spotify habilitado");
            Some(Arc::new(SpotifyClient::new(client_id, client_secret)?))
        }
        None => {
            warn!("⚠️ Sin credenciales de Spotify, los enlaces de Spotify no se resolverán");
            None
        }
    };

    let resolver = Arc::new(SongResolver::new(
        youtube.clone(),
        catalog,
        Arc::new(HttpStreamProbe::new()?),
        &config,
    ));

    // Núcleo de reproducción sobre songbird
    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(songbird.clone(), reqwest::Client::new()));
    let registry = Arc::new(SessionRegistry::new(transport, config.max_queue_size));

    let queue_service = Arc::new(QueueService::new(
        resolver,
        registry.clone(),
        ResumePolicy::from_config(&config),
        config.locale,
    ));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let config = Arc::new(config);
    let handler = MuseBot::new(
        config.clone(),
        storage,
        cache,
        registry,
        queue_service,
        youtube,
    );

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
