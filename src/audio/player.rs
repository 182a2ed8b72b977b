use futures::future::BoxFuture;
use rand::{rngs::StdRng, SeedableRng};
use serenity::model::id::{ChannelId, GuildId};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        queue::Queue,
        voice::{StreamControl, StreamEvent, VoiceHandle, VoiceTransport},
    },
    error::{PlayerError, PlayerResult},
    sources::Song,
};

/// Canciones de la cola incluidas en la vista "reproduciendo ahora"
const QUEUE_PREVIEW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerStatus::Idle => "idle",
            PlayerStatus::Playing => "playing",
            PlayerStatus::Paused => "paused",
            PlayerStatus::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Insertar al frente de la cola
    pub immediate: bool,
}

/// Vista de solo lectura del estado de una sesión
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub current: Option<Song>,
    pub status: PlayerStatus,
    pub queued: Vec<Song>,
    pub queue_len: usize,
    pub queue_duration: Duration,
    /// La conexión se perdió con una canción sonando
    pub interrupted: bool,
}

struct SessionState {
    queue: Queue,
    current: Option<Song>,
    status: PlayerStatus,
    handle: Option<VoiceHandle>,
    control: Option<Box<dyn StreamControl>>,
    /// Sube en cada `stop()`; invalida resoluciones en vuelo
    epoch: u64,
    /// Sube en cada cambio de pista; invalida eventos de streams viejos
    generation: u64,
    interrupted: bool,
    /// Sacada del registro; toda operación posterior es `Stale`
    retired: bool,
    rng: StdRng,
}

/// Sesión de reproducción de una guild.
///
/// Todas las transiciones se serializan con el mutex de estado. El lock solo
/// se mantiene durante transiciones discretas (join, inicio de stream); la
/// reproducción en curso se observa desde una tarea aparte que reenvía los
/// eventos del stream a [`PlaybackSession::on_stream_end`].
pub struct PlaybackSession {
    guild_id: GuildId,
    transport: Arc<dyn VoiceTransport>,
    state: Mutex<SessionState>,
}

impl PlaybackSession {
    pub fn new(guild_id: GuildId, transport: Arc<dyn VoiceTransport>, max_queue_size: usize) -> Arc<Self> {
        Self::with_rng(guild_id, transport, max_queue_size, StdRng::from_entropy())
    }

    pub fn with_rng(
        guild_id: GuildId,
        transport: Arc<dyn VoiceTransport>,
        max_queue_size: usize,
        rng: StdRng,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            transport,
            state: Mutex::new(SessionState {
                queue: Queue::new(max_queue_size),
                current: None,
                status: PlayerStatus::Idle,
                handle: None,
                control: None,
                epoch: 0,
                generation: 0,
                interrupted: false,
                retired: false,
                rng,
            }),
        })
    }

    pub async fn status(&self) -> PlayerStatus {
        self.state.lock().await.status
    }

    pub async fn has_handle(&self) -> bool {
        self.state.lock().await.handle.is_some()
    }

    pub async fn epoch(&self) -> u64 {
        self.state.lock().await.epoch
    }

    /// Retira la sesión si no tiene conexión ni ninguna operación en curso.
    ///
    /// Sube la época, así que las resoluciones en vuelo que la capturaron
    /// antes terminan en `Stale`.
    pub fn try_retire(&self) -> bool {
        match self.state.try_lock() {
            Ok(mut state) if state.handle.is_none() => {
                state.retired = true;
                state.epoch += 1;
                true
            }
            _ => false,
        }
    }

    fn ensure_current(&self, state: &SessionState, epoch: Option<u64>) -> PlayerResult<()> {
        if state.retired || epoch.is_some_and(|epoch| epoch != state.epoch) {
            debug!("🕰️ Operación descartada en guild {}: la sesión fue detenida", self.guild_id);
            return Err(PlayerError::Stale);
        }
        Ok(())
    }

    /// Encola canciones. Nunca inicia la reproducción por sí solo.
    pub async fn add(&self, songs: Vec<Song>, options: AddOptions) -> PlayerResult<usize> {
        let mut state = self.state.lock().await;
        self.ensure_current(&state, None)?;
        Self::insert(&mut state, songs, options)
    }

    /// Como [`add`](Self::add), pero falla con `Stale` si hubo un `stop()`
    /// desde que se capturó `epoch`.
    pub async fn add_guarded(
        &self,
        songs: Vec<Song>,
        options: AddOptions,
        epoch: u64,
    ) -> PlayerResult<usize> {
        let mut state = self.state.lock().await;
        self.ensure_current(&state, Some(epoch))?;
        Self::insert(&mut state, songs, options)
    }

    fn insert(state: &mut SessionState, mut songs: Vec<Song>, options: AddOptions) -> PlayerResult<usize> {
        if songs.is_empty() {
            return Ok(0);
        }

        let capacity = state.queue.remaining_capacity();
        if capacity == 0 {
            return Err(PlayerError::InvalidState {
                action: "adicionar músicas",
                status: state.status,
            });
        }

        if songs.len() > capacity {
            warn!("⚠️ Cola casi llena: se agregan {} de {}", capacity, songs.len());
            songs.truncate(capacity);
        }

        let added = songs.len();
        if options.immediate {
            state.queue.prepend_all(songs);
        } else {
            state.queue.extend(songs);
        }

        info!("➕ {} canciones agregadas (total en cola: {})", added, state.queue.len());
        Ok(added)
    }

    /// Se une al canal si todavía no hay conexión
    pub async fn connect(&self, channel_id: ChannelId) -> PlayerResult<()> {
        self.connect_at(channel_id, None).await
    }

    /// Como [`connect`](Self::connect), pero falla con `Stale` si hubo un
    /// `stop()` desde que se capturó `epoch`.
    pub async fn connect_guarded(&self, channel_id: ChannelId, epoch: u64) -> PlayerResult<()> {
        self.connect_at(channel_id, Some(epoch)).await
    }

    async fn connect_at(&self, channel_id: ChannelId, epoch: Option<u64>) -> PlayerResult<()> {
        let mut state = self.state.lock().await;
        self.ensure_current(&state, epoch)?;
        if state.handle.is_some() {
            return Ok(());
        }

        let handle = self.transport.join(self.guild_id, channel_id).await?;
        state.handle = Some(handle);
        if state.status == PlayerStatus::Stopped {
            state.status = PlayerStatus::Idle;
        }

        info!("🔊 Sesión de guild {} conectada al canal {}", self.guild_id, channel_id);
        Ok(())
    }

    /// Reanuda si está en pausa o arranca la siguiente canción si está inactiva
    pub async fn play(self: &Arc<Self>) -> PlayerResult<()> {
        self.play_at(None).await
    }

    pub async fn play_guarded(self: &Arc<Self>, epoch: u64) -> PlayerResult<()> {
        self.play_at(Some(epoch)).await
    }

    async fn play_at(self: &Arc<Self>, epoch: Option<u64>) -> PlayerResult<()> {
        let mut state = self.state.lock().await;
        self.ensure_current(&state, epoch)?;

        match state.status {
            PlayerStatus::Playing => Ok(()),
            PlayerStatus::Paused => {
                if let Some(control) = &state.control {
                    control.resume()?;
                }
                state.status = PlayerStatus::Playing;
                info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
                Ok(())
            }
            PlayerStatus::Idle | PlayerStatus::Stopped => self.start_next(&mut state).await,
        }
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        let mut state = self.state.lock().await;

        if state.status != PlayerStatus::Playing {
            return Err(PlayerError::InvalidState {
                action: "pausar",
                status: state.status,
            });
        }

        if let Some(control) = &state.control {
            control.pause()?;
        }
        state.status = PlayerStatus::Paused;
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(())
    }

    /// Descarta la canción actual y arranca la siguiente
    pub async fn skip(self: &Arc<Self>) -> PlayerResult<Option<Song>> {
        let mut state = self.state.lock().await;

        if state.handle.is_none() {
            return Err(PlayerError::Connection("sin conexión de voz".to_string()));
        }

        let skipped = Self::discard_current(&mut state);
        if let Some(song) = &skipped {
            info!("⏭️ Saltando: {}", song.title());
        }

        self.start_next(&mut state).await?;
        Ok(skipped)
    }

    /// Descarta todo y libera la conexión de voz
    pub async fn stop(&self) -> PlayerResult<()> {
        let mut state = self.state.lock().await;

        Self::discard_current(&mut state);
        state.queue.clear();
        state.epoch += 1;

        if let Some(handle) = state.handle.take() {
            self.transport.leave(handle).await;
        }

        state.status = PlayerStatus::Stopped;
        state.interrupted = false;
        info!("⏹️ Sesión de guild {} detenida", self.guild_id);
        Ok(())
    }

    /// La conexión de voz se cayó desde afuera.
    ///
    /// La canción actual vuelve al frente de la cola para retomarla en la
    /// próxima conexión; la cola se conserva.
    pub async fn release_voice(&self) {
        let mut state = self.state.lock().await;
        if state.handle.take().is_none() {
            return;
        }

        if let Some(song) = Self::discard_current(&mut state) {
            state.queue.prepend(song);
            state.interrupted = true;
        }
        state.status = PlayerStatus::Idle;
        warn!("🔌 Guild {} perdió la conexión de voz", self.guild_id);
    }

    /// Vacía la cola; la canción actual sigue sonando
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let removed = state.queue.len();
        state.queue.clear();
        removed
    }

    pub async fn shuffle(&self) -> usize {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.queue.shuffle_remaining(&mut state.rng);
        state.queue.len()
    }

    pub async fn now_playing(&self) -> NowPlaying {
        let state = self.state.lock().await;
        NowPlaying {
            current: state.current.clone(),
            status: state.status,
            queued: state.queue.iter().take(QUEUE_PREVIEW).cloned().collect(),
            queue_len: state.queue.len(),
            queue_duration: state.queue.total_duration(),
            interrupted: state.interrupted,
        }
    }

    /// Detiene el stream actual e invalida sus eventos pendientes
    fn discard_current(state: &mut SessionState) -> Option<Song> {
        if let Some(control) = state.control.take() {
            if let Err(e) = control.stop() {
                debug!("Stream ya detenido: {}", e);
            }
        }
        state.generation += 1;
        state.current.take()
    }

    /// Saca canciones de la cola hasta que una arranque.
    ///
    /// Los fallos al abrir un stream se saltan; un fallo de conexión devuelve
    /// la canción al frente de la cola y abandona la llamada.
    async fn start_next(self: &Arc<Self>, state: &mut SessionState) -> PlayerResult<()> {
        let Some(handle) = state.handle else {
            return Err(PlayerError::Connection("sin conexión de voz".to_string()));
        };

        while let Some(song) = state.queue.pop_next() {
            match self.transport.play_stream(&handle, &song).await {
                Ok(started) => {
                    state.generation += 1;
                    let generation = state.generation;

                    info!("🎵 Guild {} reproduciendo: {}", self.guild_id, song.title());
                    state.current = Some(song);
                    state.control = Some(started.control);
                    state.status = PlayerStatus::Playing;
                    state.interrupted = false;

                    self.watch(generation, started.events);
                    return Ok(());
                }
                Err(PlayerError::Connection(reason)) => {
                    warn!("🔌 Conexión perdida en guild {}: {}", self.guild_id, reason);
                    state.queue.prepend(song);
                    state.handle = None;
                    self.transport.leave(handle).await;
                    state.current = None;
                    state.control = None;
                    state.status = PlayerStatus::Idle;
                    state.interrupted = true;
                    return Err(PlayerError::Connection(reason));
                }
                Err(e) => {
                    warn!("⚠️ No se pudo reproducir {}: {}. Pasando a la siguiente", song.title(), e);
                }
            }
        }

        state.current = None;
        state.control = None;
        state.status = PlayerStatus::Idle;
        info!("📭 Cola vacía en guild {}", self.guild_id);
        Ok(())
    }

    fn watch(self: &Arc<Self>, generation: u64, mut events: mpsc::UnboundedReceiver<StreamEvent>) {
        let session = Arc::downgrade(self);

        tokio::spawn(async move {
            let event = events
                .recv()
                .await
                .unwrap_or_else(|| StreamEvent::Failed("canal de eventos cerrado".to_string()));

            if let Some(session) = session.upgrade() {
                session.on_stream_end(generation, event).await;
            }
        });
    }

    /// Avance automático al terminar (o fallar) el stream de `generation`
    fn on_stream_end(self: Arc<Self>, generation: u64, event: StreamEvent) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;

            if state.generation != generation {
                debug!("🕰️ Evento de stream viejo ignorado en guild {}", self.guild_id);
                return;
            }

            match &event {
                StreamEvent::Finished => debug!("✅ Canción terminada en guild {}", self.guild_id),
                StreamEvent::Failed(reason) => {
                    warn!("⚠️ Falló el stream en guild {}: {}", self.guild_id, reason)
                }
            }

            state.current = None;
            state.control = None;

            if let Err(e) = self.start_next(&mut state).await {
                warn!("⚠️ No se pudo continuar la reproducción: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::voice::testing::{Call, FakeTransport},
        sources::test_support::song,
    };
    use pretty_assertions::assert_eq;

    fn channel() -> ChannelId {
        ChannelId::new(10)
    }

    fn session(transport: &Arc<FakeTransport>) -> Arc<PlaybackSession> {
        PlaybackSession::with_rng(
            GuildId::new(1),
            transport.clone(),
            100,
            StdRng::seed_from_u64(3),
        )
    }

    fn songs(titles: &[&str]) -> Vec<Song> {
        titles.iter().map(|title| song(title)).collect()
    }

    async fn current_title(session: &PlaybackSession) -> Option<String> {
        session
            .now_playing()
            .await
            .current
            .map(|song| song.title().to_string())
    }

    /// Deja correr a las tareas que observan los streams
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_add_then_play_starts_first_song() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        assert_eq!(session.status().await, PlayerStatus::Idle);

        session.play().await.unwrap();

        assert_eq!(session.status().await, PlayerStatus::Playing);
        assert_eq!(current_title(&session).await.as_deref(), Some("a"));
        assert_eq!(session.now_playing().await.queue_len, 1);
        assert_eq!(transport.played(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_immediate_add_is_played_first() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        session
            .add(songs(&["x"]), AddOptions { immediate: true })
            .await
            .unwrap();
        session.play().await.unwrap();

        assert_eq!(current_title(&session).await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        let first = {
            let session = session.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    session
                        .add(songs(&[format!("a{i}").as_str()]), AddOptions::default())
                        .await
                        .unwrap();
                }
            })
        };
        let second = {
            let session = session.clone();
            tokio::spawn(async move {
                let batch: Vec<String> = (0..25).map(|i| format!("b{i}")).collect();
                let titles: Vec<&str> = batch.iter().map(String::as_str).collect();
                session.add(songs(&titles), AddOptions::default()).await.unwrap();
            })
        };

        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(session.now_playing().await.queue_len, 50);
    }

    #[tokio::test]
    async fn test_auto_advance_until_idle() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();

        transport.emit("a", StreamEvent::Finished);
        settle().await;
        assert_eq!(current_title(&session).await.as_deref(), Some("b"));

        transport.emit("b", StreamEvent::Finished);
        settle().await;
        assert_eq!(session.status().await, PlayerStatus::Idle);
        assert_eq!(current_title(&session).await, None);
        assert!(session.has_handle().await);
    }

    #[tokio::test]
    async fn test_stream_failures_advance_to_next_song() {
        let transport = FakeTransport::new();
        transport.broken.lock().insert("b".to_string());
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b", "c"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();

        transport.emit("a", StreamEvent::Failed("decode error".to_string()));
        settle().await;

        assert_eq!(current_title(&session).await.as_deref(), Some("c"));
        assert_eq!(session.status().await, PlayerStatus::Playing);
        assert_eq!(transport.played(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_stale_completion_after_skip_is_ignored() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b", "c"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();

        let skipped = session.skip().await.unwrap();
        assert_eq!(skipped.map(|s| s.title().to_string()).as_deref(), Some("a"));

        transport.emit("a", StreamEvent::Finished);
        settle().await;

        assert_eq!(current_title(&session).await.as_deref(), Some("b"));
        assert_eq!(transport.played(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stop_releases_handle_and_ignores_late_events() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();
        session.stop().await.unwrap();

        transport.emit("a", StreamEvent::Finished);
        settle().await;

        let view = session.now_playing().await;
        assert_eq!(view.status, PlayerStatus::Stopped);
        assert_eq!(view.queue_len, 0);
        assert!(view.current.is_none());
        assert!(!session.has_handle().await);
        assert!(session.try_retire());
        assert_eq!(
            transport.calls(),
            vec![
                Call::Join(channel()),
                Call::Play("a".to_string()),
                Call::Stop("a".to_string()),
                Call::Leave,
            ]
        );
    }

    #[tokio::test]
    async fn test_pause_only_from_playing() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        assert!(matches!(
            session.pause().await,
            Err(PlayerError::InvalidState { status: PlayerStatus::Idle, .. })
        ));

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();
        session.pause().await.unwrap();
        assert_eq!(session.status().await, PlayerStatus::Paused);

        assert!(matches!(
            session.pause().await,
            Err(PlayerError::InvalidState { status: PlayerStatus::Paused, .. })
        ));

        session.play().await.unwrap();
        assert_eq!(session.status().await, PlayerStatus::Playing);
        assert_eq!(current_title(&session).await.as_deref(), Some("a"));
        assert!(transport.calls().contains(&Call::Resume));
    }

    #[tokio::test]
    async fn test_clear_keeps_current_song() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b", "c"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();

        assert_eq!(session.clear().await, 2);
        assert_eq!(current_title(&session).await.as_deref(), Some("a"));
        assert_eq!(session.status().await, PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_add_after_stop_is_stale() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        let epoch = session.epoch().await;
        session.stop().await.unwrap();

        let result = session
            .add_guarded(songs(&["a"]), AddOptions::default(), epoch)
            .await;

        assert!(matches!(result, Err(PlayerError::Stale)));
        assert_eq!(session.now_playing().await.queue_len, 0);
    }

    #[tokio::test]
    async fn test_stop_between_add_and_start_cancels_join() {
        let transport = FakeTransport::new();
        let session = session(&transport);
        session.connect(channel()).await.unwrap();

        let epoch = session.epoch().await;
        session
            .add_guarded(songs(&["a"]), AddOptions::default(), epoch)
            .await
            .unwrap();
        session.stop().await.unwrap();

        assert!(matches!(
            session.connect_guarded(channel(), epoch).await,
            Err(PlayerError::Stale)
        ));
        assert!(matches!(session.play_guarded(epoch).await, Err(PlayerError::Stale)));

        assert_eq!(session.status().await, PlayerStatus::Stopped);
        assert_eq!(transport.calls(), vec![Call::Join(channel()), Call::Leave]);
    }

    #[tokio::test]
    async fn test_retired_session_rejects_everything() {
        let transport = FakeTransport::new();
        let session = session(&transport);
        let epoch = session.epoch().await;

        assert!(session.try_retire());

        assert!(matches!(
            session.add_guarded(songs(&["a"]), AddOptions::default(), epoch).await,
            Err(PlayerError::Stale)
        ));
        assert!(matches!(
            session.add(songs(&["a"]), AddOptions::default()).await,
            Err(PlayerError::Stale)
        ));
        assert!(matches!(session.connect(channel()).await, Err(PlayerError::Stale)));
        assert!(matches!(session.play().await, Err(PlayerError::Stale)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connected_session_cannot_retire() {
        let transport = FakeTransport::new();
        let session = session(&transport);
        session.connect(channel()).await.unwrap();

        assert!(!session.try_retire());
        session.add(songs(&["a"]), AddOptions::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_lost_connection_requeues_and_leaves_call() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        *transport.lost_connection.lock() = true;

        assert!(matches!(session.play().await, Err(PlayerError::Connection(_))));

        let view = session.now_playing().await;
        assert_eq!(view.status, PlayerStatus::Idle);
        assert!(view.interrupted);
        let queued: Vec<&str> = view.queued.iter().map(|s| s.title()).collect();
        assert_eq!(queued, vec!["a", "b"]);
        assert!(!session.has_handle().await);
        assert_eq!(transport.calls(), vec![Call::Join(channel()), Call::Leave]);
    }

    #[tokio::test]
    async fn test_play_without_handle_and_idempotent_connect() {
        let transport = FakeTransport::new();
        let session = session(&transport);
        session.add(songs(&["a"]), AddOptions::default()).await.unwrap();

        assert!(matches!(session.play().await, Err(PlayerError::Connection(_))));

        session.connect(channel()).await.unwrap();
        session.connect(ChannelId::new(99)).await.unwrap();

        assert_eq!(transport.calls(), vec![Call::Join(channel())]);
    }

    #[tokio::test]
    async fn test_queue_capacity_is_enforced() {
        let transport = FakeTransport::new();
        let session = PlaybackSession::new(GuildId::new(1), transport.clone(), 3);

        let added = session
            .add(songs(&["a", "b", "c", "d", "e"]), AddOptions::default())
            .await
            .unwrap();
        assert_eq!(added, 3);

        assert!(matches!(
            session.add(songs(&["f"]), AddOptions::default()).await,
            Err(PlayerError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_released_voice_requeues_current_song() {
        let transport = FakeTransport::new();
        let session = session(&transport);

        session.connect(channel()).await.unwrap();
        session.add(songs(&["a", "b"]), AddOptions::default()).await.unwrap();
        session.play().await.unwrap();
        session.release_voice().await;

        let view = session.now_playing().await;
        assert_eq!(view.status, PlayerStatus::Idle);
        assert!(view.interrupted);
        assert!(view.current.is_none());
        let queued: Vec<&str> = view.queued.iter().map(|s| s.title()).collect();
        assert_eq!(queued, vec!["a", "b"]);

        session.connect(channel()).await.unwrap();
        session.play().await.unwrap();
        assert_eq!(current_title(&session).await.as_deref(), Some("a"));
        assert!(!session.now_playing().await.interrupted);
    }

    #[tokio::test]
    async fn test_shuffle_keeps_queue_length() {
        let transport = FakeTransport::new();
        let session = session(&transport);
        session
            .add(songs(&["a", "b", "c", "d"]), AddOptions::default())
            .await
            .unwrap();

        assert_eq!(session.shuffle().await, 4);
        assert_eq!(session.now_playing().await.queue_len, 4);
    }
}
