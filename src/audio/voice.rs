use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    error::{PlayerError, PlayerResult},
    sources::Song,
};

/// Conexión de voz establecida para una guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHandle {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// Evento de ciclo de vida de un stream en curso
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Finished,
    Failed(String),
}

/// Control sobre un stream que ya está sonando
pub trait StreamControl: Send + Sync {
    fn pause(&self) -> PlayerResult<()>;
    fn resume(&self) -> PlayerResult<()>;
    fn stop(&self) -> PlayerResult<()>;
}

pub struct StartedStream {
    pub control: Box<dyn StreamControl>,
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
}

/// Transporte de voz que usa una sesión de reproducción
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> PlayerResult<VoiceHandle>;

    /// Inicia el stream y retorna sin esperar a que termine
    async fn play_stream(&self, handle: &VoiceHandle, song: &Song) -> PlayerResult<StartedStream>;

    async fn leave(&self, handle: VoiceHandle);
}

/// Transporte real sobre songbird
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { songbird, http }
    }

    fn input_for(&self, song: &Song) -> Input {
        if song.kind().is_video_platform() {
            YoutubeDl::new(self.http.clone(), song.url().to_string()).into()
        } else {
            HttpRequest::new(self.http.clone(), song.url().to_string()).into()
        }
    }
}

struct SongbirdStream(TrackHandle);

impl StreamControl for SongbirdStream {
    fn pause(&self) -> PlayerResult<()> {
        self.0
            .pause()
            .map_err(|e| PlayerError::Stream(e.to_string()))
    }

    fn resume(&self) -> PlayerResult<()> {
        self.0.play().map_err(|e| PlayerError::Stream(e.to_string()))
    }

    fn stop(&self) -> PlayerResult<()> {
        self.0.stop().map_err(|e| PlayerError::Stream(e.to_string()))
    }
}

/// Reenvía fin y error de pista al canal de la sesión
struct TrackLifecycleHandler {
    events: mpsc::UnboundedSender<StreamEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackLifecycleHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        let event = match tracks.first().map(|(state, _)| &state.playing) {
            Some(PlayMode::Errored(e)) => StreamEvent::Failed(format!("{e:?}")),
            _ => StreamEvent::Finished,
        };

        let _ = self.events.send(event);
        Some(Event::Cancel)
    }
}

/// Corta la pista al terminar el capítulo
struct ChapterEndHandler {
    track: TrackHandle,
}

#[async_trait]
impl VoiceEventHandler for ChapterEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("📑 Fin de capítulo");
        let _ = self.track.stop();
        Some(Event::Cancel)
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> PlayerResult<VoiceHandle> {
        info!("🔗 Conectando al canal {} en guild {}", channel_id, guild_id);

        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| PlayerError::Connection(e.to_string()))?;

        Ok(VoiceHandle {
            guild_id,
            channel_id,
        })
    }

    async fn play_stream(&self, handle: &VoiceHandle, song: &Song) -> PlayerResult<StartedStream> {
        let call = self
            .songbird
            .get(handle.guild_id)
            .ok_or_else(|| PlayerError::Connection("sin llamada de voz activa".to_string()))?;

        let input = self.input_for(song);
        let track = {
            let mut call = call.lock().await;
            call.play_only_input(input)
        };

        let (sender, events) = mpsc::unbounded_channel();
        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(
                    Event::Track(event),
                    TrackLifecycleHandler {
                        events: sender.clone(),
                    },
                )
                .map_err(|e| PlayerError::Stream(e.to_string()))?;
        }

        if let Some(chapter) = song.metadata.chapter {
            // El driver aplica el seek cuando la entrada está lista
            let _ = track.seek(chapter.offset);
            track
                .add_event(
                    Event::Delayed(chapter.length),
                    ChapterEndHandler {
                        track: track.clone(),
                    },
                )
                .map_err(|e| PlayerError::Stream(e.to_string()))?;
        }

        info!("🎵 Reproduciendo [{}]: {}", song.kind().as_str(), song.title());
        Ok(StartedStream {
            control: Box::new(SongbirdStream(track)),
            events,
        })
    }

    async fn leave(&self, handle: VoiceHandle) {
        match self.songbird.remove(handle.guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", handle.guild_id),
            Err(e) => debug!("Desconexión sin llamada activa: {:?}", e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Transporte en memoria para probar sesiones sin Discord

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Join(ChannelId),
        Play(String),
        Pause,
        Resume,
        Stop(String),
        Leave,
    }

    #[derive(Default)]
    pub struct FakeTransport {
        pub calls: Arc<Mutex<Vec<Call>>>,
        senders: Mutex<Vec<(String, mpsc::UnboundedSender<StreamEvent>)>>,
        pub fail_join: Mutex<bool>,
        /// `play_stream` falla como si se hubiera caído la llamada
        pub lost_connection: Mutex<bool>,
        pub broken: Mutex<HashSet<String>>,
    }

    struct FakeStream {
        title: String,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl StreamControl for FakeStream {
        fn pause(&self) -> PlayerResult<()> {
            self.calls.lock().push(Call::Pause);
            Ok(())
        }

        fn resume(&self) -> PlayerResult<()> {
            self.calls.lock().push(Call::Resume);
            Ok(())
        }

        fn stop(&self) -> PlayerResult<()> {
            self.calls.lock().push(Call::Stop(self.title.clone()));
            Ok(())
        }
    }

    impl FakeTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        pub fn played(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Play(title) => Some(title),
                    _ => None,
                })
                .collect()
        }

        /// Emite un evento para el stream `title` más reciente
        pub fn emit(&self, title: &str, event: StreamEvent) {
            let senders = self.senders.lock();
            if let Some((_, sender)) = senders.iter().rev().find(|(t, _)| t == title) {
                let _ = sender.send(event);
            }
        }
    }

    #[async_trait]
    impl VoiceTransport for FakeTransport {
        async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> PlayerResult<VoiceHandle> {
            if *self.fail_join.lock() {
                return Err(PlayerError::Connection("canal lleno".to_string()));
            }
            self.calls.lock().push(Call::Join(channel_id));
            Ok(VoiceHandle {
                guild_id,
                channel_id,
            })
        }

        async fn play_stream(&self, _handle: &VoiceHandle, song: &Song) -> PlayerResult<StartedStream> {
            if *self.lost_connection.lock() {
                return Err(PlayerError::Connection("llamada cerrada".to_string()));
            }

            let title = song.title().to_string();
            if self.broken.lock().contains(&title) {
                return Err(PlayerError::Stream(format!("no se pudo abrir {title}")));
            }

            self.calls.lock().push(Call::Play(title.clone()));
            let (sender, events) = mpsc::unbounded_channel();
            self.senders.lock().push((title.clone(), sender));

            Ok(StartedStream {
                control: Box::new(FakeStream {
                    title,
                    calls: self.calls.clone(),
                }),
                events,
            })
        }

        async fn leave(&self, _handle: VoiceHandle) {
            self.calls.lock().push(Call::Leave);
        }
    }
}
