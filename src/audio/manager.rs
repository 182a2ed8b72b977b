use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{player::PlaybackSession, voice::VoiceTransport},
    error::{PlayerError, PlayerResult},
};

/// Registro de sesiones: exactamente una [`PlaybackSession`] por guild.
///
/// Cada entrada se bloquea por separado; operar sobre una guild nunca
/// bloquea a otra.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    transport: Arc<dyn VoiceTransport>,
    max_queue_size: usize,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>, max_queue_size: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            transport,
            max_queue_size,
        }
    }

    /// Sesión existente o una nueva creada de forma atómica
    pub fn get(&self, guild_id: GuildId) -> Arc<PlaybackSession> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 Creando sesión para guild {}", guild_id);
                PlaybackSession::new(guild_id, self.transport.clone(), self.max_queue_size)
            })
            .clone()
    }

    /// Sesión existente, sin crearla
    pub fn find(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Elimina una sesión ya detenida y la retira, de modo que quien todavía
    /// la tenga en mano no pueda volver a conectarla.
    ///
    /// Falla con `SessionActive` si la sesión conserva su conexión de voz o
    /// tiene una operación en curso.
    pub fn remove(&self, guild_id: GuildId) -> PlayerResult<()> {
        match self
            .sessions
            .remove_if(&guild_id, |_, session| session.try_retire())
        {
            Some(_) => {
                info!("🗑️ Sesión de guild {} eliminada", guild_id);
                Ok(())
            }
            None if self.sessions.contains_key(&guild_id) => Err(PlayerError::SessionActive),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{player::AddOptions, voice::testing::FakeTransport};
    use serenity::model::id::ChannelId;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(FakeTransport::new(), 100)
    }

    #[test]
    fn test_same_session_for_same_guild() {
        let registry = registry();

        let first = registry.get(GuildId::new(1));
        let again = registry.get(GuildId::new(1));
        let other = registry.get(GuildId::new(2));

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
        assert!(registry.find(GuildId::new(3)).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_get_creates_one_session() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get(GuildId::new(7)) })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert!(sessions.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_refused_while_connected() {
        let registry = registry();
        let guild = GuildId::new(1);
        let session = registry.get(guild);

        session.connect(ChannelId::new(10)).await.unwrap();
        assert!(matches!(registry.remove(guild), Err(PlayerError::SessionActive)));

        session.stop().await.unwrap();
        registry.remove(guild).unwrap();
        assert!(registry.find(guild).is_none());

        let fresh = registry.get(guild);
        assert!(!Arc::ptr_eq(&session, &fresh));
    }

    #[tokio::test]
    async fn test_removed_session_cannot_be_revived() {
        let registry = registry();
        let guild = GuildId::new(1);
        let session = registry.get(guild);

        session.connect(ChannelId::new(10)).await.unwrap();
        let epoch = session.epoch().await;
        session.release_voice().await;
        registry.remove(guild).unwrap();

        assert!(matches!(
            session
                .add_guarded(Vec::new(), AddOptions::default(), epoch)
                .await,
            Err(PlayerError::Stale)
        ));
        assert!(matches!(
            session.connect(ChannelId::new(10)).await,
            Err(PlayerError::Stale)
        ));
        assert!(registry.find(guild).is_none());
    }
}
