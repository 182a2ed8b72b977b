use thiserror::Error;

use crate::audio::player::PlayerStatus;

/// Errores del núcleo de reproducción.
///
/// `NotFound`, `UnsupportedSource` y `Connection` llegan al usuario;
/// `Stream` se recupera dentro de la sesión avanzando a la siguiente canción.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no se encontró nada reproducible")]
    NotFound,

    #[error("fuente no soportada: {0}")]
    UnsupportedSource(String),

    #[error("error de conexión de voz: {0}")]
    Connection(String),

    #[error("error de stream: {0}")]
    Stream(String),

    #[error("no se puede {action} en estado {status:?}")]
    InvalidState {
        action: &'static str,
        status: PlayerStatus,
    },

    /// La sesión cambió de época mientras la operación estaba en vuelo.
    #[error("la sesión fue detenida durante la operación")]
    Stale,

    #[error("la sesión todavía tiene una conexión de voz activa")]
    SessionActive,

    /// Opción de comando fuera de rango
    #[error("valor inválido para {0}")]
    InvalidArgument(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl PlayerError {
    /// Texto mostrado al usuario en el chat.
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::NotFound => "isso não existe".to_string(),
            PlayerError::UnsupportedSource(source) => {
                format!("essa fonte não é suportada ({source})")
            }
            PlayerError::Connection(_) => "não consegui entrar no canal de voz".to_string(),
            PlayerError::Stream(_) => "falha ao tocar a música, pulando".to_string(),
            PlayerError::InvalidState { action, .. } => {
                format!("não é possível {action} agora")
            }
            PlayerError::Stale => "a reprodução foi parada antes de concluir o pedido".to_string(),
            PlayerError::SessionActive => "ainda estou conectado ao canal de voz".to_string(),
            PlayerError::InvalidArgument(name) => format!("valor inválido para {name}"),
            PlayerError::Backend(_) => "erro ao buscar a música, tente novamente".to_string(),
        }
    }

    /// Errores que el usuario puede reintentar sin cambiar la consulta.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PlayerError::Connection(_) | PlayerError::Backend(_) | PlayerError::Stale
        )
    }
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_retriable() {
        assert!(!PlayerError::NotFound.is_retriable());
        assert!(PlayerError::Connection("timeout".into()).is_retriable());
        assert_eq!(PlayerError::NotFound.user_message(), "isso não existe");
    }

    #[test]
    fn test_invalid_argument_names_the_option() {
        let error = PlayerError::InvalidArgument("o limite de playlist");
        assert_eq!(error.user_message(), "valor inválido para o limite de playlist");
        assert!(!error.is_retriable());
    }
}
