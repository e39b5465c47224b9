//! Error taxonomy for the engine boundary.

use crate::ports::RepoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LottoError {
    #[error("invalid game type: {0}")]
    InvalidGameType(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("admin privileges required")]
    NotAdmin,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] RepoError),

    /// Only ever reported next to a draw that was saved.
    #[error("statistics update failed: {0}")]
    StatisticsUpdateFailed(String),
}

impl LottoError {
    pub fn invalid_options(message: impl ToString) -> Self {
        Self::InvalidOptions(message.to_string())
    }

    /// Transient failures the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Stable machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidGameType(_) => "invalid_game_type",
            Self::InvalidOptions(_) => "invalid_options",
            Self::NotAuthenticated => "not_authenticated",
            Self::NotAuthorized(_) => "not_authorized",
            Self::NotAdmin => "not_admin",
            Self::NotFound { .. } => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::StatisticsUpdateFailed(_) => "statistics_update_failed",
        }
    }

    /// Human-readable message shown to end users instead of the error chain.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidGameType(_) => "Tipo de juego inválido",
            Self::InvalidOptions(_) => "Opciones de generación inválidas",
            Self::NotAuthenticated => "Usuario no autenticado",
            Self::NotAuthorized(_) => "No tienes permiso para acceder a este registro",
            Self::NotAdmin => "Acceso denegado. Se requieren permisos de administrador.",
            Self::NotFound { .. } => "Registro no encontrado",
            Self::StorageUnavailable(_) => {
                "El servicio no está disponible. Por favor, intenta de nuevo."
            }
            Self::StatisticsUpdateFailed(_) => {
                "Números guardados, pero las estadísticas no se actualizaron"
            }
        }
    }
}

impl From<RepoError> for LottoError {
    fn from(error: RepoError) -> Self {
        Self::StorageUnavailable(error)
    }
}
