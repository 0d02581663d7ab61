use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordError {
    /// Argumentos inválidos o topología imposible de reparar con defaults.
    #[error("error de configuración: {message}")]
    Config { message: String },

    /// Alguna posición faltó o llegó repetida al juntar los pileups.
    #[error("violación de partición en la posición {position}: {detail}")]
    Partition { position: usize, detail: String },

    #[error("error de E/S en '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("error de transporte con el KVS (clave '{key}'): {message}")]
    Transport {
        key: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("timeout esperando la clave '{key}' tras {waited:?}")]
    Timeout { key: String, waited: Duration },

    #[error("la tarea falló en la posición {position}: {source}")]
    Task {
        position: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, CoordError>;

impl CoordError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transport(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with(
        key: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            key: key.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn partition(position: usize, detail: impl Into<String>) -> Self {
        Self::Partition {
            position,
            detail: detail.into(),
        }
    }

    pub fn is_partition(&self) -> bool {
        matches!(self, Self::Partition { .. })
    }
}
