use thiserror::Error;

/// Errors surfaced by the game core and its presentation layer.
///
/// Out-of-bounds commands (a click outside the walkable area, a pan that
/// would leave the map) are not errors and never produce one of these.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("asset `{name}` is unavailable")]
    AssetUnavailable { name: String },

    #[error("required assets missing: {}", .0.join(", "))]
    MissingRequiredAssets(Vec<String>),

    #[error("unsupported rendering backend: {0}")]
    UnsupportedBackend(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode texture")]
    TextureDecode(#[from] image::ImageError),

    #[error("a dynamic body is already registered")]
    DynamicBodyExists,
}

pub type Result<T> = std::result::Result<T, GameError>;
