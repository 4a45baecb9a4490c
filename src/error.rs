use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("no opening city tile for the {side}")]
    MissingOpening { side: &'static str },
    #[error("both openings sit on ({x}, {y})")]
    CoincidentOpenings { x: i32, y: i32 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("map dimensions {width}x{height} are not positive")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("player id {0} is not 0 or 1")]
    PlayerIdOutOfRange(usize),
    #[error("unknown team {0}")]
    UnknownTeam(u8),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    State(#[from] StateError),
}
