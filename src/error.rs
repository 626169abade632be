//! Error types for striker_vision.
//!
//! Per-frame processing never fails; a frame that yields nothing is simply a
//! miss. These errors only arise at the edges: loading configuration and
//! decoding the text records that enter and leave the pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("malformed frame record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field {index} ({name}) is not a valid number: {value:?}")]
    Field {
        index: usize,
        name: &'static str,
        value: String,
    },

    #[error("malformed message line: {0}")]
    Malformed(String),
}
