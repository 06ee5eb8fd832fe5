//! Error taxonomy for the synthesis pipeline.
//!
//! Model sessions report failures as [`anyhow::Error`] (they only add
//! context); the pipeline wraps those into [`Error::ModelExecution`] with the
//! underlying error kept as the source.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Acceleration;

/// Errors surfaced by [`Synthesizer`](crate::Synthesizer) and the loaders.
#[derive(Debug, Error)]
pub enum Error {
    /// Batch synthesis was given a different number of texts and voices.
    #[error("text count ({texts}) does not match voice count ({voices})")]
    InputMismatch { texts: usize, voices: usize },

    /// A voice style file is malformed or disagrees with the rest of the batch.
    #[error("voice style: {0}")]
    StyleFormat(String),

    /// One of the four model sessions failed or returned an unexpected shape.
    #[error("{model} inference failed")]
    ModelExecution {
        model: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Missing or malformed `tts.json`, `unicode_indexer.json` or ONNX file.
    #[error("cannot load {}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The requested execution provider is not wired up.
    #[error("{0:?} acceleration is not supported")]
    UnsupportedAcceleration(Acceleration),

    /// Synthesis options rejected before any model call.
    #[error("invalid synthesis options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn model(model: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Error::ModelExecution { model, source: source.into() }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Error::ConfigLoad { path: path.into(), source: source.into() }
    }
}
