use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by clipset-core.
#[derive(Debug, Error)]
pub enum ClipsetError {
    #[error("no .wav files found under {}", root.display())]
    EmptyDataset { root: PathBuf },

    #[error("index {position} out of range for dataset of {len} files")]
    IndexOutOfRange { position: i64, len: usize },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("resample error: {0}")]
    Resample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipsetError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipsetError>;
