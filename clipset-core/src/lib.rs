//! # clipset-core
//!
//! Fixed-shape training examples from a directory of variable-length recordings.
//!
//! ## Architecture
//!
//! ```text
//! root dir → FileIndex (sorted .wav paths, probed native rate)
//!                │
//!        resolve(position)
//!                │
//!        SampleExtractor::extract
//!          decode → resample → pad to target+1 → random crop
//!                │
//!        WaveformBuffer (channels × target_samples @ target_rate)
//! ```
//!
//! Every access is independent. Randomness comes from a generator handle owned
//! by the caller, so parallel workers never share RNG state.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod dataset;
pub mod error;
pub mod loader;

// Convenience re-exports for downstream crates
pub use buffering::waveform::WaveformBuffer;
pub use dataset::{
    extract::{SampleExtractor, TargetSpec},
    index::FileIndex,
    ClipDataset,
};
pub use error::{ClipsetError, Result};
pub use loader::{EpochLoader, LoadedItem, LoaderConfig, LoaderStats};
