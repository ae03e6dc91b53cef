//! In-memory signal containers passed between the decode, resample and crop stages.

pub mod waveform;
