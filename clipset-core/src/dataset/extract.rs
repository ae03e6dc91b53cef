//! Per-item window extraction.
//!
//! ## Stages (per call)
//!
//! ```text
//! 1. decode            → channels × L at the native rate
//! 2. normalise rate    → resample to target_rate (skipped when equal)
//! 3. pad if short      → L < target_samples ⇒ zero-pad to target_samples + 1
//! 4. draw begin        → uniform over [0, L' - target_samples]
//! 5. crop              → [begin, begin + target_samples) on every channel
//! ```
//!
//! Padding overshoots by one sample so a minimum-length signal still has two
//! candidate offsets instead of a single forced one.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    audio::{decode_wav, resample::resample},
    buffering::waveform::WaveformBuffer,
    error::{ClipsetError, Result},
};

pub const DEFAULT_TARGET_RATE: u32 = 8_000;
pub const DEFAULT_TARGET_DURATION_SECS: u32 = 2;

/// Output shape of every extracted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct TargetSpec {
    /// Resample destination (Hz). Default: 8000.
    pub target_rate: u32,
    /// Window length in seconds. Default: 2.
    pub target_duration_secs: u32,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            target_rate: DEFAULT_TARGET_RATE,
            target_duration_secs: DEFAULT_TARGET_DURATION_SECS,
        }
    }
}

impl TargetSpec {
    /// # Errors
    /// `ClipsetError::Other` if either value is zero.
    pub fn new(target_rate: u32, target_duration_secs: u32) -> Result<Self> {
        let spec = Self {
            target_rate,
            target_duration_secs,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_rate == 0 || self.target_duration_secs == 0 {
            return Err(ClipsetError::Other(anyhow::anyhow!(
                "target rate and duration must be non-zero (rate={}, secs={})",
                self.target_rate,
                self.target_duration_secs
            )));
        }
        Ok(())
    }

    /// Samples per channel in every extracted window.
    pub fn target_samples(&self) -> usize {
        self.target_rate as usize * self.target_duration_secs as usize
    }
}

/// Right-pad every channel with zeros to `target_samples + 1` when shorter
/// than `target_samples`. Returns `true` if padding happened.
pub fn pad_to_minimum(channels: &mut [Vec<f32>], target_samples: usize) -> bool {
    let len = channels.first().map_or(0, Vec::len);
    if len >= target_samples {
        return false;
    }
    for channel in channels.iter_mut() {
        channel.resize(target_samples + 1, 0.0);
    }
    true
}

/// Uniform draw from the inclusive range `[0, len - target_samples]`.
///
/// `len` must be at least `target_samples`; [`pad_to_minimum`] guarantees it.
pub fn draw_window_start<R: Rng + ?Sized>(len: usize, target_samples: usize, rng: &mut R) -> usize {
    debug_assert!(len >= target_samples);
    rng.gen_range(0..=len.saturating_sub(target_samples))
}

/// Copy `[begin, begin + target_samples)` out of every channel.
pub fn crop_window(channels: &[Vec<f32>], begin: usize, target_samples: usize) -> Vec<Vec<f32>> {
    channels
        .iter()
        .map(|c| c[begin..begin + target_samples].to_vec())
        .collect()
}

/// Turns a file path into one fixed-shape, randomly positioned training window.
///
/// Holds no mutable state; share it freely and pass each caller's own RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleExtractor {
    spec: TargetSpec,
}

impl SampleExtractor {
    pub fn new(spec: TargetSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> TargetSpec {
        self.spec
    }

    /// Decode `path` and return a `channels × target_samples` window at `target_rate`.
    ///
    /// # Errors
    /// `ClipsetError::Decode` for unreadable or malformed files,
    /// `ClipsetError::Resample` if rate conversion fails. Nothing is retried.
    pub fn extract<R: Rng + ?Sized>(&self, path: &Path, rng: &mut R) -> Result<WaveformBuffer> {
        self.extract_with_offset(path, rng).map(|(buffer, _)| buffer)
    }

    /// Like [`extract`](Self::extract), also returning the drawn window start
    /// (in samples at `target_rate`).
    pub fn extract_with_offset<R: Rng + ?Sized>(
        &self,
        path: &Path,
        rng: &mut R,
    ) -> Result<(WaveformBuffer, usize)> {
        let decoded = decode_wav(path)?;
        let (window, begin) = self.extract_from_buffer(decoded, rng)?;
        trace!(path = %path.display(), begin, "window extracted");
        Ok((window, begin))
    }

    /// Run stages 2-5 on an already decoded signal.
    pub fn extract_from_buffer<R: Rng + ?Sized>(
        &self,
        decoded: WaveformBuffer,
        rng: &mut R,
    ) -> Result<(WaveformBuffer, usize)> {
        let target_rate = self.spec.target_rate;
        let target_samples = self.spec.target_samples();

        let normalised = resample(decoded, target_rate)?;
        if normalised.num_channels() == 0 {
            return Ok((WaveformBuffer::new(Vec::new(), target_rate), 0));
        }

        let mut channels = normalised.into_channels();
        pad_to_minimum(&mut channels, target_samples);

        let begin = draw_window_start(channels[0].len(), target_samples, rng);
        let window = crop_window(&channels, begin, target_samples);

        Ok((WaveformBuffer::new(window, target_rate), begin))
    }
}
