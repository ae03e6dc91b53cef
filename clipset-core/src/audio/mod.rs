//! Decode collaborator: WAV files on disk → [`WaveformBuffer`] at the file's native rate.
//!
//! Backed by `hound`. Integer PCM is scaled by `2^(bits-1)` into [-1.0, 1.0);
//! float PCM is passed through. Channels are kept separate, never down-mixed.

pub mod resample;

use std::path::Path;

use tracing::debug;

use crate::{
    buffering::waveform::WaveformBuffer,
    error::{ClipsetError, Result},
};

/// File extension recognised as a decodable waveform. Matched case-sensitively,
/// so `clip.WAV` is not part of a dataset.
pub const WAV_EXTENSION: &str = "wav";

/// Returns `true` if `path` carries the `.wav` extension.
pub fn is_wav_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s == WAV_EXTENSION)
        .unwrap_or(false)
}

/// Read only the header of `path` and return its sample rate (Hz).
///
/// # Errors
/// Returns `ClipsetError::Decode` if the file cannot be opened or its header is malformed.
pub fn probe_sample_rate(path: &Path) -> Result<u32> {
    let reader = hound::WavReader::open(path).map_err(|e| ClipsetError::decode(path, e))?;
    Ok(reader.spec().sample_rate)
}

/// Decode every sample of `path`.
///
/// # Errors
/// Returns `ClipsetError::Decode` if the file is unreadable, malformed, or
/// truncated mid-stream. No partially decoded buffer is ever returned.
pub fn decode_wav(path: &Path) -> Result<WaveformBuffer> {
    let mut reader = hound::WavReader::open(path).map_err(|e| ClipsetError::decode(path, e))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ClipsetError::decode(path, e))?,
        hound::SampleFormat::Int => {
            let scale = int_full_scale(spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ClipsetError::decode(path, e))?
        }
    };

    debug!(
        path = %path.display(),
        channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        frames = interleaved.len() / channels.max(1),
        "decoded wav"
    );

    Ok(WaveformBuffer::from_interleaved(
        &interleaved,
        channels,
        spec.sample_rate,
    ))
}

fn int_full_scale(bits_per_sample: u16) -> f32 {
    (1_i64 << (bits_per_sample.clamp(1, 32) - 1)) as f32
}
