//! Resample collaborator: whole-signal sample-rate conversion using a rubato
//! `SincFixedIn` resampler.
//!
//! ## Design
//!
//! Datasets are recorded at whatever rate the source used (16 kHz, 44.1 kHz,
//! 48 kHz…). The extractor needs one fixed rate. `RateConverter` feeds the
//! whole decoded signal through rubato in fixed input chunks, flushes the
//! filter tail, then trims the filter delay so output sample `n` lines up with
//! input time `n / to_rate`. Output length per channel is
//! `ceil(L * to_rate / from_rate)`.
//!
//! When the rates match, `RateConverter` is a passthrough and no rubato
//! session is created at all.
//!
//! ## Usage
//!
//! ```ignore
//! let mut rc = RateConverter::new(16_000, 8_000, 2)?;
//! let out = rc.process(&channels)?; // Vec<Vec<f32>> at 8 kHz
//! ```

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::{
    buffering::waveform::WaveformBuffer,
    error::{ClipsetError, Result},
};

/// Input frames handed to rubato per process call.
const CHUNK_SIZE: usize = 1024;

/// Converts channel-major f32 audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when from rate == to rate (passthrough mode).
    resampler: Option<SincFixedIn<f32>>,
    from_rate: u32,
    to_rate: u32,
    num_channels: usize,
    /// Pre-allocated output buffer: `[num_channels][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Parameters
    /// - `from_rate`: Sample rate of the incoming audio (Hz).
    /// - `to_rate`: Sample rate to produce (Hz).
    /// - `num_channels`: Channel count; every call to `process` must match it.
    ///
    /// # Errors
    /// Returns `ClipsetError::Resample` if either rate is zero or rubato fails
    /// to initialise.
    pub fn new(from_rate: u32, to_rate: u32, num_channels: usize) -> Result<Self> {
        if from_rate == 0 || to_rate == 0 {
            return Err(ClipsetError::Resample(format!(
                "invalid rates from={from_rate} to={to_rate}"
            )));
        }

        if from_rate == to_rate || num_channels == 0 {
            return Ok(Self {
                resampler: None,
                from_rate,
                to_rate,
                num_channels,
                output_buf: Vec::new(),
            });
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            params,
            CHUNK_SIZE,
            num_channels,
        )
        .map_err(|e| ClipsetError::Resample(format!("resampler init: {e}")))?;

        let output_buf = resampler.output_buffer_allocate(true);

        debug!(
            from_rate,
            to_rate,
            num_channels,
            delay = resampler.output_delay(),
            "resampler created"
        );

        Ok(Self {
            resampler: Some(resampler),
            from_rate,
            to_rate,
            num_channels,
            output_buf,
        })
    }

    /// Resample a complete signal, one `Vec` per channel.
    ///
    /// In passthrough mode the input is returned unchanged.
    ///
    /// # Errors
    /// Returns `ClipsetError::Resample` on a channel-count mismatch, ragged
    /// channels, or a rubato processing failure.
    pub fn process(&mut self, input: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        if input.len() != self.num_channels {
            return Err(ClipsetError::Resample(format!(
                "expected {} channels, got {}",
                self.num_channels,
                input.len()
            )));
        }

        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        let len = input[0].len();
        if input.iter().any(|c| c.len() != len) {
            return Err(ClipsetError::Resample("channels differ in length".into()));
        }

        let expected = output_len(len, self.from_rate, self.to_rate);
        let mut out = vec![Vec::with_capacity(expected + CHUNK_SIZE); self.num_channels];
        if len == 0 {
            return Ok(out);
        }

        let delay = resampler.output_delay();
        let mut pos = 0;

        while len - pos >= resampler.input_frames_next() {
            let frames = resampler.input_frames_next();
            let slices: Vec<&[f32]> = input.iter().map(|c| &c[pos..pos + frames]).collect();
            let (consumed, produced) = resampler
                .process_into_buffer(&slices, &mut self.output_buf, None)
                .map_err(|e| ClipsetError::Resample(e.to_string()))?;
            append(&mut out, &self.output_buf, produced);
            pos += consumed;
        }

        if pos < len {
            let slices: Vec<&[f32]> = input.iter().map(|c| &c[pos..]).collect();
            let (_consumed, produced) = resampler
                .process_partial_into_buffer(Some(slices.as_slice()), &mut self.output_buf, None)
                .map_err(|e| ClipsetError::Resample(e.to_string()))?;
            append(&mut out, &self.output_buf, produced);
        }

        // Flush the filter tail until the delayed output covers the whole signal.
        while out[0].len() < delay + expected {
            let (_consumed, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut self.output_buf, None)
                .map_err(|e| ClipsetError::Resample(e.to_string()))?;
            if produced == 0 {
                break;
            }
            append(&mut out, &self.output_buf, produced);
        }

        for channel in &mut out {
            channel.drain(..delay.min(channel.len()));
            channel.resize(expected, 0.0);
        }

        Ok(out)
    }

    /// Returns `true` when from rate == to rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

fn append(out: &mut [Vec<f32>], produced_buf: &[Vec<f32>], produced: usize) {
    for (dst, src) in out.iter_mut().zip(produced_buf) {
        dst.extend_from_slice(&src[..produced]);
    }
}

/// Per-channel length after converting `len` samples from `from_rate` to `to_rate`.
pub fn output_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    let num = len as u64 * to_rate as u64;
    num.div_ceil(from_rate as u64) as usize
}

/// Resample `buffer` to `to_rate`, preserving its channel count.
///
/// # Errors
/// Returns `ClipsetError::Resample` if the converter cannot be built or fails.
pub fn resample(buffer: WaveformBuffer, to_rate: u32) -> Result<WaveformBuffer> {
    if buffer.sample_rate == to_rate {
        return Ok(buffer);
    }
    let mut rc = RateConverter::new(buffer.sample_rate, to_rate, buffer.num_channels())?;
    let channels = rc.process(buffer.channels())?;
    Ok(WaveformBuffer::new(channels, to_rate))
}
