//! Typed multi-channel signal passed from the decoder through to the caller.

/// A channel-major block of f32 PCM samples at a known sample rate.
///
/// Every channel holds the same number of samples. Allocated fresh on each
/// extraction and owned exclusively by whoever requested it.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBuffer {
    /// `channels[c][n]` is sample `n` of channel `c`, nominally in [-1.0, 1.0].
    channels: Vec<Vec<f32>>,
    /// Sample rate in Hz (e.g. 8000, 16000, 44100).
    pub sample_rate: u32,
}

impl WaveformBuffer {
    /// Wrap channel-major samples.
    ///
    /// # Panics
    /// Panics if the channels differ in length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        if let Some(first) = channels.first() {
            let len = first.len();
            assert!(
                channels.iter().all(|c| c.len() == len),
                "all channels must hold the same number of samples"
            );
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// Single-channel convenience constructor.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved frames (`L R L R …`) into channels.
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(interleaved: &[f32], num_channels: usize, sample_rate: u32) -> Self {
        if num_channels == 0 {
            return Self::new(Vec::new(), sample_rate);
        }
        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Returns the duration of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Frame-interleaved copy of the samples.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let n = self.num_samples();
        let mut out = Vec::with_capacity(n * self.num_channels());
        for i in 0..n {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}
