//! Position-addressable dataset: a [`FileIndex`] plus a [`SampleExtractor`].
//!
//! `ClipDataset` is `Send + Sync`; wrap it in `Arc` and call [`ClipDataset::get`]
//! from as many threads as needed, each with its own RNG.

pub mod extract;
pub mod index;

use std::path::Path;

use rand::Rng;

use crate::{buffering::waveform::WaveformBuffer, error::Result};

use self::{
    extract::{SampleExtractor, TargetSpec},
    index::FileIndex,
};

#[derive(Debug, Clone)]
pub struct ClipDataset {
    index: FileIndex,
    extractor: SampleExtractor,
}

impl ClipDataset {
    /// Index every `.wav` under `root` and prepare windows of shape `spec`.
    ///
    /// # Errors
    /// See [`FileIndex::discover`] and [`TargetSpec::validate`].
    pub fn open(root: impl AsRef<Path>, spec: TargetSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self::new(FileIndex::discover(root)?, SampleExtractor::new(spec)))
    }

    pub fn new(index: FileIndex, extractor: SampleExtractor) -> Self {
        Self { index, extractor }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sample rate probed from the first file. Not the output rate; see [`target`](Self::target).
    pub fn native_sample_rate(&self) -> u32 {
        self.index.native_sample_rate()
    }

    pub fn target(&self) -> TargetSpec {
        self.extractor.spec()
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn extractor(&self) -> &SampleExtractor {
        &self.extractor
    }

    /// Fresh random window from the file at `position`.
    ///
    /// # Errors
    /// `IndexOutOfRange` for a bad position, otherwise whatever
    /// [`SampleExtractor::extract`] returns.
    pub fn get<R: Rng + ?Sized>(&self, position: i64, rng: &mut R) -> Result<WaveformBuffer> {
        let path = self.index.resolve(position)?;
        self.extractor.extract(path, rng)
    }
}
