//! Multi-worker epoch loader.
//!
//! ## Flow (per epoch)
//!
//! ```text
//! epoch order (0..len, optionally shuffled)
//!        │ crossbeam work queue
//!        ▼
//! worker 0..N  — each owns a StdRng, calls ClipDataset::get
//!        │ bounded crossbeam result channel
//!        ▼
//! EpochIter yields LoadedItem in completion order
//! ```
//!
//! Items are never batched, retried or skipped: a failed extraction is
//! delivered as an `Err` for that position and the epoch carries on.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{buffering::waveform::WaveformBuffer, dataset::ClipDataset, error::Result};

/// Configuration for `EpochLoader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct LoaderConfig {
    /// Worker threads per epoch. Zero is treated as one. Default: 2.
    pub num_workers: usize,
    /// Visit positions in a random order each epoch. Default: false.
    pub shuffle: bool,
    /// Base seed for the epoch order and every worker's RNG.
    /// `None` draws fresh OS entropy each epoch.
    pub seed: Option<u64>,
    /// Completed items buffered ahead of the consumer. Default: 64.
    pub channel_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            shuffle: false,
            seed: None,
            channel_capacity: 64,
        }
    }
}

/// One extracted window (or the error that prevented it).
#[derive(Debug)]
pub struct LoadedItem {
    pub position: usize,
    pub result: Result<WaveformBuffer>,
}

#[derive(Debug, Default)]
pub struct LoaderStats {
    pub items_loaded: AtomicUsize,
    pub items_failed: AtomicUsize,
}

impl LoaderStats {
    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            items_loaded: self.items_loaded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStatsSnapshot {
    pub items_loaded: usize,
    pub items_failed: usize,
}

pub struct EpochLoader {
    dataset: Arc<ClipDataset>,
    config: LoaderConfig,
    stats: Arc<LoaderStats>,
}

impl EpochLoader {
    pub fn new(dataset: Arc<ClipDataset>, config: LoaderConfig) -> Self {
        Self {
            dataset,
            config,
            stats: Arc::new(LoaderStats::default()),
        }
    }

    pub fn dataset(&self) -> &Arc<ClipDataset> {
        &self.dataset
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Counters accumulated across every epoch run by this loader.
    pub fn stats(&self) -> &Arc<LoaderStats> {
        &self.stats
    }

    /// Positions in the order they are handed to workers for `epoch`.
    pub fn epoch_order(&self, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            let mut rng = self.rng_for(epoch, u64::MAX);
            order.shuffle(&mut rng);
        }
        order
    }

    /// Start `epoch`: spawn the workers and return an iterator over their output.
    ///
    /// # Errors
    /// `ClipsetError::Io` if a worker thread cannot be spawned.
    pub fn epoch(&self, epoch: u64) -> Result<EpochIter> {
        let order = self.epoch_order(epoch);
        let num_workers = self.config.num_workers.max(1);

        info!(
            epoch,
            items = order.len(),
            workers = num_workers,
            shuffle = self.config.shuffle,
            "epoch started"
        );

        let (work_tx, work_rx) = unbounded::<usize>();
        for position in order {
            // The receiver is alive in this scope, so this cannot fail.
            let _ = work_tx.send(position);
        }
        drop(work_tx);

        let (result_tx, result_rx) = bounded::<LoadedItem>(self.config.channel_capacity.max(1));
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let dataset = Arc::clone(&self.dataset);
            let stats = Arc::clone(&self.stats);
            let mut rng = self.rng_for(epoch, worker_id as u64);

            let handle = thread::Builder::new()
                .name(format!("clipset-worker-{worker_id}"))
                .spawn(move || {
                    let mut handled = 0usize;
                    for position in work_rx.iter() {
                        let result = dataset.get(position as i64, &mut rng);
                        match &result {
                            Ok(_) => stats.items_loaded.fetch_add(1, Ordering::Relaxed),
                            Err(e) => {
                                warn!(worker_id, position, "extraction failed: {e}");
                                stats.items_failed.fetch_add(1, Ordering::Relaxed)
                            }
                        };
                        handled += 1;
                        if result_tx.send(LoadedItem { position, result }).is_err() {
                            debug!(worker_id, "consumer dropped, worker exiting early");
                            break;
                        }
                    }
                    debug!(worker_id, handled, "worker finished");
                })?;
            workers.push(handle);
        }

        Ok(EpochIter {
            results: Some(result_rx),
            workers,
        })
    }

    fn rng_for(&self, epoch: u64, stream: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(mix_seed(seed, epoch, stream)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Derive an independent per-(epoch, stream) seed from the base seed.
fn mix_seed(seed: u64, epoch: u64, stream: u64) -> u64 {
    let mut z = seed
        ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ stream.wrapping_add(1).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    // splitmix64 finaliser
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Items of one epoch in completion order. Dropping it stops and joins the workers.
pub struct EpochIter {
    results: Option<Receiver<LoadedItem>>,
    workers: Vec<JoinHandle<()>>,
}

impl Iterator for EpochIter {
    type Item = LoadedItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.as_ref()?.recv().ok()
    }
}

impl Drop for EpochIter {
    fn drop(&mut self) {
        // Closing the result channel unblocks any worker waiting to send.
        self.results.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("loader worker panicked");
            }
        }
    }
}
