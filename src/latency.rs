//! Latency tracking at sampled sequence numbers.

use std::time::Instant;

use crate::error::{Error, Result};

/// Fixed-capacity ring of timestamps indexed by sampled sequence number and
/// pipeline stage.
///
/// Only sequence numbers divisible by the sample interval are stored. The
/// slot for a sample wraps around once `seq / sample_interval` exceeds the
/// number of samples, so the tracker never grows.
pub struct LatencyTracker {
    num_samples: usize,
    num_stages: usize,
    sample_interval: u64,
    points: Vec<Option<Instant>>,
}

impl LatencyTracker {
    /// Create a tracker for `num_samples` samples of `num_stages` stages,
    /// sampling every `sample_interval`-th sequence number.
    pub fn new(num_samples: usize, num_stages: usize, sample_interval: u64) -> Result<Self> {
        if num_samples == 0 || num_stages == 0 || sample_interval == 0 {
            return Err(Error::Generic(
                "Latency tracker dimensions must be non-zero.".into(),
            ));
        }
        Ok(Self {
            num_samples,
            num_stages,
            sample_interval,
            points: vec![None; num_samples * num_stages],
        })
    }

    /// Store `value` for `seq` at `stage` if `seq` falls on the sample
    /// interval. Returns whether the value was stored.
    ///
    /// Panics if `stage` is out of bounds; the stage count is a construction
    /// parameter, not runtime input.
    pub fn put(&mut self, seq: u64, stage: usize, value: Instant) -> bool {
        assert!(stage < self.num_stages, "stage index out of bounds");
        if seq % self.sample_interval != 0 {
            return false;
        }
        let sample = ((seq / self.sample_interval) as usize) % self.num_samples;
        self.points[sample * self.num_stages + stage] = Some(value);
        true
    }

    /// Return the time point stored for `index` at `stage`.
    pub fn get(&self, index: usize, stage: usize) -> Result<Instant> {
        if stage >= self.num_stages {
            return Err(Error::Generic("Stage index out of bounds.".into()));
        }
        if index >= self.num_samples {
            return Err(Error::Generic("Sample index out of bounds.".into()));
        }
        self.points[index * self.num_stages + stage]
            .ok_or_else(|| Error::Generic("No sample recorded at this index.".into()))
    }

    /// Seconds between `stage - 1` and `stage` for the sample at `index`.
    pub fn interval(&self, index: usize, stage: usize) -> Result<f64> {
        if stage == 0 {
            return Err(Error::Generic(
                "Stage must be > 0 to obtain an interval to the previous stage.".into(),
            ));
        }
        let end = self.get(index, stage)?;
        let start = self.get(index, stage - 1)?;
        Ok(end.duration_since(start).as_secs_f64())
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn num_stages(&self) -> usize {
        self.num_stages
    }

    pub fn sample_interval(&self) -> u64 {
        self.sample_interval
    }
}
