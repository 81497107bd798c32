//! Metrics accumulators for production and streaming.

use std::ops::AddAssign;
use std::time::Duration;

/// Metrics collected by the JSON production threads.
///
/// Additive: thread- and session-level metrics sum into totals, with the
/// default value as identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductionMetrics {
    /// Time spent producing, summed over threads.
    pub time: Duration,
    /// Number of characters generated.
    pub num_chars: u64,
    /// Number of records generated.
    pub num_jsons: u64,
    /// Number of batches generated.
    pub num_batches: u64,
    /// Number of rejected enqueue attempts while the queue was full.
    pub queue_full: u64,
}

impl AddAssign for ProductionMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.time += rhs.time;
        self.num_chars += rhs.num_chars;
        self.num_jsons += rhs.num_jsons;
        self.num_batches += rhs.num_batches;
        self.queue_full += rhs.queue_full;
    }
}

impl ProductionMetrics {
    /// Records produced per second of summed production time.
    pub fn jsons_per_second(&self) -> f64 {
        if self.time.as_secs_f64() > 0.0 {
            self.num_jsons as f64 / self.time.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Bytes produced per second of summed production time.
    pub fn bytes_per_second(&self) -> f64 {
        if self.time.as_secs_f64() > 0.0 {
            self.num_chars as f64 / self.time.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Log a production summary. `num_threads` scales the summed thread time
    /// back to wall-clock for the rate figures.
    pub fn log(&self, num_threads: usize) {
        let wall = self.time.as_secs_f64() / num_threads.max(1) as f64;
        tracing::info!(
            "Produced {} JSONs in {} batches in {:.4} seconds.",
            self.num_jsons,
            self.num_batches,
            wall
        );
        if wall > 0.0 {
            tracing::info!("  {:.1} JSON/s (avg).", self.num_jsons as f64 / wall);
            tracing::info!(
                "  {:.2} MB/s  (avg).",
                self.num_chars as f64 * 1e-6 / wall
            );
        }
        if self.queue_full > 0 {
            tracing::info!("  {} rejected enqueue attempts.", self.queue_full);
        }
    }
}

/// Metrics collected by the streaming server, accumulated across repeat
/// sessions.
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    /// Number of records sent.
    pub num_messages: u64,
    /// Number of bytes sent.
    pub num_bytes: u64,
    /// Total time spent draining and sending.
    pub time: Duration,
    /// Metrics of the production facilities.
    pub producer: ProductionMetrics,
}

impl AddAssign for StreamMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.num_messages += rhs.num_messages;
        self.num_bytes += rhs.num_bytes;
        self.time += rhs.time;
        self.producer += rhs.producer;
    }
}

impl StreamMetrics {
    /// Log a streaming summary.
    pub fn log(&self, num_threads: usize) {
        let secs = self.time.as_secs_f64();
        tracing::info!("Streamed {} messages in {:.4} seconds.", self.num_messages, secs);
        if secs > 0.0 {
            tracing::info!("  {:.1} messages/second (avg).", self.num_messages as f64 / secs);
            tracing::info!(
                "  {:.2} gigabits/second (avg).",
                self.num_bytes as f64 * 8.0 * 1e-9 / secs
            );
        }
        self.producer.log(num_threads);
    }
}
