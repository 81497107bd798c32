//! Multi-threaded JSON production.
//!
//! A [`Producer`] spawns worker threads that synthesize batches of records
//! from a shared schema and push them onto the bounded [`ProductionQueue`].
//! Work is partitioned as evenly as possible across threads; any remainder
//! goes to thread 0. Each worker reports its own [`ProductionMetrics`]
//! through its join handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::generator::{DocumentGenerator, GeneratorOptions, GeneratorTree};
use crate::metrics::ProductionMetrics;
use crate::queue::{JsonBatch, ProductionQueue, DEFAULT_QUEUE_SIZE};
use crate::schema::Schema;
use crate::writer::JsonWriter;

/// Sleep between retries when the queue rejects an enqueue.
pub(crate) const BACKOFF: Duration = Duration::from_micros(100);

/// Options for the JSON production facility.
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    /// Random generation options.
    pub gen: GeneratorOptions,
    /// The schema to base the records on.
    pub schema: Schema,
    /// Records per batch when batching, total records otherwise.
    pub num_jsons: u64,
    /// Number of batches to produce when batching.
    pub num_batches: u64,
    /// Produce batches of `num_jsons` records instead of one record each.
    pub batching: bool,
    /// Number of production threads to spawn.
    pub num_threads: usize,
    /// Capacity of the production queue.
    pub queue_size: usize,
    /// Whether to echo batches to stdout.
    pub verbose: bool,
    /// Whether to log a summary at the end.
    pub statistics: bool,
}

impl ProducerOptions {
    pub fn new(schema: Schema) -> Self {
        Self {
            gen: GeneratorOptions::default(),
            schema,
            num_jsons: 1,
            num_batches: 1,
            batching: false,
            num_threads: 1,
            queue_size: DEFAULT_QUEUE_SIZE,
            verbose: false,
            statistics: false,
        }
    }

    /// Total number of records a full production run emits.
    pub fn total_jsons(&self) -> u64 {
        if self.batching {
            self.num_batches * self.num_jsons
        } else {
            self.num_jsons
        }
    }

    /// `(total batches, records per batch)` for the run. Without batching
    /// every record is its own batch.
    fn partition(&self) -> (u64, u64) {
        if self.batching {
            (self.num_batches, self.num_jsons)
        } else {
            (self.num_jsons, 1)
        }
    }
}

/// A pool of JSON production threads feeding one queue.
pub struct Producer {
    options: ProducerOptions,
    queue: Arc<ProductionQueue>,
    handles: Vec<JoinHandle<Result<ProductionMetrics>>>,
    started: bool,
}

impl Producer {
    pub fn new(options: ProducerOptions, queue: Arc<ProductionQueue>) -> Self {
        Self {
            options,
            queue,
            handles: Vec::new(),
            started: false,
        }
    }

    /// Spawn the worker threads. Returns immediately; call [`finish`] to
    /// join them and collect metrics.
    ///
    /// Workers stop early when `shutdown` is set while they wait on a full
    /// queue.
    ///
    /// [`finish`]: Producer::finish
    pub fn start(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        if self.started {
            return Err(Error::Generic("Producer already started.".into()));
        }
        self.started = true;

        // Validate the schema once; workers clone the node tree.
        let tree = GeneratorTree::from_schema(&self.options.schema)?;

        let (total_batches, items_per_batch) = self.options.partition();
        let num_threads = self.options.num_threads.max(1);
        let batches_per_thread = total_batches / num_threads as u64;
        let remainder = total_batches % num_threads as u64;

        tracing::debug!("Starting {} JSON producer threads.", num_threads);

        self.handles.reserve(num_threads);
        for thread_id in 0..num_threads {
            let thread_batches = batches_per_thread + if thread_id == 0 { remainder } else { 0 };
            // Each thread offsets the seed by its index so their outputs
            // diverge.
            let mut gen_options = self.options.gen.clone();
            gen_options.seed += thread_id as u64;

            let tree = tree.clone();
            let queue = Arc::clone(&self.queue);
            let shutdown = Arc::clone(&shutdown);

            self.handles.push(thread::spawn(move || {
                production_thread(
                    thread_id,
                    tree,
                    gen_options,
                    thread_batches,
                    items_per_batch,
                    &queue,
                    &shutdown,
                )
            }));
        }

        Ok(())
    }

    /// Join all worker threads and return their summed metrics.
    pub fn finish(&mut self) -> Result<ProductionMetrics> {
        if !self.started {
            return Err(Error::Generic("Producer was never started.".into()));
        }
        if self.handles.is_empty() {
            return Err(Error::Generic("Producer already finished.".into()));
        }

        let mut metrics = ProductionMetrics::default();
        for handle in self.handles.drain(..) {
            let thread_metrics = handle
                .join()
                .map_err(|_| Error::Generic("Producer thread panicked.".into()))??;
            metrics += thread_metrics;
        }

        if self.options.statistics {
            metrics.log(self.options.num_threads);
        }

        Ok(metrics)
    }
}

/// One production worker: writes `num_batches` batches of `num_items`
/// records each into the queue.
fn production_thread(
    thread_id: usize,
    tree: GeneratorTree,
    gen_options: GeneratorOptions,
    num_batches: u64,
    num_items: u64,
    queue: &ProductionQueue,
    shutdown: &AtomicBool,
) -> Result<ProductionMetrics> {
    let start = Instant::now();
    let mut metrics = ProductionMetrics::default();

    let mut generator = DocumentGenerator::new(tree, gen_options.seed);
    let writer = JsonWriter::from_options(&gen_options);
    // Reusable text buffer; each batch copies out of it.
    let mut buffer: Vec<u8> = Vec::new();

    for _ in 0..num_batches {
        buffer.clear();
        for _ in 0..num_items {
            let value = generator.generate();
            writer.write(&value, &mut buffer)?;
        }

        metrics.num_chars += buffer.len() as u64;
        let mut batch = JsonBatch {
            data: buffer.clone(),
            num_jsons: num_items,
        };

        loop {
            match queue.try_enqueue(batch) {
                Ok(()) => break,
                Err(rejected) => {
                    metrics.queue_full += 1;
                    if shutdown.load(Ordering::Relaxed) {
                        tracing::debug!("Producer thread {} interrupted.", thread_id);
                        metrics.time = start.elapsed();
                        return Ok(metrics);
                    }
                    batch = rejected;
                    thread::sleep(BACKOFF);
                }
            }
        }

        metrics.num_jsons += num_items;
        metrics.num_batches += 1;
    }

    tracing::debug!("Producer thread {} done.", thread_id);
    metrics.time = start.elapsed();
    Ok(metrics)
}
