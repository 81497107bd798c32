//! Bounded queue carrying produced batches from worker threads to the
//! single drain site (server or file writer).

use crossbeam_queue::ArrayQueue;

/// Default capacity of the production queue.
pub const DEFAULT_QUEUE_SIZE: usize = 32;

/// A batch of newline-terminated JSON records produced by one worker thread.
///
/// The text is consumed exactly once by whoever dequeues it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBatch {
    /// The batch text: `num_jsons` records, each followed by the terminator.
    pub data: Vec<u8>,
    /// Number of records in the batch.
    pub num_jsons: u64,
}

/// Bounded lock-free multi-producer queue of [`JsonBatch`]es.
///
/// Both operations are non-blocking and may fail spuriously under
/// contention; callers retry with a short sleep.
pub struct ProductionQueue {
    inner: ArrayQueue<JsonBatch>,
}

impl ProductionQueue {
    /// Create a queue holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Try to enqueue a batch; returns the batch back when the queue is full.
    pub fn try_enqueue(&self, batch: JsonBatch) -> Result<(), JsonBatch> {
        self.inner.push(batch)
    }

    /// Try to dequeue a batch; `None` when the queue is empty.
    pub fn try_dequeue(&self) -> Option<JsonBatch> {
        self.inner.pop()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for ProductionQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SIZE)
    }
}
