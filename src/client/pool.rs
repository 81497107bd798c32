//! Shared pool of receive buffers.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use super::buffer::JsonBuffer;
use crate::error::{Error, Result};

/// A fixed set of lockable [`JsonBuffer`]s shared between the receiving
/// client and downstream consumer threads.
///
/// Each buffer lives inside its own mutex, so a buffer and its lock are one
/// entity and can never be re-paired. Acquisition is non-blocking and always
/// scans from index 0, which biases toward lower indices; that is acceptable
/// as long as consumers eventually reset the buffers they drain.
///
/// Consumer contract: acquire with [`try_acquire_filled`], re-check
/// `num_jsons()` under the lock, process the contents, then `reset()` and
/// release. The emptiness observed before locking is only a hint.
///
/// [`try_acquire_filled`]: BufferPool::try_acquire_filled
#[derive(Clone)]
pub struct BufferPool {
    entries: Vec<Arc<Mutex<JsonBuffer>>>,
}

impl BufferPool {
    /// Allocate `num_buffers` buffers of `capacity` bytes each.
    pub fn new(num_buffers: usize, capacity: usize) -> Result<Self> {
        if num_buffers == 0 {
            return Err(Error::Client("Buffer pool cannot be empty.".into()));
        }
        let entries = (0..num_buffers)
            .map(|_| Ok(Arc::new(Mutex::new(JsonBuffer::with_capacity(capacity)?))))
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct access to an entry, for consumers that manage their own
    /// locking pattern.
    pub fn entry(&self, index: usize) -> &Arc<Mutex<JsonBuffer>> {
        &self.entries[index]
    }

    /// Try to lock an empty buffer, scanning from index 0. Returns the index
    /// and the held guard, or `None` when every buffer is busy or full.
    pub fn try_acquire_empty(&self) -> Option<(usize, MutexGuard<'_, JsonBuffer>)> {
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(guard) = entry.try_lock() {
                if guard.is_empty() {
                    return Some((index, guard));
                }
            }
        }
        None
    }

    /// Try to lock a buffer holding at least one record, scanning from
    /// index 0.
    pub fn try_acquire_filled(&self) -> Option<(usize, MutexGuard<'_, JsonBuffer>)> {
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(guard) = entry.try_lock() {
                if guard.num_jsons() > 0 {
                    return Some((index, guard));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(BufferPool::new(0, 64).is_err());
    }

    #[test]
    fn test_acquire_prefers_lowest_index() {
        let pool = BufferPool::new(3, 64).unwrap();
        let (index, _guard) = pool.try_acquire_empty().unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_acquire_skips_locked_buffers() {
        let pool = BufferPool::new(2, 64).unwrap();
        let _held = pool.entry(0).lock();
        let (index, _guard) = pool.try_acquire_empty().unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_acquire_skips_filled_buffers() {
        let pool = BufferPool::new(2, 64).unwrap();
        {
            let mut guard = pool.entry(0).lock();
            guard.data_mut()[..3].copy_from_slice(b"{}\n");
            guard.scan(3, 0);
            guard.set_size(3).unwrap();
        }

        let (index, _guard) = pool.try_acquire_empty().unwrap();
        assert_eq!(index, 1);

        let (filled, guard) = pool.try_acquire_filled().unwrap();
        assert_eq!(filled, 0);
        assert_eq!(guard.num_jsons(), 1);
    }

    #[test]
    fn test_none_when_all_busy() {
        let pool = BufferPool::new(1, 64).unwrap();
        let _held = pool.entry(0).lock();
        assert!(pool.try_acquire_empty().is_none());
        assert!(pool.try_acquire_filled().is_none());
    }
}
