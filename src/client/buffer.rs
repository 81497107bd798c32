//! Receive buffers for the buffering client.

use memchr::memchr_iter;
use std::time::Instant;

use super::Seq;
use crate::error::{Error, Result};

/// Inclusive range of the sequence numbers contained in a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqRange {
    /// The first sequence number in the range.
    pub first: Seq,
    /// The last sequence number in the range.
    pub last: Seq,
}

/// A pre-allocated byte buffer that receives raw TCP data and tracks the
/// newline-delimited records inside it.
///
/// The capacity is fixed at creation. `size` counts the valid bytes, which
/// always end on a record boundary; the unterminated tail after the last
/// newline is carried elsewhere by the client. The record count is tracked
/// explicitly so an empty buffer does not derive it from the neutral range.
pub struct JsonBuffer {
    data: Box<[u8]>,
    size: usize,
    num_records: u64,
    range: SeqRange,
    recv_time: Option<Instant>,
}

impl JsonBuffer {
    /// Allocate a buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Client("Buffer capacity cannot be 0.".into()));
        }
        Ok(Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            size: 0,
            num_records: 0,
            range: SeqRange::default(),
            recv_time: None,
        })
    }

    /// The allocated capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The valid bytes: complete newline-terminated records.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// The whole allocated region, for receiving into.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read access to the whole allocated region, including bytes past
    /// `size` that belong to an unterminated trailing record.
    pub(crate) fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Scan the first `num_bytes` bytes for newline-delimited records.
    ///
    /// Counts the non-empty segments that end in a newline; the tail after
    /// the last newline (or everything, when there is none) is not counted.
    /// Assigns this buffer the sequence range `[seq, seq + count - 1]`, or
    /// the neutral range when nothing was counted. Returns
    /// `(count, remaining)` where `remaining` is the length of the
    /// unterminated tail.
    pub fn scan(&mut self, num_bytes: usize, seq: Seq) -> (u64, usize) {
        debug_assert!(num_bytes <= self.capacity());
        let window = &self.data[..num_bytes];

        let mut count: u64 = 0;
        let mut segment_start = 0usize;
        for newline in memchr_iter(b'\n', window) {
            if newline > segment_start {
                count += 1;
            }
            segment_start = newline + 1;
        }
        let remaining = num_bytes - segment_start;

        self.num_records = count;
        self.range = if count > 0 {
            SeqRange {
                first: seq,
                last: seq + count - 1,
            }
        } else {
            SeqRange::default()
        };

        (count, remaining)
    }

    /// Set the number of valid bytes, bounds-checked against the capacity.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if size > self.capacity() {
            return Err(Error::Client(
                "Cannot set buffer size larger than allocated capacity.".into(),
            ));
        }
        self.size = size;
        Ok(())
    }

    /// The sequence range of the contained records. Neutral when empty.
    pub fn range(&self) -> SeqRange {
        self.range
    }

    /// Number of complete records in the buffer.
    pub fn num_jsons(&self) -> u64 {
        self.num_records
    }

    /// When the contents were received.
    pub fn recv_time(&self) -> Option<Instant> {
        self.recv_time
    }

    pub(crate) fn set_recv_time(&mut self, time: Instant) {
        self.recv_time = Some(time);
    }

    /// Clear the buffer for reuse: size zero, no records, neutral range.
    pub fn reset(&mut self) {
        self.size = 0;
        self.num_records = 0;
        self.range = SeqRange::default();
        self.recv_time = None;
    }
}
