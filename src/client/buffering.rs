//! The buffering client: receives raw TCP data into a pool of shared
//! buffers that downstream threads scan in place.

use std::io::Read;
use std::net::TcpStream;
use std::thread;
use std::time::Instant;

use super::pool::BufferPool;
use super::{connect, status_code, ClientOptions, Seq, BACKOFF, DEFAULT_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::latency::LatencyTracker;

/// A client that receives newline-delimited JSON into lockable buffers.
///
/// Each receive iteration locks an empty buffer from the pool, carries over
/// any unterminated tail from the previous buffer, fills the rest from the
/// socket, scans for record boundaries and assigns contiguous sequence
/// numbers across buffers. Releasing the lock hands the buffer to downstream
/// consumers; a consumer processes the contents and calls `reset()` to make
/// the buffer eligible again.
pub struct BufferingClient {
    stream: TcpStream,
    pool: BufferPool,
    seq: Seq,
    jsons_received: u64,
    bytes_received: u64,
}

impl BufferingClient {
    /// Connect to the server and prepare to receive into `pool`.
    pub fn connect(options: &ClientOptions, pool: BufferPool) -> Result<Self> {
        let stream = connect(options)?;
        Ok(Self {
            stream,
            pool,
            seq: options.seq,
            jsons_received: 0,
            bytes_received: 0,
        })
    }

    /// Receive records until the server disconnects.
    ///
    /// Returns `Ok(())` on a clean disconnect. A tracker, when given,
    /// records the receive time at stage 0 for sampled sequence numbers.
    pub fn receive(&mut self, mut tracker: Option<&mut LatencyTracker>) -> Result<()> {
        // Unterminated tail bytes carried from the previous buffer. The
        // spill never grows: a record larger than this region is an error.
        let mut spill = vec![0u8; DEFAULT_BUFFER_SIZE].into_boxed_slice();
        let mut remaining: usize = 0;

        loop {
            let Some((_index, mut buffer)) = self.pool.try_acquire_empty() else {
                thread::sleep(BACKOFF);
                continue;
            };

            // Carry the spill into the start of the fresh buffer. A tail
            // that leaves no room to receive can never complete.
            if remaining >= buffer.capacity() {
                return Err(Error::Client("Record exceeds buffer capacity.".into()));
            }
            if remaining > 0 {
                buffer.data_mut()[..remaining].copy_from_slice(&spill[..remaining]);
            }

            let received = match self.stream.read(&mut buffer.data_mut()[remaining..]) {
                Ok(n) => n,
                Err(e) => {
                    return Err(Error::Client(format!(
                        "Server error. Status: {}",
                        status_code(&e)
                    )))
                }
            };
            let recv_time = Instant::now();
            buffer.set_recv_time(recv_time);
            self.bytes_received += received as u64;

            let scan_size = remaining + received;
            let (count, tail) = buffer.scan(scan_size, self.seq);

            if let Some(tracker) = tracker.as_deref_mut() {
                for seq in self.seq..self.seq + count {
                    tracker.put(seq, 0, recv_time);
                }
            }

            self.seq += count;
            self.jsons_received += count;
            remaining = tail;
            buffer.set_size(scan_size - remaining)?;

            // Copy the new unterminated tail out before the buffer is
            // released to consumers.
            if remaining > 0 {
                if remaining > spill.len() {
                    return Err(Error::Client("Record exceeds buffer capacity.".into()));
                }
                let tail_start = buffer.size();
                spill[..remaining]
                    .copy_from_slice(&buffer.raw()[tail_start..tail_start + remaining]);
            }

            if received == 0 {
                // The server is done sending; dropping the guard releases
                // the final buffer.
                tracing::debug!("Server has cleanly disconnected.");
                return Ok(());
            }

            // Release the buffer for downstream consumption.
            drop(buffer);
        }
    }

    /// Number of records received so far.
    pub fn jsons_received(&self) -> u64 {
        self.jsons_received
    }

    /// Number of bytes received so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// The sequence number the next record will get.
    pub fn seq(&self) -> Seq {
        self.seq
    }
}
