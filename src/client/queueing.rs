//! The queueing client: receives raw TCP data and enqueues each record as
//! an owned copy into a blocking queue.

use memchr::memchr;
use std::io::Read;
use std::net::TcpStream;
use std::time::Instant;

use super::{connect, status_code, ClientOptions, Seq};
use crate::error::{Error, Result};
use crate::latency::LatencyTracker;

/// One received JSON record, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonRecord {
    /// Sequence number assigned in receive order.
    pub seq: Seq,
    /// The record text.
    pub data: String,
}

/// Sending half of the record queue.
pub type RecordSender = crossbeam_channel::Sender<JsonRecord>;
/// Receiving half of the record queue; blocking and multi-consumer.
pub type RecordReceiver = crossbeam_channel::Receiver<JsonRecord>;

/// Create an unbounded blocking record queue.
pub fn record_queue() -> (RecordSender, RecordReceiver) {
    crossbeam_channel::unbounded()
}

/// A client that copies every received record into a blocking queue.
pub struct QueueingClient {
    stream: TcpStream,
    queue: RecordSender,
    buffer: Box<[u8]>,
    seq: Seq,
    jsons_received: u64,
    bytes_received: u64,
}

impl QueueingClient {
    /// Connect to the server; received records go into `queue`.
    pub fn connect(options: &ClientOptions, queue: RecordSender) -> Result<Self> {
        if options.buffer_size == 0 {
            return Err(Error::Client("Receive buffer size cannot be 0.".into()));
        }
        let stream = connect(options)?;
        Ok(Self {
            stream,
            queue,
            buffer: vec![0u8; options.buffer_size].into_boxed_slice(),
            seq: options.seq,
            jsons_received: 0,
            bytes_received: 0,
        })
    }

    /// Receive records until the server disconnects.
    ///
    /// Returns `Ok(())` on a clean disconnect. A tracker, when given,
    /// records the receive time at stage 0 and the pre-queue time at
    /// stage 1 for sampled sequence numbers.
    pub fn receive(&mut self, mut tracker: Option<&mut LatencyTracker>) -> Result<()> {
        // Reusable assembly buffer for the record under construction; a
        // record may span several receives.
        let mut record: Vec<u8> = Vec::new();

        loop {
            let received = match self.stream.read(&mut self.buffer) {
                Ok(n) => n,
                Err(e) => {
                    return Err(Error::Client(format!(
                        "Server error. Status: {}",
                        status_code(&e)
                    )))
                }
            };
            let receive_time = Instant::now();
            self.bytes_received += received as u64;

            if received == 0 {
                tracing::debug!("Server has cleanly disconnected.");
                return Ok(());
            }

            let mut window = &self.buffer[..received];
            while let Some(newline) = memchr(b'\n', window) {
                record.extend_from_slice(&window[..newline]);
                window = &window[newline + 1..];

                // Consecutive newlines produce empty segments; skip them.
                if record.is_empty() {
                    continue;
                }

                let data = String::from_utf8(std::mem::take(&mut record))
                    .map_err(|_| Error::Client("Received record is not valid UTF-8.".into()))?;

                let pre_queue_time = Instant::now();
                self.queue
                    .send(JsonRecord {
                        seq: self.seq,
                        data,
                    })
                    .map_err(|_| Error::Client("Record queue disconnected.".into()))?;

                if let Some(tracker) = tracker.as_deref_mut() {
                    tracker.put(self.seq, 0, receive_time);
                    tracker.put(self.seq, 1, pre_queue_time);
                }

                self.seq += 1;
                self.jsons_received += 1;
            }
            // Whatever is left becomes the start of the next record.
            record.extend_from_slice(window);
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
}
