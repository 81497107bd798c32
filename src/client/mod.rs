//! Stream consumers: TCP clients that receive newline-delimited JSON and
//! hand it to downstream threads.
//!
//! Two variants exist. The [`BufferingClient`] fills pre-allocated shared
//! buffers that consumers scan in place; the [`QueueingClient`] copies each
//! record into a blocking queue. Both recover dense per-record sequence
//! numbers by scanning for the newline delimiter.

mod buffer;
mod buffering;
mod pool;
mod queueing;

pub use buffer::{JsonBuffer, SeqRange};
pub use buffering::BufferingClient;
pub use pool::BufferPool;
pub use queueing::{record_queue, JsonRecord, QueueingClient, RecordReceiver, RecordSender};

use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default TCP receive buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 10197;

/// Sequence number of a received record.
pub type Seq = u64;

/// Sleep between retries while waiting for a free buffer.
pub(crate) const BACKOFF: Duration = Duration::from_micros(100);

/// Basic options for client implementations.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The hostname to connect to.
    pub host: String,
    /// The port to connect to.
    pub port: u16,
    /// The sequence number of the first record received.
    pub seq: Seq,
    /// Receive buffer size for clients that allocate their own buffer.
    pub buffer_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            seq: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

pub(crate) fn connect(options: &ClientOptions) -> Result<TcpStream> {
    let endpoint = format!("{}:{}", options.host, options.port);
    tracing::debug!("Client connecting to {}...", endpoint);
    TcpStream::connect(&endpoint)
        .map_err(|e| Error::Client(format!("Unable to connect to server: {e}")))
}

/// The OS error code of an I/O error, for status reporting.
pub(crate) fn status_code(e: &std::io::Error) -> i32 {
    e.raw_os_error().unwrap_or(-1)
}
