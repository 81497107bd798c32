//! The streaming server: accepts one consumer per session and drains the
//! production queue into its socket.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::metrics::StreamMetrics;
use crate::producer::{Producer, ProducerOptions};
use crate::queue::ProductionQueue;
use crate::shutdown::install_interrupt_handler;

/// Options for the streaming server.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// The port to listen on.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: crate::client::DEFAULT_PORT,
        }
    }
}

/// Options for repeated streaming sessions.
#[derive(Debug, Clone)]
pub struct RepeatOptions {
    /// Number of sessions to run.
    pub times: u64,
    /// Pause between sessions in milliseconds.
    pub interval_ms: u64,
}

impl RepeatOptions {
    /// Fixed amount added to the generator seed before every following
    /// session, so repeated sessions produce distinct content. Part of the
    /// interface: consumers may rely on it to reproduce a given session.
    pub const SEED_INCREMENT: u64 = 42;
}

impl Default for RepeatOptions {
    fn default() -> Self {
        Self {
            times: 1,
            interval_ms: 0,
        }
    }
}

/// A TCP server streaming produced JSON records to one consumer at a time.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind and listen on `0.0.0.0:port`.
    pub fn create(options: &ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", options.port))
            .map_err(|e| Error::Server(format!("Unable to bind port {}: {e}", options.port)))?;
        tracing::info!("Listening on port {}...", options.port);
        Ok(Self { listener })
    }

    /// The bound address; useful when the server was created on port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::Server(e.to_string()))
    }

    /// Run `repeat_opts.times` sessions, each accepting one consumer and
    /// streaming a full production run to it. Metrics accumulate across
    /// sessions into `metrics`.
    ///
    /// Sessions after the first add [`RepeatOptions::SEED_INCREMENT`] to the
    /// generator seed. The first socket failure ends the run with an error;
    /// repeat mode does not mask per-session errors.
    pub fn send_jsons(
        &self,
        producer_opts: &ProducerOptions,
        repeat_opts: &RepeatOptions,
        metrics: &mut StreamMetrics,
    ) -> Result<()> {
        let shutdown = Arc::new(AtomicBool::new(false));
        install_interrupt_handler(&shutdown);

        let mut options = producer_opts.clone();

        if repeat_opts.times > 1 {
            tracing::info!("Repeating {} times.", repeat_opts.times);
            tracing::info!(
                "  Interval: {} ms (+ production time).",
                repeat_opts.interval_ms
            );
        }

        let mut color = false;

        for session in 0..repeat_opts.times {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            tracing::info!("Waiting for client to connect...");
            let (mut client, peer) = self
                .listener
                .accept()
                .map_err(|e| Error::Server(format!("Accept failed: {e}")))?;
            tracing::info!("Client connected: {peer}");

            let queue = Arc::new(ProductionQueue::new(options.queue_size));
            let mut producer = Producer::new(options.clone(), Arc::clone(&queue));
            producer.start(Arc::clone(&shutdown))?;

            let mut session_metrics = StreamMetrics::default();
            let timer = Instant::now();

            let result = drain_session(
                &mut client,
                &queue,
                &options,
                &shutdown,
                &mut color,
                &mut session_metrics,
            );

            // Stop and join the producer before propagating any error, so
            // its threads never outlive the session.
            if let Err(err) = result {
                shutdown.store(true, Ordering::Relaxed);
                let _ = producer.finish();
                return Err(err);
            }
            session_metrics.producer = producer.finish()?;
            session_metrics.time = timer.elapsed();
            *metrics += session_metrics;

            tracing::debug!("Session {} finished.", session);
            thread::sleep(Duration::from_millis(repeat_opts.interval_ms));

            // Repeated sessions produce distinct content.
            options.gen.seed += RepeatOptions::SEED_INCREMENT;
        }

        Ok(())
    }
}

/// Drain one full production run into the client socket.
fn drain_session(
    client: &mut TcpStream,
    queue: &ProductionQueue,
    options: &ProducerOptions,
    shutdown: &AtomicBool,
    color: &mut bool,
    metrics: &mut StreamMetrics,
) -> Result<()> {
    let total = options.total_jsons();
    let log_every = (total / 10).max(1);

    while metrics.num_messages < total && !shutdown.load(Ordering::Relaxed) {
        let batch = match queue.try_dequeue() {
            Some(batch) => batch,
            None => {
                thread::sleep(dequeue_backoff());
                // The consumer may have gone away while we wait for the
                // producers to catch up.
                if !peer_alive(client) {
                    shutdown.store(true, Ordering::Relaxed);
                    return Err(Error::Server("Client socket error.".into()));
                }
                continue;
            }
        };

        client.write_all(&batch.data).map_err(|e| {
            Error::Server(format!(
                "Socket not valid after send: {}",
                e.raw_os_error().unwrap_or(-1)
            ))
        })?;

        if options.verbose {
            echo_batch(&batch.data, color);
        }

        metrics.num_messages += batch.num_jsons;
        metrics.num_bytes += batch.data.len() as u64;

        if metrics.num_messages % log_every < batch.num_jsons {
            tracing::info!(
                "{:.0}% | {}/{}",
                metrics.num_messages as f64 / total as f64 * 100.0,
                metrics.num_messages,
                total
            );
        }
    }

    Ok(())
}

/// Sleep used while the queue is empty. Debug builds slow this down to keep
/// their logs readable.
fn dequeue_backoff() -> Duration {
    if cfg!(debug_assertions) {
        Duration::from_millis(500)
    } else {
        Duration::from_micros(100)
    }
}

/// Non-destructive liveness check on the peer socket.
fn peer_alive(stream: &TcpStream) -> bool {
    let mut probe = [0u8; 1];
    if stream.set_nonblocking(true).is_err() {
        return false;
    }
    let alive = match stream.peek(&mut probe) {
        Ok(0) => false,
        Ok(_) => true,
        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => true,
        Err(_) => false,
    };
    let _ = stream.set_nonblocking(false);
    alive
}

/// Echo a batch to stdout, alternating colors per batch.
fn echo_batch(data: &[u8], color: &mut bool) {
    // Strip the final terminator; println adds its own newline.
    let text = String::from_utf8_lossy(&data[..data.len().saturating_sub(1)]);
    let mut stdout = io::stdout().lock();
    let _ = writeln!(
        stdout,
        "{}{}\x1b[39m",
        if *color { "\x1b[34m" } else { "\x1b[35m" },
        text
    );
    *color = !*color;
}

/// Create a server and stream a full production run, logging a summary when
/// `statistics` is enabled.
pub fn run_server(
    server_opts: &ServerOptions,
    producer_opts: &ProducerOptions,
    repeat_opts: &RepeatOptions,
    statistics: bool,
) -> Result<()> {
    tracing::info!("Starting server...");
    let server = Server::create(server_opts)?;

    let mut metrics = StreamMetrics::default();
    server.send_jsons(producer_opts, repeat_opts, &mut metrics)?;

    if statistics {
        metrics.log(producer_opts.num_threads);
    }

    tracing::info!("Server shutting down...");
    Ok(())
}
