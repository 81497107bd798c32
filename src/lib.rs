//! jsonspout
//!
//! A schema-driven generator and TCP streaming server for newline-delimited
//! JSON, with companion clients for consuming the stream.
//!
//! # Pipeline
//!
//! ```text
//! producer threads ──▶ ProductionQueue ──▶ Server ──▶ TCP
//!                                                      │
//!                        ┌─────────────────────────────┘
//!                        ▼
//!            BufferingClient ──▶ shared JsonBuffers ──▶ consumer threads
//!            QueueingClient  ──▶ blocking record queue
//! ```
//!
//! Records are pseudo-random JSON documents derived from a typed [`Schema`];
//! generation is deterministic for a given seed. The newline is the sole
//! record delimiter on the wire, so record values are never serialized with
//! raw newlines inside them. Clients assign dense, contiguous sequence
//! numbers in receive order and can feed a [`LatencyTracker`] at sampled
//! sequence numbers.
//!
//! # CLI Usage
//!
//! ```bash
//! # Write 16 records to a file
//! jsonspout file --schema schema.yaml -n 16 --output out.jsonl
//!
//! # Stream batches to one TCP consumer
//! jsonspout stream --schema schema.yaml -n 1024 --num-batches 64 --batch
//! ```

pub mod client;
pub mod error;
pub mod file;
pub mod generator;
pub mod latency;
pub mod metrics;
pub mod producer;
pub mod queue;
pub mod schema;
pub mod server;
pub mod shutdown;
pub mod writer;

pub use client::{
    record_queue, BufferPool, BufferingClient, ClientOptions, JsonBuffer, JsonRecord,
    QueueingClient, RecordReceiver, RecordSender, Seq, SeqRange, DEFAULT_BUFFER_SIZE,
    DEFAULT_PORT,
};
pub use error::{Error, Result};
pub use file::{run_file, FileOptions};
pub use generator::{DocumentGenerator, GeneratorOptions, GeneratorTree};
pub use latency::LatencyTracker;
pub use metrics::{ProductionMetrics, StreamMetrics};
pub use producer::{Producer, ProducerOptions};
pub use queue::{JsonBatch, ProductionQueue, DEFAULT_QUEUE_SIZE};
pub use schema::{Field, FieldType, Schema};
pub use server::{run_server, RepeatOptions, Server, ServerOptions};
pub use writer::JsonWriter;
