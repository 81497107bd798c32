//! File output mode: drain a production run into a file and/or a writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::error::Result;
use crate::metrics::ProductionMetrics;
use crate::producer::{Producer, ProducerOptions, BACKOFF};
use crate::queue::ProductionQueue;

/// Options for the file subcommand.
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Production options.
    pub production: ProducerOptions,
    /// The output file path; stdout-only when absent.
    pub out_path: Option<PathBuf>,
}

/// Produce records and write them to the configured file.
///
/// Batches are echoed to `echo` when verbose mode is on or no output path
/// is given, byte-for-byte identical to the file contents.
pub fn run_file(options: &FileOptions, echo: &mut dyn Write) -> Result<()> {
    let producer_opts = &options.production;

    let mut file = match &options.out_path {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let echo_enabled = producer_opts.verbose || options.out_path.is_none();

    let queue = Arc::new(ProductionQueue::new(producer_opts.queue_size));
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut producer = Producer::new(producer_opts.clone(), Arc::clone(&queue));
    producer.start(Arc::clone(&shutdown))?;

    let start = Instant::now();
    let total = producer_opts.total_jsons();
    let mut written: u64 = 0;
    let mut bytes: u64 = 0;

    while written < total {
        let Some(batch) = queue.try_dequeue() else {
            thread::sleep(BACKOFF);
            continue;
        };
        if let Some(file) = file.as_mut() {
            file.write_all(&batch.data)?;
        }
        if echo_enabled {
            echo.write_all(&batch.data)?;
        }
        written += batch.num_jsons;
        bytes += batch.data.len() as u64;
    }

    if let Some(mut file) = file.take() {
        file.flush()?;
    }

    let metrics: ProductionMetrics = producer.finish()?;
    if producer_opts.statistics {
        let secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Wrote {} JSONs, {} bytes in {:.4} seconds ({:.1} JSON/s).",
            written,
            bytes,
            secs,
            if secs > 0.0 { written as f64 / secs } else { 0.0 }
        );
        metrics.log(producer_opts.num_threads);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType, Schema};
    use tempfile::TempDir;

    fn uint_schema() -> Schema {
        Schema::from_fields(vec![Field::new(
            "test",
            FieldType::Uint64 {
                min: None,
                max: None,
            },
        )])
        .unwrap()
    }

    #[test]
    fn test_file_output_matches_echo() {
        let mut production = ProducerOptions::new(uint_schema());
        production.num_jsons = 16;
        production.verbose = true;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");
        let options = FileOptions {
            production,
            out_path: Some(path.clone()),
        };

        let mut echoed = Vec::new();
        run_file(&options, &mut echoed).unwrap();

        let newlines = echoed.iter().filter(|&&b| b == b'\n').count();
        assert_eq!(newlines, 16);

        let written = std::fs::read(&path).unwrap();
        assert_eq!(echoed, written);
    }

    #[test]
    fn test_pretty_file_exact_output() {
        let schema = Schema::from_fields(vec![
            Field::new("a", FieldType::Null),
            Field::new("b", FieldType::Null),
        ])
        .unwrap();
        let mut production = ProducerOptions::new(schema);
        production.num_jsons = 1;
        production.gen.pretty = true;
        production.verbose = true;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pretty.json");
        let options = FileOptions {
            production,
            out_path: Some(path),
        };

        let mut echoed = Vec::new();
        run_file(&options, &mut echoed).unwrap();

        assert_eq!(
            String::from_utf8(echoed).unwrap(),
            "{\n    \"a\": null,\n    \"b\": null\n}\n"
        );
    }

    #[test]
    fn test_no_path_echoes_without_verbose() {
        let mut production = ProducerOptions::new(uint_schema());
        production.num_jsons = 2;

        let options = FileOptions {
            production,
            out_path: None,
        };

        let mut echoed = Vec::new();
        run_file(&options, &mut echoed).unwrap();
        assert_eq!(echoed.iter().filter(|&&b| b == b'\n').count(), 2);
    }
}
