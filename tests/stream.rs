//! End-to-end streaming tests: a real server on an OS-assigned port,
//! draining into real clients over localhost TCP.

use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use jsonspout::{
    record_queue, BufferPool, BufferingClient, ClientOptions, Field, FieldType, LatencyTracker,
    ProducerOptions, RepeatOptions, Schema, SeqRange, Server, ServerOptions, StreamMetrics,
};

fn digit_schema() -> Schema {
    Schema::from_fields(vec![Field::new(
        "test",
        FieldType::Uint64 {
            min: Some(0),
            max: Some(9),
        },
    )])
    .unwrap()
}

fn client_options(port: u16) -> ClientOptions {
    ClientOptions {
        host: "127.0.0.1".to_string(),
        port,
        seq: 0,
        buffer_size: 64 * 1024,
    }
}

/// Start a server streaming `options` in a background thread; returns the
/// port and the join handle.
fn spawn_server(
    options: ProducerOptions,
    repeat: RepeatOptions,
) -> (u16, thread::JoinHandle<jsonspout::Result<StreamMetrics>>) {
    let server = Server::create(&ServerOptions { port: 0 }).unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let mut metrics = StreamMetrics::default();
        server.send_jsons(&options, &repeat, &mut metrics)?;
        Ok(metrics)
    });
    (port, handle)
}

#[test]
fn test_single_record_to_queueing_client() {
    let mut options = ProducerOptions::new(digit_schema());
    options.num_jsons = 1;
    options.num_batches = 1;

    let (port, server) = spawn_server(options, RepeatOptions::default());

    let (sender, receiver) = record_queue();
    let mut client = jsonspout::QueueingClient::connect(&client_options(port), sender).unwrap();
    let mut tracker = LatencyTracker::new(8, 2, 1).unwrap();
    client.receive(Some(&mut tracker)).unwrap();

    let records: Vec<_> = receiver.try_iter().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].seq, 0);
    assert!(records[0].data.starts_with("{\"test\":"));
    assert!(!records[0].data.ends_with('\n'));

    // Both stages were sampled for seq 0, in order.
    assert!(tracker.interval(0, 1).unwrap() >= 0.0);

    let metrics = server.join().unwrap().unwrap();
    assert_eq!(metrics.num_messages, 1);
}

#[test]
fn test_single_buffer_consumer_roundtrip() {
    let mut options = ProducerOptions::new(digit_schema());
    options.num_jsons = 1;
    options.num_batches = 1;

    let (port, server) = spawn_server(options, RepeatOptions::default());

    let pool = BufferPool::new(1, 64 * 1024).unwrap();
    let consumer_pool = pool.clone();
    let consumer = thread::spawn(move || {
        // Drain exactly one buffer, observing the record count under the
        // lock before resetting.
        loop {
            if let Some((_, mut buffer)) = consumer_pool.try_acquire_filled() {
                assert_eq!(buffer.num_jsons(), 1);
                assert_eq!(buffer.range(), SeqRange { first: 0, last: 0 });
                assert!(buffer.bytes().ends_with(b"\n"));
                buffer.reset();
                return;
            }
            thread::sleep(Duration::from_micros(100));
        }
    });

    let mut client = BufferingClient::connect(&client_options(port), pool).unwrap();
    client.receive(None).unwrap();

    consumer.join().unwrap();
    assert_eq!(client.jsons_received(), 1);
    server.join().unwrap().unwrap();
}

#[test]
fn test_sequence_density_across_buffers() {
    let mut options = ProducerOptions::new(digit_schema());
    options.batching = true;
    options.num_batches = 8;
    options.num_jsons = 32;
    options.num_threads = 2;

    let (port, server) = spawn_server(options, RepeatOptions::default());

    // Buffers far smaller than the stream force many fills.
    let pool = BufferPool::new(3, 256).unwrap();
    let consumer_pool = pool.clone();
    let (range_tx, range_rx) = crossbeam_channel::unbounded::<SeqRange>();
    let done = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let consumer_done = done.clone();

    let consumer = thread::spawn(move || {
        loop {
            if let Some((_, mut buffer)) = consumer_pool.try_acquire_filled() {
                range_tx.send(buffer.range()).unwrap();
                buffer.reset();
                continue;
            }
            if consumer_done.load(std::sync::atomic::Ordering::Relaxed) {
                // One final sweep in case the client released a buffer
                // right before the flag flipped.
                while let Some((_, mut buffer)) = consumer_pool.try_acquire_filled() {
                    range_tx.send(buffer.range()).unwrap();
                    buffer.reset();
                }
                return;
            }
            thread::sleep(Duration::from_micros(100));
        }
    });

    let mut client = BufferingClient::connect(&client_options(port), pool).unwrap();
    client.receive(None).unwrap();
    done.store(true, std::sync::atomic::Ordering::Relaxed);
    consumer.join().unwrap();
    server.join().unwrap().unwrap();

    let total: u64 = 8 * 32;
    assert_eq!(client.jsons_received(), total);

    // The union of all ranges is [0, total-1], dense, no overlaps.
    let mut ranges: Vec<SeqRange> = range_rx.try_iter().collect();
    ranges.sort_by_key(|r| r.first);
    let mut next = 0u64;
    for range in &ranges {
        assert_eq!(range.first, next);
        assert!(range.last >= range.first);
        next = range.last + 1;
    }
    assert_eq!(next, total);
}

#[test]
fn test_records_survive_chunked_delivery() {
    // A hand-rolled sender splits the stream at pathological boundaries;
    // the client must reassemble the same records regardless.
    let records: Vec<String> = (0..40).map(|i| format!("{{\"i\":{i}}}")).collect();
    let mut stream_bytes = Vec::new();
    for record in &records {
        stream_bytes.extend_from_slice(record.as_bytes());
        stream_bytes.push(b'\n');
    }

    for chunk_size in [1usize, 2, 3, 5, 7, 11, 64] {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let bytes = stream_bytes.clone();

        let sender = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            for chunk in bytes.chunks(chunk_size) {
                socket.write_all(chunk).unwrap();
                socket.flush().unwrap();
            }
            // Dropping the socket closes it cleanly.
        });

        let (record_tx, record_rx) = record_queue();
        let mut client =
            jsonspout::QueueingClient::connect(&client_options(port), record_tx).unwrap();
        client.receive(None).unwrap();
        sender.join().unwrap();

        let received: Vec<_> = record_rx.try_iter().collect();
        assert_eq!(
            received.len(),
            records.len(),
            "chunk size {chunk_size} lost records"
        );
        for (i, record) in received.iter().enumerate() {
            assert_eq!(record.seq, i as u64);
            assert_eq!(record.data, records[i]);
        }
    }
}

#[test]
fn test_spill_carries_across_small_buffers() {
    let records: Vec<String> = (0..64).map(|i| format!("{{\"n\":{i}}}")).collect();
    let mut stream_bytes = Vec::new();
    for record in &records {
        stream_bytes.extend_from_slice(record.as_bytes());
        stream_bytes.push(b'\n');
    }

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let bytes = stream_bytes.clone();

    let sender = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        for chunk in bytes.chunks(13) {
            socket.write_all(chunk).unwrap();
            socket.flush().unwrap();
        }
    });

    // Buffers barely larger than one record, so almost every fill spills.
    let pool = BufferPool::new(2, 24).unwrap();
    let consumer_pool = pool.clone();
    let done = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let consumer_done = done.clone();
    let (seg_tx, seg_rx) = crossbeam_channel::unbounded::<(SeqRange, Vec<u8>)>();

    let consumer = thread::spawn(move || loop {
        if let Some((_, mut buffer)) = consumer_pool.try_acquire_filled() {
            seg_tx
                .send((buffer.range(), buffer.bytes().to_vec()))
                .unwrap();
            buffer.reset();
            continue;
        }
        if consumer_done.load(std::sync::atomic::Ordering::Relaxed) {
            while let Some((_, mut buffer)) = consumer_pool.try_acquire_filled() {
                seg_tx
                    .send((buffer.range(), buffer.bytes().to_vec()))
                    .unwrap();
                buffer.reset();
            }
            return;
        }
        thread::sleep(Duration::from_micros(100));
    });

    let mut client = BufferingClient::connect(&client_options(port), pool).unwrap();
    client.receive(None).unwrap();
    done.store(true, std::sync::atomic::Ordering::Relaxed);
    consumer.join().unwrap();
    sender.join().unwrap();

    let mut segments: Vec<(SeqRange, Vec<u8>)> = seg_rx.try_iter().collect();
    segments.sort_by_key(|(range, _)| range.first);

    // Reassembled contents equal the original stream.
    let reassembled: Vec<u8> = segments
        .iter()
        .flat_map(|(_, bytes)| bytes.iter().copied())
        .collect();
    assert_eq!(reassembled, stream_bytes);
    assert_eq!(client.jsons_received(), records.len() as u64);
}

#[test]
fn test_oversized_record_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let sender = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        // One record longer than any pool buffer, never terminated in time.
        socket.write_all(&[b'x'; 256]).unwrap();
        socket.flush().unwrap();
        // Keep the socket open long enough for the client to notice.
        thread::sleep(Duration::from_millis(200));
    });

    let pool = BufferPool::new(2, 32).unwrap();
    let mut client = BufferingClient::connect(&client_options(port), pool).unwrap();
    let result = client.receive(None);
    sender.join().unwrap();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Record exceeds buffer capacity."));
}

#[test]
fn test_early_consumer_disconnect_is_an_error() {
    let mut options = ProducerOptions::new(digit_schema());
    options.batching = true;
    // Far more data than the loopback socket buffers can absorb, so the
    // server is still sending when the consumer vanishes.
    options.num_batches = 1024;
    options.num_jsons = 1024;

    let (port, server) = spawn_server(options, RepeatOptions::default());

    // Connect without ever reading, then vanish mid-stream.
    {
        let stream = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        thread::sleep(Duration::from_millis(50));
        drop(stream);
    }

    let result = server.join().unwrap();
    assert!(result.is_err());
}

#[test]
fn test_repeat_sessions_reconnect_and_accumulate() {
    let mut options = ProducerOptions::new(digit_schema());
    options.num_jsons = 4;
    options.gen.seed = 5;

    let repeat = RepeatOptions {
        times: 2,
        interval_ms: 0,
    };
    let (port, server) = spawn_server(options, repeat);

    for _ in 0..2 {
        let (sender, receiver) = record_queue();
        let mut client = loop {
            match jsonspout::QueueingClient::connect(&client_options(port), sender.clone()) {
                Ok(client) => break client,
                Err(_) => thread::sleep(Duration::from_millis(10)),
            }
        };
        client.receive(None).unwrap();
        let records: Vec<String> = receiver.try_iter().map(|r| r.data).collect();
        assert_eq!(records.len(), 4);
    }

    let metrics = server.join().unwrap().unwrap();
    assert_eq!(metrics.num_messages, 8);
    assert_eq!(metrics.producer.num_jsons, 8);
}
