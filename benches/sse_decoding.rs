//! Benchmarks for the SSE decoding pipeline
//!
//! This benchmark measures:
//! - Record classification (payload → event)
//! - Full byte → event throughput at different network chunk sizes
//! - Framing overhead with heartbeat-heavy streams

use chat_stream::pipeline::event_map::map_payload;
use chat_stream::pipeline::EventPipeline;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Sample chat completion chunks as a backend streams them.
const SSE_FRAMES: &[&str] = &[
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","choices":[{"index":0,"delta":{"content":" there, 你好"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","choices":[{"index":0,"delta":{"content":"!"},"finish_reason":null}]}"#,
    r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4o","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
];

fn stream_body(repeat: usize, heartbeat_every: Option<usize>) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..repeat {
        if heartbeat_every.is_some_and(|n| i % n == 0) {
            body.push_str(": ping\r\n\r\n");
        }
        body.push_str(SSE_FRAMES[i % SSE_FRAMES.len()]);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn drain(body: &[u8], chunk_size: usize) -> usize {
    let mut pipeline = EventPipeline::new();
    let mut events = 0;
    for chunk in body.chunks(chunk_size) {
        pipeline.push_bytes(chunk);
        while let Some(event) = pipeline.next_event() {
            events += 1;
            if event.is_terminal() {
                return events;
            }
        }
    }
    events
}

fn bench_payload_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_mapping");

    let delta = SSE_FRAMES[1].strip_prefix("data: ").unwrap_or_default();
    group.throughput(Throughput::Bytes(delta.len() as u64));
    group.bench_function("delta", |b| b.iter(|| map_payload(black_box(delta))));

    group.bench_function("sentinel", |b| b.iter(|| map_payload(black_box(" [DONE]"))));

    group.bench_function("malformed", |b| {
        b.iter(|| map_payload(black_box(r#"{"choices":[{"delta":"#)))
    });

    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_chunk_size");
    let body = stream_body(200, None);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [1usize, 16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| b.iter(|| drain(black_box(&body), size)),
        );
    }

    group.finish();
}

fn bench_heartbeats(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_heartbeats");
    let plain = stream_body(200, None);
    let chatty = stream_body(200, Some(2));

    group.bench_function("no_heartbeats", |b| b.iter(|| drain(black_box(&plain), 512)));
    group.bench_function("heartbeat_every_2", |b| {
        b.iter(|| drain(black_box(&chatty), 512))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_payload_mapping,
    bench_chunk_sizes,
    bench_heartbeats,
);
criterion_main!(benches);
