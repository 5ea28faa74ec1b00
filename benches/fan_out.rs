//! Broadcast fan-out benchmark.
//!
//! Measures the round trip of one message from one client through the
//! server to every connected client, at different client counts.
//!
//! Run with: cargo bench --bench fan_out
//! Results saved to: target/criterion/

use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use ws_broadcast::{BroadcastServer, MessageChannel, Messages, ServerConfig};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CLIENT_COUNTS: &[usize] = &[1, 10, 50];

// ============================================================================
// Benchmark: Fan-out Round Trip
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("fan_out");
    group.measurement_time(Duration::from_secs(10));

    for &count in CLIENT_COUNTS {
        group.bench_with_input(BenchmarkId::new("clients", count), &count, |b, &clients| {
            b.to_async(&rt)
                .iter_custom(|iters| async move { run_rounds(clients, iters).await });
        });
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn run_rounds(clients: usize, rounds: u64) -> Duration {
    let server = BroadcastServer::bind(ServerConfig::default()).await.unwrap();

    let mut channels = Vec::with_capacity(clients);
    let mut inboxes: Vec<Messages> = Vec::with_capacity(clients);
    for _ in 0..clients {
        let channel = MessageChannel::open(&server.ws_url()).unwrap();
        inboxes.push(channel.messages().unwrap());
        channel.wait_open().await.unwrap();
        channels.push(channel);
    }
    while server.client_count() < clients {
        tokio::task::yield_now().await;
    }

    let start = Instant::now();
    for round in 0..rounds {
        channels[0].send(format!("round {round}")).unwrap();
        for inbox in &mut inboxes {
            inbox.next().await.unwrap();
        }
    }
    let elapsed = start.elapsed();

    for channel in &channels {
        channel.close();
    }
    server.shutdown();

    elapsed
}

criterion_group!(benches, bench_fan_out);
criterion_main!(benches);
