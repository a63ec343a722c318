//! Queue throughput benchmark, one run per discipline.
//!
//! Usage:
//!     cargo run --release --bin queue_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0  Pin producers starting at CPU 0 (default: 0)
//!     CONSUMER_CPU=2  Pin consumer to CPU 2 (default: 2)
//!     PRODUCERS=1     Producer threads for the MPSC disciplines (default: 1)

use std::env;
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ember::queue::{self, Capacity, Producers};
use ember::PlatformCapabilities;
use minstant::Instant;

const BOUNDED_CAPACITY: usize = 1 << 16;
const ITERATIONS: u64 = 1 << 22;

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn pin_to_cpu(id: usize) {
    core_affinity::set_for_current(core_affinity::CoreId { id });
}

fn bench_throughput(capacity: Capacity, cardinality: Producers, producers: usize) {
    let producer_cpu = env_usize("PRODUCER_CPU", 0);
    let consumer_cpu = env_usize("CONSUMER_CPU", 2);

    let (tx, rx) = queue::channel::<u64>(capacity, cardinality).unwrap();
    let discipline = tx.discipline();
    let per_producer = ITERATIONS / producers as u64;
    let total = per_producer * producers as u64;

    let ready = Arc::new(AtomicBool::new(false));

    let consumer = {
        let ready = Arc::clone(&ready);
        std::thread::spawn(move || {
            pin_to_cpu(consumer_cpu);
            ready.store(true, Ordering::Release);

            let mut received = 0u64;
            while received < total {
                if rx.try_pop().is_some() {
                    received += 1;
                } else {
                    hint::spin_loop();
                }
            }
        })
    };

    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }

    let start = Instant::now();

    let mut handles = Vec::with_capacity(producers);
    let mut next = Some(tx);
    for p in 0..producers {
        let handle = if p + 1 == producers {
            next.take().unwrap()
        } else {
            next.as_ref().unwrap().try_clone().unwrap()
        };
        handles.push(std::thread::spawn(move || {
            pin_to_cpu(producer_cpu + p);
            for i in 0..per_producer {
                let mut item = i;
                while let Err(full) = handle.try_push(item) {
                    item = full.into_inner();
                    hint::spin_loop();
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    consumer.join().unwrap();
    let elapsed = start.elapsed();

    let ops_per_ms = total as u128 * 1_000_000 / elapsed.as_nanos().max(1);
    println!("  {discipline:?} ({producers} producer(s)): {ops_per_ms} ops/ms");
}

fn main() {
    ember::init_tracing();

    let caps = PlatformCapabilities::get();
    println!(
        "ember platform: direct_buffer_preferred={} fast_memory_view_supported={} cache_line={}",
        caps.direct_buffer_preferred(),
        caps.fast_memory_view_supported(),
        caps.cache_line_size()
    );

    let producers = env_usize("PRODUCERS", 1).max(1);
    println!("ember queues (iters={ITERATIONS}):");
    bench_throughput(Capacity::Bounded(BOUNDED_CAPACITY), Producers::Multiple, producers);
    bench_throughput(Capacity::Unbounded, Producers::Multiple, producers);
    bench_throughput(Capacity::Unbounded, Producers::Single, 1);
}
