//! Priority queue throughput

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use taskengine::Priority;
use taskengine::scheduler::PriorityQueue;

fn priorities(n: usize) -> Vec<Priority> {
    (0..n)
        .map(|i| Priority::new((i * 7 % 10) as u8 + 1).unwrap_or_default())
        .collect()
}

fn bench_enqueue_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    for size in [100usize, 1_000, 10_000] {
        let prios = priorities(size);

        group.bench_with_input(BenchmarkId::new("enqueue_then_drain", size), &prios, |b, prios| {
            b.iter(|| {
                let mut queue = PriorityQueue::new();
                for (i, p) in prios.iter().enumerate() {
                    queue.enqueue(i, *p);
                }
                while let Some(item) = queue.dequeue() {
                    black_box(item);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("find_last", size), &prios, |b, prios| {
            let mut queue = PriorityQueue::new();
            for (i, p) in prios.iter().enumerate() {
                queue.enqueue(i, *p);
            }
            b.iter(|| black_box(queue.find(|item| *item == size - 1)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue_dequeue);
criterion_main!(benches);
