//! Benchmarks for FIFO/LRU eviction under load churn

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memsim_rs::{MemoryManager, ReplacementPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn full_manager(pages: u64, replacement: ReplacementPolicy) -> MemoryManager {
    let mut memory = MemoryManager::builder()
        .total_size(pages * 64)
        .replacement(replacement)
        .build()
        .unwrap();

    for i in 0..pages {
        memory.load(&format!("seed{}", i), vec![0; 32]).unwrap();
    }
    memory
}

fn benchmark_eviction_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction_churn");
    let loads = 1000u64;
    group.throughput(Throughput::Elements(loads));

    for replacement in [ReplacementPolicy::Fifo, ReplacementPolicy::Lru] {
        for pages in [16u64, 256].iter() {
            group.bench_with_input(
                BenchmarkId::new(replacement.to_string(), pages),
                pages,
                |b, &pages| {
                    b.iter_with_setup(
                        || full_manager(pages, replacement),
                        |mut memory| {
                            // Every load is at capacity and evicts
                            for i in 0..loads {
                                black_box(memory.load(&format!("new{}", i), vec![1; 48]).unwrap());
                            }
                        },
                    );
                },
            );
        }
    }

    group.finish();
}

fn benchmark_lru_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_reads");

    for pages in [16u64, 256, 1024].iter() {
        let mut memory = full_manager(*pages, ReplacementPolicy::Lru);
        let mut rng = StdRng::seed_from_u64(7);

        group.bench_with_input(BenchmarkId::from_parameter(pages), pages, |b, &pages| {
            b.iter(|| {
                let id = format!("seed{}", rng.gen_range(0..pages));
                black_box(memory.read(&id).unwrap().len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_eviction_churn, benchmark_lru_reads);
criterion_main!(benches);
