//! Performance benchmarks for admission scoring.
//!
//! Run with: `cargo bench --bench scoring`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Assess, 10k corpus | <5ms p99 | Linear scan per signal |
//! | Submit, 10k corpus | <10ms p99 | Snapshot + assess + append |
//! | Rate-limit check | <10µs p99 | Per-fingerprint lock |

use criterion::{
    black_box, criterion_group, criterion_main,
    BenchmarkId, Criterion, Throughput,
};
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use salary_admission::{
    AdmissionPipeline, AdmissionPolicyV1, AnomalyDetector, Candidate, ExperienceBand,
    Fingerprint, FrictionFields, InMemoryCorpus, Industry, RateLimitPolicy, RateLimiter,
    Record, RecordId, RecordStatus, Submission,
};

/// Create a corpus record.
fn make_record(i: usize) -> Record {
    Record {
        id: RecordId::generate(),
        title: format!("Role {}", i % 50),
        company: format!("Company {}", i % 200),
        industry: Industry::ALL[i % Industry::ALL.len()],
        city: "Cairo".to_string(),
        experience: Some(ExperienceBand::ALL[i % ExperienceBand::ALL.len()]),
        salary: 5_000 + (i as u64 * 7_919) % 90_000,
        submitted_at: Utc::now(),
        verified: false,
        trust_score: 85,
        status: RecordStatus::AutoApproved,
        flags: vec![],
        community_flag_count: 0,
        device_fingerprint: format!("device-{}", i % 1_000),
        friction: FrictionFields::default(),
    }
}

fn make_corpus(size: usize) -> Vec<Record> {
    (0..size).map(make_record).collect()
}

/// Benchmark the anomaly detector against growing corpora.
fn bench_assess(c: &mut Criterion) {
    let detector = AnomalyDetector::new(AdmissionPolicyV1::default());
    let submission = Submission::new(
        "Role 7",
        "Company 7",
        Industry::Technology,
        Some(ExperienceBand::ThreeToFive),
        48_500,
    );

    let mut group = c.benchmark_group("assess");

    for size in [100, 1_000, 10_000] {
        let corpus = make_corpus(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("records", size), &corpus, |b, corpus| {
            b.iter(|| detector.assess(black_box(&submission), black_box(corpus)))
        });
    }

    group.finish();
}

/// Benchmark full submissions, one fresh device per iteration.
fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    for size in [100, 10_000] {
        let store = Arc::new(InMemoryCorpus::with_records(make_corpus(size)).unwrap());
        let pipeline = AdmissionPipeline::new(store, AdmissionPolicyV1::default());
        let candidate = Candidate {
            title: "Role 3".to_string(),
            company: "Company 3".to_string(),
            industry: Industry::Finance,
            city: "Cairo".to_string(),
            experience: Some("5-10".to_string()),
            salary: 31_000,
            friction: FrictionFields::default(),
        };
        let mut n = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("records", size), |b| {
            b.iter(|| {
                n += 1;
                let fp = Fingerprint::new(format!("bench-{n}"));
                pipeline.submit(black_box(&candidate), &fp).unwrap()
            })
        });
    }

    group.finish();
}

/// Benchmark rate-limit checks under multi-threaded access.
fn bench_rate_limit_contention(c: &mut Criterion) {
    let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::default()));
    let fingerprints: Vec<_> = (0..1_000)
        .map(|i| Fingerprint::new(format!("device-{i}")))
        .collect();
    let fingerprints = Arc::new(fingerprints);

    let mut group = c.benchmark_group("rate_limit_contention");

    for threads in [1, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 100));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let limiter = Arc::clone(&limiter);
                        let fingerprints = Arc::clone(&fingerprints);
                        thread::spawn(move || {
                            for i in 0..100 {
                                let fp = &fingerprints[(t * 100 + i) % fingerprints.len()];
                                black_box(limiter.check_rate_limit(fp));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_assess,
    bench_submit,
    bench_rate_limit_contention,
);

criterion_main!(benches);
