mod common;
use crate::common::{init_tracing, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use gencache::cache::MemoryCache;
use gencache::engine::{EngineOptions, GenerationEngine, RunSummary};
use gencache_test_utils::fakes::{ConcurrencyGauge, FakeTask, MapHasher, StaticFinder};

async fn run_gauged(tasks: usize, workers: usize, delay: Duration) -> (RunSummary, Arc<ConcurrencyGauge>) {
    let gauge = ConcurrencyGauge::new();
    let hasher = Arc::new(MapHasher::new());
    let fakes: Vec<Arc<FakeTask>> = (0..tasks)
        .map(|i| {
            let path = PathBuf::from(format!("/gauge/{i}.go"));
            hasher.set(&path, "h:1");
            Arc::new(
                FakeTask::new(path)
                    .with_delay(delay)
                    .with_gauge(Arc::clone(&gauge)),
            )
        })
        .collect();

    let engine = GenerationEngine::new(EngineOptions {
        hasher,
        cache: Arc::new(MemoryCache::new()),
        finder: Arc::new(StaticFinder::new(fakes)),
        workers,
    });

    let summary = engine
        .generate(&CancellationToken::new(), "/gauge".as_ref())
        .await
        .expect("fake tasks never fail");
    (summary, gauge)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_than_w_tasks_in_flight() {
    init_tracing();

    let (summary, gauge) = with_timeout(run_gauged(12, 3, Duration::from_millis(30))).await;

    assert_eq!(summary.executed, 12);
    assert!(gauge.peak() <= 3, "peak {} exceeded 3 workers", gauge.peak());
    assert!(gauge.peak() >= 2, "tasks should overlap, peak was {}", gauge.peak());
    assert_eq!(gauge.current(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_worker_is_fully_serial() {
    init_tracing();

    let (summary, gauge) = with_timeout(run_gauged(6, 1, Duration::from_millis(10))).await;

    assert_eq!(summary.executed, 6);
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test]
async fn zero_workers_behaves_like_one() {
    init_tracing();

    let (summary, gauge) = with_timeout(run_gauged(3, 0, Duration::from_millis(5))).await;

    assert_eq!(summary.executed, 3);
    assert_eq!(gauge.peak(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn peak_in_flight_is_bounded_by_workers(tasks in 0usize..24, workers in 1usize..6) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (summary, gauge) = rt.block_on(run_gauged(tasks, workers, Duration::from_millis(2)));

        prop_assert_eq!(summary.considered, tasks);
        prop_assert_eq!(summary.executed, tasks);
        prop_assert!(gauge.peak() <= workers);
    }
}
