//! Parallel access on a multi-threaded runtime: exact rotation under
//! contention, health flips racing selection, and the single-probe guard.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{endpoints, fast_connect, MockDriver};
use dbpool::config::AccessTarget;
use dbpool::Pool;

const NO_PROBE_MS: u64 = 60_000;

async fn pool_with(driver: &Arc<MockDriver>, names: &[&str], interval_ms: u64) -> Pool {
    Pool::initialize(
        endpoints(names, interval_ms),
        AccessTarget::RoundRobin,
        fast_connect(),
        driver.clone(),
    )
    .await
    .expect("pool should initialize")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_selection_is_exact() {
    const TASKS: usize = 8;
    const PER_TASK: usize = 300;

    let driver = MockDriver::new();
    let pool = pool_with(&driver, &["a", "b", "c"], NO_PROBE_MS).await;

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for i in 0..PER_TASK {
                let endpoint = pool.select().expect("selection should succeed");
                *counts.entry(endpoint.name().to_string()).or_default() += 1;
                if i % 25 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            counts
        }));
    }

    let mut totals: HashMap<String, usize> = HashMap::new();
    for handle in handles {
        for (name, n) in handle.await.unwrap() {
            *totals.entry(name).or_default() += n;
        }
    }

    // 300 × TASKS selections over 3 endpoints
    assert_eq!(totals.len(), 3);
    for name in ["a", "b", "c"] {
        assert_eq!(totals[name], TASKS * 100, "endpoint {}", name);
    }
    assert_eq!(pool.position(), (TASKS * PER_TASK) as u64);

    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flip_during_parallel_selection() {
    const SELECTORS: usize = 4;
    const MARKERS: usize = 4;
    const AFTER_FLIP: usize = 500;

    let driver = MockDriver::new();
    let pool = pool_with(&driver, &["a", "b", "c"], 200).await;
    let b = Arc::clone(pool.endpoint("b").unwrap());
    let rebuilds_before = pool.rebuild_count();
    let flipped = Arc::new(AtomicBool::new(false));

    let mut selectors = Vec::new();
    for _ in 0..SELECTORS {
        let pool = pool.clone();
        let flipped = Arc::clone(&flipped);
        selectors.push(tokio::spawn(async move {
            let mut after_flip = 0;
            let mut stale = 0;
            let mut i = 0u64;
            while after_flip < AFTER_FLIP {
                let rebuilt = flipped.load(Ordering::SeqCst);
                let endpoint = pool.select().expect("a and c stay workable");
                if rebuilt {
                    after_flip += 1;
                    if endpoint.name() == "b" {
                        stale += 1;
                    }
                }
                i += 1;
                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            stale
        }));
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    driver.set_down("b", true);
    let opens_before = driver.opens("b");

    let mut markers = Vec::new();
    for _ in 0..MARKERS {
        let b = Arc::clone(&b);
        markers.push(tokio::spawn(async move { b.mark_unworkable() }));
    }
    for marker in markers {
        marker.await.unwrap();
    }
    // every mark_unworkable has returned, so the rebuild is complete
    flipped.store(true, Ordering::SeqCst);
    let marked_at = tokio::time::Instant::now();

    for selector in selectors {
        assert_eq!(selector.await.unwrap(), 0, "b selected after the rebuild");
    }

    assert!(pool.rebuild_count() > rebuilds_before);
    let workable: Vec<String> = pool
        .workable_endpoints()
        .iter()
        .map(|ep| ep.name().to_string())
        .collect();
    assert_eq!(workable, ["a", "c"]);

    assert!(b.is_probing());
    assert!(!b.start_recovery());

    // one probe: one attempt in the first interval, not one per marker
    tokio::time::sleep_until(marked_at + Duration::from_millis(300)).await;
    assert_eq!(driver.opens("b") - opens_before, 1);

    pool.close().await;
}
