//! Concurrent selection must behave like the same number of sequential calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use weighted_proxy::config::BackendConfig;
use weighted_proxy::BackendRegistry;

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 500;

fn registry(weights: &[u32]) -> BackendRegistry {
    let configs: Vec<BackendConfig> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| BackendConfig::new(format!("http://127.0.0.1:{}", 5001 + i), *w))
        .collect();
    BackendRegistry::from_config(&configs).unwrap()
}

fn sequential_counts(weights: &[u32], calls: usize) -> HashMap<String, usize> {
    let registry = registry(weights);
    let mut counts = HashMap::new();
    for _ in 0..calls {
        let backend = registry.select().unwrap();
        *counts.entry(backend.address().to_string()).or_default() += 1;
    }
    counts
}

fn concurrent_counts(weights: &[u32]) -> HashMap<String, usize> {
    let registry = Arc::new(registry(weights));

    let per_thread: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = registry.clone();
                scope.spawn(move || {
                    (0..CALLS_PER_THREAD)
                        .map(|_| {
                            let backend = registry.select().unwrap();
                            assert!(backend.current_weight() > 0);
                            backend.address().to_string()
                        })
                        .collect::<Vec<String>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut counts = HashMap::new();
    for address in per_thread.into_iter().flatten() {
        *counts.entry(address).or_default() += 1;
    }
    counts
}

#[test]
fn test_concurrent_selection_matches_sequential() {
    let weights = [3, 2, 1];
    let concurrent = concurrent_counts(&weights);
    let sequential = sequential_counts(&weights, THREADS * CALLS_PER_THREAD);

    assert_eq!(concurrent, sequential);
    assert_eq!(concurrent.values().sum::<usize>(), THREADS * CALLS_PER_THREAD);
}

#[test]
fn test_concurrent_selection_uneven_weights() {
    let weights = [5, 1, 4, 2];
    assert_eq!(
        concurrent_counts(&weights),
        sequential_counts(&weights, THREADS * CALLS_PER_THREAD)
    );
}

#[test]
fn test_concurrent_all_unhealthy_terminates() {
    let registry = Arc::new(registry(&[2, 2, 2]));
    for backend in registry.all_backends() {
        backend.set_current_weight(0);
    }

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let registry = registry.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    assert!(registry.select().is_err());
                }
            });
        }
    });
}
