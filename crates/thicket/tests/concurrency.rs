// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Scoped providers must construct their instance once even when first accessed concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use thicket::{DoubleCheck, Memoized, Provider};

const THREADS: usize = 8;

#[test]
fn double_check_is_shared_across_threads() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    let scoped = DoubleCheck::provider(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Arc::new(String::from("database"))
    }));

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scoped = Arc::clone(&scoped);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scoped.get()
            })
        })
        .collect();

    let instances: Vec<Arc<String>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should not panic"))
        .collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
}

#[test]
fn memoized_field_is_shared_across_threads() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let cell = Arc::new(Memoized::<Arc<u64>>::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let cell = Arc::clone(&cell);
            let barrier = Arc::clone(&barrier);
            let constructions = Arc::clone(&constructions);
            thread::spawn(move || {
                barrier.wait();
                cell.get_or_init(|| {
                    constructions.fetch_add(1, Ordering::SeqCst);
                    Arc::new(index as u64)
                })
            })
        })
        .collect();

    let instances: Vec<Arc<u64>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should not panic"))
        .collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
}
