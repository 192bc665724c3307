// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn noop() -> EventCallback {
    Box::new(|| Box::pin(async { Ok(()) }))
}

fn push(fired: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> EventCallback {
    let fired = fired.clone();
    Box::new(move || {
        Box::pin(async move {
            fired.lock().push(tag);
            Ok(())
        })
    })
}

#[test]
fn heap_pops_in_deadline_order_with_insertion_ties() {
    let mut heap = EventHeap::new();
    heap.add("late", 30.0, noop());
    heap.add("early", 10.0, noop());
    heap.add("tie-first", 20.0, noop());
    heap.add("tie-second", 20.0, noop());

    assert_eq!(heap.next_deadline(), Some(10.0));
    assert_eq!(heap.due_references(25.0), vec!["early", "tie-first", "tie-second"]);
    // the 30.0 event is not due yet
    assert_eq!(heap.len(), 1);
    assert_eq!(heap.due_references(30.0), vec!["late"]);
    assert!(heap.is_empty());
}

#[test]
fn heap_remove_by_handle() {
    let mut heap = EventHeap::new();
    let a = heap.add("a", 10.0, noop());
    heap.add("b", 20.0, noop());

    assert!(heap.remove(a));
    assert!(!heap.remove(a));
    assert_eq!(heap.due_references(100.0), vec!["b"]);
}

#[test]
fn heap_update_deadline_reorders() {
    let mut heap = EventHeap::new();
    heap.add("a", 10.0, noop());
    let b = heap.add("b", 20.0, noop());

    assert!(heap.update_deadline(b, 5.0));
    assert_eq!(heap.due_references(100.0), vec!["b", "a"]);
    assert!(!heap.update_deadline(b, 1.0));
}

proptest! {
    #[test]
    fn heap_ordering_is_total_over_random_deadlines(
        deadlines in proptest::collection::vec(0u32..1000, 0..50)
    ) {
        let mut heap = EventHeap::new();
        for (index, deadline) in deadlines.iter().enumerate() {
            heap.add(format!("e{index}"), f64::from(*deadline), noop());
        }
        let refs = heap.due_references(f64::from(u32::MAX));

        let mut expected: Vec<(u32, usize)> =
            deadlines.iter().copied().zip(0..deadlines.len()).collect();
        expected.sort_by_key(|&(deadline, index)| (deadline, index));
        let expected_refs: Vec<String> =
            expected.iter().map(|&(_, index)| format!("e{index}")).collect();
        prop_assert_eq!(refs, expected_refs);
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(400)).await;
}

#[tokio::test]
async fn worker_fires_events_in_deadline_order() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    let now = clock.epoch();
    queue.add("b", now + 0.10, push(&fired, "b"));
    queue.add("a", now + 0.05, push(&fired, "a"));

    settle().await;
    assert_eq!(*fired.lock(), vec!["a", "b"]);
    assert!(queue.is_empty());
    queue.stop();
    queue.stopped().await;
}

#[tokio::test]
async fn past_deadline_fires_immediately() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    queue.add("old", clock.epoch() - 100.0, push(&fired, "old"));
    settle().await;
    assert_eq!(*fired.lock(), vec!["old"]);
    queue.stop();
}

#[tokio::test]
async fn removed_events_do_not_fire() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    let handle = queue.add("gone", clock.epoch() + 0.15, push(&fired, "gone"));
    queue.remove(handle);
    settle().await;
    assert!(fired.lock().is_empty());
    queue.stop();
}

#[tokio::test]
async fn update_deadline_pulls_an_event_forward() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    let handle = queue.add("moved", clock.epoch() + 60.0, push(&fired, "moved"));
    queue.update_deadline(handle, clock.epoch() + 0.05);
    settle().await;
    assert_eq!(*fired.lock(), vec!["moved"]);
    queue.stop();
}

#[tokio::test]
async fn callback_errors_are_swallowed() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    let now = clock.epoch();
    queue.add(
        "boom",
        now + 0.02,
        Box::new(|| Box::pin(async { Err(EngineError::internal("callback exploded")) })),
    );
    queue.add("after", now + 0.08, push(&fired, "after"));

    settle().await;
    // the queue survived the failing callback
    assert_eq!(*fired.lock(), vec!["after"]);
    queue.stop();
}

#[tokio::test]
async fn stop_halts_future_firing() {
    let clock = SystemClock;
    let queue = EventQueue::start(clock.clone());
    let fired = Arc::new(Mutex::new(Vec::new()));

    queue.add("never", clock.epoch() + 0.2, push(&fired, "never"));
    queue.stop();
    queue.stopped().await;
    settle().await;
    assert!(fired.lock().is_empty());
}
