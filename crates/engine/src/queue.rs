// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timed event queue.
//!
//! A min-heap orders events by deadline (epoch seconds, ties broken by
//! insertion order). A single worker task sleeps until the head deadline
//! or a wakeup pulse, then fires every due callback on a fresh task so the
//! worker is never blocked by user code. Already-queued events fire in
//! non-decreasing deadline order; a deadline in the past fires
//! immediately.

use jw_core::{Clock, EngineError, SystemClock};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// A queued callback: produces its future when fired.
pub type EventCallback = Box<
    dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send>> + Send + 'static,
>;

/// Handle to a queued event, used for removal and deadline updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct QueuedEvent {
    handle: EventHandle,
    reference: String,
    deadline: f64,
    callback: EventCallback,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for QueuedEvent {}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap max-heap yields the earliest deadline
        // first; handle order (insertion order) breaks ties.
        other
            .deadline
            .partial_cmp(&self.deadline)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.handle.0.cmp(&self.handle.0))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The heap itself, free of any runtime concerns.
#[derive(Default)]
pub struct EventHeap {
    heap: BinaryHeap<QueuedEvent>,
    next_handle: u64,
}

impl EventHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        reference: impl Into<String>,
        deadline: f64,
        callback: EventCallback,
    ) -> EventHandle {
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        self.heap.push(QueuedEvent {
            handle,
            reference: reference.into(),
            deadline,
            callback,
        });
        handle
    }

    /// Linear scan followed by re-heapify; N is bounded by the count of
    /// active jobs.
    pub fn remove(&mut self, handle: EventHandle) -> bool {
        let before = self.heap.len();
        self.heap = std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .filter(|e| e.handle != handle)
            .collect();
        self.heap.len() != before
    }

    pub fn update_deadline(&mut self, handle: EventHandle, deadline: f64) -> bool {
        let mut events = std::mem::take(&mut self.heap).into_vec();
        let mut found = false;
        for event in &mut events {
            if event.handle == handle {
                event.deadline = deadline;
                found = true;
            }
        }
        self.heap = events.into_iter().collect();
        found
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pop the head if its deadline has been reached.
    fn pop_due(&mut self, now: f64) -> Option<QueuedEvent> {
        if self.next_deadline()? <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// References of every due event, earliest first (testing/inspection).
    pub fn due_references(&mut self, now: f64) -> Vec<String> {
        let mut due = Vec::new();
        while let Some(event) = self.pop_due(now) {
            due.push(event.reference);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// The running queue: heap + worker task + wakeup signal.
pub struct EventQueue<C: Clock = SystemClock> {
    inner: Arc<Mutex<EventHeap>>,
    notify: Arc<Notify>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
    _clock: C,
}

impl<C: Clock + 'static> EventQueue<C> {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(clock: C) -> Arc<Self> {
        let inner = Arc::new(Mutex::new(EventHeap::new()));
        let notify = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));

        let worker = tokio::spawn(worker_loop(
            inner.clone(),
            notify.clone(),
            running.clone(),
            clock.clone(),
        ));

        Arc::new(Self {
            inner,
            notify,
            running,
            worker: Mutex::new(Some(worker)),
            _clock: clock,
        })
    }

    pub fn add(
        &self,
        reference: impl Into<String>,
        deadline: f64,
        callback: EventCallback,
    ) -> EventHandle {
        let reference = reference.into();
        tracing::debug!(%reference, deadline, "scheduler - adding event");
        let handle = self.inner.lock().add(reference, deadline, callback);
        self.notify.notify_one();
        handle
    }

    pub fn remove(&self, handle: EventHandle) {
        self.inner.lock().remove(handle);
        self.notify.notify_one();
    }

    pub fn update_deadline(&self, handle: EventHandle, deadline: f64) {
        self.inner.lock().update_deadline(handle, deadline);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Stop the worker; queued events stop firing.
    pub fn stop(&self) {
        tracing::debug!("scheduler - stopping scheduler");
        self.running.store(false, AtomicOrdering::SeqCst);
        self.notify.notify_one();
    }

    /// Wait for the worker to exit after [`EventQueue::stop`].
    pub async fn stopped(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

async fn worker_loop<C: Clock>(
    inner: Arc<Mutex<EventHeap>>,
    notify: Arc<Notify>,
    running: Arc<AtomicBool>,
    clock: C,
) {
    while running.load(AtomicOrdering::SeqCst) {
        let wait = inner.lock().next_deadline().map(|d| d - clock.epoch());
        match wait {
            // Empty queue: sleep until the next mutation.
            None => notify.notified().await,
            Some(secs) if secs > 0.0 => {
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => {}
                }
            }
            // Head already due: fall through and fire.
            Some(_) => {}
        }
        if !running.load(AtomicOrdering::SeqCst) {
            break;
        }

        loop {
            let due = {
                let mut heap = inner.lock();
                let now = clock.epoch();
                heap.pop_due(now)
            };
            let Some(event) = due else {
                break;
            };
            tracing::debug!(reference = %event.reference, "scheduler - running event");
            let reference = event.reference;
            tokio::spawn(async move {
                if let Err(e) = (event.callback)().await {
                    tracing::error!(%reference, error = %e, "scheduler - event callback failed");
                }
            });
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
