// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snippet DAG nodes and their start/cancel link machinery.

use crate::tracer::JobTracer;
use indexmap::IndexMap;
use jw_core::{RetCode, SnippetState};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

pub const MSG_DONE: &str = "done";
pub const MSG_FAILURE: &str = "failure";

/// One event on the dispatcher queue.
#[derive(Debug, Clone)]
pub struct SnippetEvent {
    pub snippet_id: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Start the snippet's body.
    Start,
    /// Route a message through the snippet's outgoing links. `cancel_all`
    /// distinguishes terminal signals (done/failure) from soft emits.
    Message { message: String, cancel_all: bool },
}

/// Incoming link: enabled once the predecessor delivers the message.
#[derive(Debug, Clone)]
struct LinkIn {
    name: String,
    message: String,
    enabled: bool,
}

/// Outgoing link: the successor's name and the message gating it.
#[derive(Debug, Clone)]
struct LinkOut {
    name: String,
    message: String,
}

/// A node of the run DAG.
///
/// State transitions are initiated on the dispatcher or posted back to it
/// through the event queue; the body thread only ever touches its own node
/// (`done`/`error`/`emit` enqueue, they never walk the graph).
pub struct Snippet {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Declared variables (after the compile-time `with:` overlay).
    pub variables: Value,
    state: AtomicU8,
    retcode: AtomicU8,
    links_in: Mutex<Vec<LinkIn>>,
    links_out: Mutex<Vec<LinkOut>>,
    created_at: Instant,
    events: mpsc::Sender<SnippetEvent>,
    tracer: Arc<JobTracer>,
}

impl Snippet {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        description: impl Into<String>,
        variables: Value,
        events: mpsc::Sender<SnippetEvent>,
        tracer: Arc<JobTracer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            description: description.into(),
            variables,
            state: AtomicU8::new(SnippetState::Created.as_u8()),
            retcode: AtomicU8::new(RetCode::Pass.as_u8()),
            links_in: Mutex::new(Vec::new()),
            links_out: Mutex::new(Vec::new()),
            created_at: Instant::now(),
            events,
            tracer,
        })
    }

    pub fn state(&self) -> SnippetState {
        SnippetState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn retcode(&self) -> RetCode {
        RetCode::from_u8(self.retcode.load(Ordering::SeqCst))
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    fn set_state(&self, state: SnippetState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn notify(&self, kind: EventKind) {
        // The dispatcher may already have exited; late events are dropped.
        let _ = self.events.send(SnippetEvent { snippet_id: self.id, kind });
    }

    /// Wire this node's `when:` clause: an incoming link per entry, and the
    /// mirror outgoing link on each (already constructed) predecessor.
    pub fn init_links(&self, when: &IndexMap<String, String>, peers: &[Arc<Snippet>]) {
        let mut links_in = self.links_in.lock();
        for (name, message) in when {
            links_in.push(LinkIn {
                name: name.clone(),
                message: message.clone(),
                enabled: false,
            });
            for peer in peers {
                if peer.name == *name {
                    peer.links_out
                        .lock()
                        .push(LinkOut { name: self.name.clone(), message: message.clone() });
                }
            }
        }
    }

    /// Enqueue a start once every incoming link is enabled (immediately for
    /// root nodes). No-op on terminated nodes.
    pub fn need_to_start(&self) {
        if self.state() == SnippetState::Terminated {
            return;
        }
        let ready = {
            let links = self.links_in.lock();
            links.iter().all(|l| l.enabled)
        };
        if ready {
            self.notify(EventKind::Start);
        }
    }

    /// Mark the incoming link from `name` carrying `message` as enabled.
    pub fn update_conds(&self, name: &str, message: &str) {
        for link in self.links_in.lock().iter_mut() {
            if link.name == name && link.message == message {
                link.enabled = true;
            }
        }
    }

    /// CREATED → STARTED, exactly once. Returns whether the body task
    /// should be spawned.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(
                SnippetState::Created.as_u8(),
                SnippetState::Started.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Route `message` along the outgoing links: matching links enable the
    /// successor (which may then start); non-matching links cancel the
    /// successor unless this is a soft emit.
    pub fn trigger(&self, peers: &[Arc<Snippet>], message: &str, cancel_all: bool) {
        let links = self.links_out.lock().clone();
        for link in links {
            let Some(successor) = find(peers, &link.name) else {
                continue;
            };
            if link.message == message {
                successor.update_conds(&self.name, message);
                successor.need_to_start();
            } else if cancel_all {
                successor.cancel(peers);
            }
        }
    }

    /// Terminate without an event and propagate to every successor. Does
    /// not interrupt a body that is already running.
    pub fn cancel(&self, peers: &[Arc<Snippet>]) {
        self.set_state(SnippetState::Terminated);
        let links = self.links_out.lock().clone();
        for link in links {
            if let Some(successor) = find(peers, &link.name) {
                successor.cancel(peers);
            }
        }
    }

    /// Terminate successfully and post `done` back to the dispatcher.
    pub fn done(&self) {
        if self.state() == SnippetState::Terminated {
            return;
        }
        self.set_state(SnippetState::Terminated);
        self.notify(EventKind::Message { message: MSG_DONE.to_string(), cancel_all: true });
    }

    /// Record an error, terminate, and post `failure` to the dispatcher.
    pub fn error(&self, message: &str) {
        self.retcode.store(RetCode::Error.as_u8(), Ordering::SeqCst);
        self.tracer.log_snippet_error(self.id, message);
        self.set_state(SnippetState::Terminated);
        self.notify(EventKind::Message { message: MSG_FAILURE.to_string(), cancel_all: true });
    }

    /// User-visible soft signal: routed like any message but never cancels
    /// non-matching successors.
    pub fn emit(&self, message: &str) {
        self.notify(EventKind::Message { message: message.to_string(), cancel_all: false });
    }

    pub fn log(&self, message: &str) {
        self.tracer.log_snippet_info(self.id, message);
    }

    pub fn begin(&self) {
        self.tracer.log_snippet_started(self.id, &self.description);
    }

    pub fn ending(&self, duration: f64) {
        self.tracer.log_snippet_stopped(self.id, self.retcode().state(), duration);
    }
}

fn find<'a>(peers: &'a [Arc<Snippet>], name: &str) -> Option<&'a Arc<Snippet>> {
    peers.iter().find(|s| s.name == name)
}

#[cfg(test)]
#[path = "snippet_tests.rs"]
mod tests;
