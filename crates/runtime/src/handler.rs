// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-threaded event dispatcher driving one job run.

use crate::datastore::DataStore;
use crate::snippet::{EventKind, Snippet, SnippetEvent};
use indexmap::IndexMap;
use jw_core::RetCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

/// A snippet body, executed on its own thread once the node starts.
pub type BodyFn = Box<dyn FnOnce(&RunContext) + Send + 'static>;

/// Everything a body needs: its own node, the shared cache, and the
/// resolved workspace globals.
pub struct RunContext {
    pub snippet: Arc<Snippet>,
    pub store: Arc<DataStore>,
    pub globals: Arc<Value>,
}

/// Owns the snippet set and the serialized event queue.
///
/// The dispatcher loop pulls events in FIFO order and handles each one
/// whole before the next: `start` spawns the body task, anything else is
/// routed through the snippet's outgoing links. After each drain it tests
/// the termination predicate: the sum of all snippet states reaching
/// `2 × |snippets|` means every node terminated.
pub struct JobHandler {
    tx: mpsc::Sender<SnippetEvent>,
    rx: mpsc::Receiver<SnippetEvent>,
    snippets: Vec<Arc<Snippet>>,
    bodies: HashMap<u32, BodyFn>,
    handles: Vec<JoinHandle<()>>,
    store: Arc<DataStore>,
    globals: Arc<Value>,
}

impl JobHandler {
    pub fn new(globals: Value, store: Arc<DataStore>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            snippets: Vec::new(),
            bodies: HashMap::new(),
            handles: Vec::new(),
            store,
            globals: Arc::new(globals),
        }
    }

    /// Sender handed to snippets at construction time.
    pub fn sender(&self) -> mpsc::Sender<SnippetEvent> {
        self.tx.clone()
    }

    pub fn globals(&self) -> &Arc<Value> {
        &self.globals
    }

    pub fn snippets(&self) -> &[Arc<Snippet>] {
        &self.snippets
    }

    pub fn get_snippet(&self, name: &str) -> Option<&Arc<Snippet>> {
        self.snippets.iter().find(|s| s.name == name)
    }

    /// Add a snippet to the set: wire its links against the nodes already
    /// registered, bind its body, and let root nodes enqueue their start.
    pub fn register(
        &mut self,
        snippet: Arc<Snippet>,
        when: &IndexMap<String, String>,
        body: BodyFn,
    ) {
        snippet.init_links(when, &self.snippets);
        self.bodies.insert(snippet.id, body);
        self.snippets.push(snippet.clone());
        snippet.need_to_start();
    }

    /// Run the dispatcher until every snippet terminated, then join the
    /// body threads (a terminated node's body may still be writing its
    /// ending line). Returns the aggregate return code.
    pub fn run(&mut self) -> RetCode {
        loop {
            if self.all_terminated() {
                break;
            }
            let Ok(event) = self.rx.recv() else {
                break;
            };
            self.dispatch(event);
            while let Ok(event) = self.rx.try_recv() {
                self.dispatch(event);
            }
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        self.retcode()
    }

    /// ERROR iff any snippet terminated with ERROR.
    pub fn retcode(&self) -> RetCode {
        if self.snippets.iter().any(|s| s.retcode() == RetCode::Error) {
            RetCode::Error
        } else {
            RetCode::Pass
        }
    }

    fn dispatch(&mut self, event: SnippetEvent) {
        let Some(snippet) = self.snippets.iter().find(|s| s.id == event.snippet_id).cloned()
        else {
            return;
        };
        match event.kind {
            EventKind::Start => {
                if snippet.start() {
                    self.spawn_body(snippet);
                }
            }
            EventKind::Message { message, cancel_all } => {
                snippet.trigger(&self.snippets, &message, cancel_all);
            }
        }
    }

    fn spawn_body(&mut self, snippet: Arc<Snippet>) {
        let Some(body) = self.bodies.remove(&snippet.id) else {
            return;
        };
        let ctx = RunContext {
            snippet: snippet.clone(),
            store: self.store.clone(),
            globals: self.globals.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name(format!("snippet-{}", snippet.id))
            .spawn(move || body(&ctx));
        match spawned {
            Ok(handle) => self.handles.push(handle),
            Err(e) => snippet.error(&format!("unable to spawn body task: {e}")),
        }
    }

    fn all_terminated(&self) -> bool {
        let score: u32 = self.snippets.iter().map(|s| u32::from(s.state().as_u8())).sum();
        score == self.snippets.len() as u32 * 2
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
