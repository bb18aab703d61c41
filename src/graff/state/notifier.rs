// SPDX-License-Identifier: MIT

//! Change notifications for live run state

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::lock;

/// Emitted once for every `set`/`add` on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotification {
    pub node_id: String,
}

type Listener = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Observer registry shared by every graph of a run.
///
/// Cloning a `Notifier` yields a handle onto the same listener list, which is
/// how one subscription covers a whole tree of nested sub-graphs.
#[derive(Clone, Default)]
pub struct Notifier {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; callbacks run in registration order
    pub fn listen<F>(&self, callback: F)
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        lock(&self.listeners).push(Arc::new(callback));
    }

    /// Invoke every listener synchronously with `notification`
    pub fn notify(&self, notification: &ChangeNotification) {
        // Snapshot the list so a listener may register further listeners.
        let listeners: Vec<Listener> = lock(&self.listeners).clone();
        for listener in &listeners {
            listener(notification);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
