// SPDX-License-Identifier: MIT

//! Run state: nodes, graphs and change notifications

pub mod graph;
pub mod node;
pub mod notifier;

pub use graph::{Graph, ReadableGraph};
pub use node::{Node, ReadableNode};
pub use notifier::{ChangeNotification, Notifier};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Notifier handle shared between a graph and all of its nodes
pub(crate) type NotifierSlot = Arc<RwLock<Option<Notifier>>>;

// A panicking block must not make the rest of the run unreadable, so poisoned
// locks are recovered rather than propagated.

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
