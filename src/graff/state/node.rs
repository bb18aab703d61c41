// SPDX-License-Identifier: MIT

//! Per-block-execution state record

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};

use super::graph::{Graph, ReadableGraph};
use super::notifier::ChangeNotification;
use super::{lock, read, NotifierSlot};

#[derive(Default)]
struct NodeState {
    /// Insertion-ordered key -> value sequence
    values: Vec<(String, Vec<Vec<u8>>)>,
    done: bool,
    completed_at: Option<DateTime<Utc>>,
    sub_graphs: Vec<Graph>,
}

impl NodeState {
    fn entry(&mut self, key: &str) -> &mut Vec<Vec<u8>> {
        let idx = match self.values.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.values.push((key.to_string(), Vec::new()));
                self.values.len() - 1
            }
        };
        &mut self.values[idx].1
    }

    fn get(&self, key: &str) -> Option<&Vec<Vec<u8>>> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

struct NodeInner {
    id: String,
    name: String,
    triggered_by: Option<String>,
    created_at: DateTime<Utc>,
    state: Mutex<NodeState>,
    /// Shared with the owning graph so a notifier attached later still applies
    notifier: NotifierSlot,
}

/// Key/value store holding the output of one executed block.
///
/// `Node` is a cheap handle; clones refer to the same record.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub(crate) fn new(name: &str, triggered_by: Option<&ReadableNode>, notifier: NotifierSlot) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                triggered_by: triggered_by.map(|n| n.id().to_string()),
                created_at: Utc::now(),
                state: Mutex::new(NodeState::default()),
                notifier,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Replace every value under `key` with `value`
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>) {
        {
            let mut state = lock(&self.inner.state);
            let values = state.entry(key);
            values.clear();
            values.push(value.into());
        }
        self.notify();
    }

    pub fn set_str(&self, key: &str, value: &str) {
        self.set(key, value.as_bytes());
    }

    /// Append `value` to the sequence under `key`
    pub fn add(&self, key: &str, value: impl Into<Vec<u8>>) {
        lock(&self.inner.state).entry(key).push(value.into());
        self.notify();
    }

    pub fn add_str(&self, key: &str, value: &str) {
        self.add(key, value.as_bytes());
    }

    /// Flag the node as complete. Idempotent; never reset.
    pub fn mark_done(&self) {
        let mut state = lock(&self.inner.state);
        if !state.done {
            state.done = true;
            state.completed_at = Some(Utc::now());
        }
    }

    /// Attach an owned sub-graph, handing it this node's notifier
    pub fn add_sub_graph(&self, graph: Graph) {
        if let Some(notifier) = read(&self.inner.notifier).clone() {
            graph.set_notifier(notifier);
        }
        lock(&self.inner.state).sub_graphs.push(graph);
    }

    /// Owned sub-graphs in attach order
    pub fn sub_graphs(&self) -> Vec<Graph> {
        lock(&self.inner.state).sub_graphs.clone()
    }

    pub fn reader(&self) -> ReadableNode {
        ReadableNode { node: self.clone() }
    }

    fn notify(&self) {
        // Listeners may read this node, so the state lock must be released here.
        let notifier = read(&self.inner.notifier).clone();
        if let Some(notifier) = notifier {
            notifier.notify(&ChangeNotification {
                node_id: self.inner.id.clone(),
            });
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Read-only view of a [`Node`]
#[derive(Clone)]
pub struct ReadableNode {
    node: Node,
}

impl ReadableNode {
    pub fn id(&self) -> &str {
        self.node.id()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Identity of the node whose completion triggered this one
    pub fn triggered_by(&self) -> Option<&str> {
        self.node.inner.triggered_by.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.node.inner.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.node.inner.state).completed_at
    }

    pub fn is_done(&self) -> bool {
        lock(&self.node.inner.state).done
    }

    /// First value under `key`, empty when missing
    pub fn first(&self, key: &str) -> Vec<u8> {
        lock(&self.node.inner.state)
            .get(key)
            .and_then(|v| v.first().cloned())
            .unwrap_or_default()
    }

    pub fn first_str(&self, key: &str) -> String {
        String::from_utf8_lossy(&self.first(key)).into_owned()
    }

    /// Every value under `key`, empty when missing
    pub fn all(&self, key: &str) -> Vec<Vec<u8>> {
        lock(&self.node.inner.state)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn all_str(&self, key: &str) -> Vec<String> {
        self.all(key)
            .iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }

    /// Keys in the order they were first written
    pub fn keys(&self) -> Vec<String> {
        lock(&self.node.inner.state)
            .values
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Snapshot of every key with its values
    pub fn values(&self) -> Vec<(String, Vec<Vec<u8>>)> {
        lock(&self.node.inner.state).values.clone()
    }

    pub fn sub_graphs(&self) -> Vec<ReadableGraph> {
        self.node.sub_graphs().iter().map(Graph::reader).collect()
    }
}

impl fmt::Debug for ReadableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableNode")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("done", &self.is_done())
            .finish()
    }
}
