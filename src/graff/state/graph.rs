// SPDX-License-Identifier: MIT

//! Collection of nodes produced by one execution of a scaff

use std::fmt;
use std::sync::{Arc, RwLock};

use super::node::{Node, ReadableNode};
use super::notifier::Notifier;
use super::{read, write, NotifierSlot};
use crate::error::StateError;

struct GraphInner {
    id: String,
    /// Creation order
    nodes: RwLock<Vec<Node>>,
    notifier: NotifierSlot,
}

/// Per-run state container. Cheap to clone; clones share the same nodes.
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GraphInner {
                id: uuid::Uuid::new_v4().to_string(),
                nodes: RwLock::new(Vec::new()),
                notifier: Arc::new(RwLock::new(None)),
            }),
        }
    }

    pub fn with_notifier(notifier: Notifier) -> Self {
        let graph = Self::new();
        graph.set_notifier(notifier);
        graph
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Attach a notifier. Existing nodes and attached sub-graphs pick it up too.
    pub fn set_notifier(&self, notifier: Notifier) {
        *write(&self.inner.notifier) = Some(notifier.clone());
        for node in self.nodes() {
            for sub in node.sub_graphs() {
                sub.set_notifier(notifier.clone());
            }
        }
    }

    pub fn notifier(&self) -> Option<Notifier> {
        read(&self.inner.notifier).clone()
    }

    /// Create and register a fresh node for block `name`
    pub fn new_node(&self, name: &str, triggered_by: Option<&ReadableNode>) -> Node {
        let node = Node::new(name, triggered_by, self.inner.notifier.clone());
        write(&self.inner.nodes).push(node.clone());
        log::debug!("graph {}: new node {} ({})", self.inner.id, name, node.id());
        node
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        read(&self.inner.nodes).iter().find(|n| n.id() == id).cloned()
    }

    /// Every node created for block `name`, in creation order
    pub fn nodes_by_name(&self, name: &str) -> Vec<Node> {
        read(&self.inner.nodes)
            .iter()
            .filter(|n| n.name() == name)
            .cloned()
            .collect()
    }

    pub fn first_node_by_name(&self, name: &str) -> Option<Node> {
        read(&self.inner.nodes).iter().find(|n| n.name() == name).cloned()
    }

    pub fn nodes(&self) -> Vec<Node> {
        read(&self.inner.nodes).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.inner.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reader(&self) -> ReadableGraph {
        ReadableGraph {
            graph: self.clone(),
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.inner.id)
            .field("nodes", &self.len())
            .finish()
    }
}

/// Read-only view over a [`Graph`], handed to actions and conditions
#[derive(Clone)]
pub struct ReadableGraph {
    graph: Graph,
}

impl ReadableGraph {
    pub fn id(&self) -> &str {
        self.graph.id()
    }

    pub fn node(&self, id: &str) -> Result<ReadableNode, StateError> {
        self.graph
            .node(id)
            .map(|n| n.reader())
            .ok_or_else(|| StateError::NodeIdNotFound { id: id.to_string() })
    }

    /// Earliest-created node for block `name`
    pub fn first_node_by_name(&self, name: &str) -> Result<ReadableNode, StateError> {
        self.graph
            .first_node_by_name(name)
            .map(|n| n.reader())
            .ok_or_else(|| StateError::NodeNotFound {
                name: name.to_string(),
            })
    }

    pub fn nodes_by_name(&self, name: &str) -> Vec<ReadableNode> {
        self.graph
            .nodes_by_name(name)
            .iter()
            .map(Node::reader)
            .collect()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.graph.nodes().iter().map(|n| n.id().to_string()).collect()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.graph
            .nodes()
            .iter()
            .map(|n| n.name().to_string())
            .collect()
    }

    pub fn nodes(&self) -> Vec<ReadableNode> {
        self.graph.nodes().iter().map(Node::reader).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

impl fmt::Debug for ReadableGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableGraph")
            .field("id", &self.id())
            .field("nodes", &self.len())
            .finish()
    }
}
