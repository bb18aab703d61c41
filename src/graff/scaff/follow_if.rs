// SPDX-License-Identifier: MIT

//! Join conditions evaluated against live run state

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::ConditionError;
use crate::graff::state::ReadableGraph;

/// Predicate deciding whether a join fires
pub trait FollowIf: Send + Sync + Debug {
    fn matches(&self, graph: &ReadableGraph) -> Result<bool, ConditionError>;
}

/// True when the first node named `block` has `key` equal to `value`.
///
/// Errors with `NodeNotFound` when no such node exists yet.
#[derive(Debug, Clone)]
pub struct KeyMatches {
    pub block: String,
    pub key: String,
    pub value: String,
}

impl FollowIf for KeyMatches {
    fn matches(&self, graph: &ReadableGraph) -> Result<bool, ConditionError> {
        let node = graph.first_node_by_name(&self.block)?;
        Ok(node.first(&self.key) == self.value.as_bytes())
    }
}

/// True when every named block has a node and all of those are done.
/// Missing nodes make it false rather than an error.
#[derive(Debug, Clone)]
pub struct NodesCompleted {
    pub blocks: Vec<String>,
}

impl FollowIf for NodesCompleted {
    fn matches(&self, graph: &ReadableGraph) -> Result<bool, ConditionError> {
        for name in &self.blocks {
            match graph.first_node_by_name(name) {
                Ok(node) if node.is_done() => continue,
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

pub fn key_matches(block: &str, key: &str, value: &str) -> Arc<dyn FollowIf> {
    Arc::new(KeyMatches {
        block: block.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub fn nodes_completed<S: AsRef<str>>(blocks: &[S]) -> Arc<dyn FollowIf> {
    Arc::new(NodesCompleted {
        blocks: blocks.iter().map(|b| b.as_ref().to_string()).collect(),
    })
}
