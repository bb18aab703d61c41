// SPDX-License-Identifier: MIT

//! Named steps of a scaff

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{ActionError, ScaffError};
use crate::graff::state::{Node, ReadableGraph, ReadableNode};

/// The work a block performs.
///
/// `node` is the fresh node created for this execution; `graph` is a
/// read-only view of the whole run; `triggered_by` is the node whose
/// completion caused this block to run (`None` for the entrypoint).
#[async_trait]
pub trait BlockAction: Send + Sync {
    async fn run(
        &self,
        node: &Node,
        graph: &ReadableGraph,
        triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError>;
}

/// A named step definition
pub struct Block {
    pub name: String,
    pub action: Arc<dyn BlockAction>,
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("name", &self.name).finish()
    }
}

/// Registry of blocks in insertion order
#[derive(Default)]
pub struct Blocks {
    blocks: Vec<Arc<Block>>,
}

impl Blocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block and return its name. Duplicates are caught by [`Blocks::validate`].
    pub fn add(&mut self, name: &str, action: impl BlockAction + 'static) -> String {
        self.add_shared(name, Arc::new(action))
    }

    pub fn add_shared(&mut self, name: &str, action: Arc<dyn BlockAction>) -> String {
        self.blocks.push(Arc::new(Block {
            name: name.to_string(),
            action,
        }));
        name.to_string()
    }

    /// First block registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<Block>> {
        self.blocks.iter().find(|b| b.name == name).cloned()
    }

    pub fn all(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn validate(&self) -> Result<(), ScaffError> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.name.as_str()) {
                return Err(ScaffError::DuplicateBlock {
                    name: block.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Blocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.blocks.iter().map(|b| &b.name))
            .finish()
    }
}
