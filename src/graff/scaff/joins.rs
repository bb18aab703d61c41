// SPDX-License-Identifier: MIT

//! Directed edges between blocks

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::blocks::{Block, Blocks};
use super::follow_if::FollowIf;
use crate::error::{ConditionError, JoinSide, ScaffError};
use crate::graff::state::ReadableGraph;

/// Edge from one block to another, optionally gated by a condition
pub struct Join {
    pub from: Arc<Block>,
    pub to: Arc<Block>,
    pub condition: Option<Arc<dyn FollowIf>>,
}

impl Join {
    /// Evaluate the condition; an unconditional join always fires
    pub fn triggers_met(&self, graph: &ReadableGraph) -> Result<bool, ConditionError> {
        match &self.condition {
            Some(condition) => condition.matches(graph),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join")
            .field("from", &self.from.name)
            .field("to", &self.to.name)
            .field("condition", &self.condition)
            .finish()
    }
}

/// Outgoing joins keyed by source block name
#[derive(Debug, Default)]
pub struct Joins {
    by_from: HashMap<String, Vec<Arc<Join>>>,
}

impl Joins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a join. Both endpoints must already be in `blocks`.
    pub fn add(
        &mut self,
        blocks: &Blocks,
        from: &str,
        to: &str,
        condition: Option<Arc<dyn FollowIf>>,
    ) -> Result<(), ScaffError> {
        let from_block = blocks.get(from).ok_or_else(|| ScaffError::BlockNotFound {
            name: from.to_string(),
            side: JoinSide::From,
        })?;
        let to_block = blocks.get(to).ok_or_else(|| ScaffError::BlockNotFound {
            name: to.to_string(),
            side: JoinSide::To,
        })?;

        self.by_from
            .entry(from.to_string())
            .or_default()
            .push(Arc::new(Join {
                from: from_block,
                to: to_block,
                condition,
            }));
        Ok(())
    }

    /// Joins leaving `from`, in insertion order
    pub fn get(&self, from: &str) -> Option<&[Arc<Join>]> {
        self.by_from.get(from).map(Vec::as_slice)
    }

    /// Total number of joins
    pub fn len(&self) -> usize {
        self.by_from.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
