// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::error::ActionError;
use crate::graff::scaff::BlockAction;
use crate::graff::state::{Node, ReadableGraph, ReadableNode};

/// Injects a fixed value as the node's `result`
#[derive(Debug, Clone)]
pub struct Input {
    pub value: String,
}

impl Input {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[async_trait]
impl BlockAction for Input {
    async fn run(
        &self,
        node: &Node,
        _graph: &ReadableGraph,
        _triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        node.set_str("result", &self.value);
        Ok(())
    }
}
