// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::error::ActionError;
use crate::graff::scaff::BlockAction;
use crate::graff::state::{Node, ReadableGraph, ReadableNode};

/// Prints the triggering node's values for `key` to stdout
#[derive(Debug, Clone)]
pub struct Print {
    pub key: String,
}

impl Default for Print {
    fn default() -> Self {
        Self {
            key: "result".to_string(),
        }
    }
}

impl Print {
    fn lines(&self, triggered_by: &ReadableNode) -> Vec<String> {
        triggered_by
            .all_str(&self.key)
            .into_iter()
            .map(|v| format!("[{}] {}", triggered_by.name(), v))
            .collect()
    }
}

#[async_trait]
impl BlockAction for Print {
    async fn run(
        &self,
        _node: &Node,
        _graph: &ReadableGraph,
        triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        let Some(source) = triggered_by else {
            log::info!("Print block triggered without a source node");
            return Ok(());
        };
        log::debug!("Print block triggered by {}", source.id());
        for line in self.lines(source) {
            println!("{}", line);
        }
        Ok(())
    }
}
