// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::error::ActionError;
use crate::graff::scaff::BlockAction;
use crate::graff::state::{Node, ReadableGraph, ReadableNode};

/// Splits the triggering node's `in_key` text into separate `out_key` values.
/// Pieces are trimmed and blanks are dropped.
#[derive(Debug, Clone)]
pub struct Split {
    pub in_key: String,
    pub out_key: String,
    pub separator: String,
}

impl Default for Split {
    fn default() -> Self {
        Self {
            in_key: "result".to_string(),
            out_key: "result".to_string(),
            separator: "\n".to_string(),
        }
    }
}

#[async_trait]
impl BlockAction for Split {
    async fn run(
        &self,
        node: &Node,
        _graph: &ReadableGraph,
        triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        let source = triggered_by.ok_or("split needs a triggering node")?;
        let text = source.first_str(&self.in_key);

        for piece in text
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            node.add_str(&self.out_key, piece);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graff::state::Graph;

    #[tokio::test]
    async fn test_split_lines() {
        let graph = Graph::new();
        let source = graph.new_node("ideas", None);
        source.set_str("result", " one \n\ntwo\n  three\n");
        let node = graph.new_node("split", Some(&source.reader()));

        Split::default()
            .run(&node, &graph.reader(), Some(&source.reader()))
            .await
            .unwrap();

        assert_eq!(node.reader().all_str("result"), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_split_custom_keys() {
        let graph = Graph::new();
        let source = graph.new_node("csv", None);
        source.set_str("line", "a,b");
        let node = graph.new_node("split", None);

        let split = Split {
            in_key: "line".into(),
            out_key: "cells".into(),
            separator: ",".into(),
        };
        split
            .run(&node, &graph.reader(), Some(&source.reader()))
            .await
            .unwrap();

        assert_eq!(node.reader().all_str("cells"), vec!["a", "b"]);
        assert!(node.reader().all("result").is_empty());
    }

    #[tokio::test]
    async fn test_split_without_trigger_fails() {
        let graph = Graph::new();
        let node = graph.new_node("split", None);
        assert!(Split::default()
            .run(&node, &graph.reader(), None)
            .await
            .is_err());
    }
}
