// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ActionError;
use crate::graff::scaff::{BlockAction, Scaff};
use crate::graff::state::{Graph, Node, ReadableGraph, ReadableNode};

/// Runs a nested scaff into a fresh sub-graph owned by this node
pub struct ScaffNode {
    pub scaff: Arc<Scaff>,
}

impl ScaffNode {
    pub fn new(scaff: Arc<Scaff>) -> Self {
        Self { scaff }
    }
}

#[async_trait]
impl BlockAction for ScaffNode {
    async fn run(
        &self,
        node: &Node,
        _graph: &ReadableGraph,
        _triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        let sub = Graph::new();
        node.add_sub_graph(sub.clone());
        self.scaff.go(&sub).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graff::actions::Input;

    #[tokio::test]
    async fn test_runs_nested_scaff_into_sub_graph() {
        let mut inner = Scaff::new();
        inner.add_block("inner", Input::new("from inside"));
        inner.set_entrypoint("inner").unwrap();

        let mut outer = Scaff::new();
        outer.add_block("nest", ScaffNode::new(Arc::new(inner)));
        outer.set_entrypoint("nest").unwrap();

        let graph = Graph::new();
        outer.go(&graph).await.unwrap();

        let nest = graph.reader().first_node_by_name("nest").unwrap();
        let subs = nest.sub_graphs();
        assert_eq!(subs.len(), 1);
        assert_eq!(
            subs[0].first_node_by_name("inner").unwrap().first_str("result"),
            "from inside"
        );
    }

    #[tokio::test]
    async fn test_nested_failure_propagates() {
        let inner = Scaff::new();
        let graph = Graph::new();
        let node = graph.new_node("nest", None);

        let err = ScaffNode::new(Arc::new(inner))
            .run(&node, &graph.reader(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("entrypoint not set"));
    }
}
