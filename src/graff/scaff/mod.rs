// SPDX-License-Identifier: MIT

//! Reusable workflow blueprint
//!
//! A [`Scaff`] is a set of named blocks, the joins between them and an
//! entrypoint. It is built once and can then be run any number of times,
//! concurrently if needed, each run writing into its own [`Graph`].

pub mod blocks;
mod flow;
pub mod follow_if;
pub mod joins;

pub use blocks::{Block, BlockAction, Blocks};
pub use follow_if::{FollowIf, KeyMatches, NodesCompleted};
pub use joins::{Join, Joins};

use std::sync::Arc;

use crate::error::{JoinSide, ScaffError};
use crate::graff::state::Graph;
use flow::FlowMgr;

#[derive(Debug, Default)]
pub struct Scaff {
    blocks: Blocks,
    joins: Joins,
    entrypoint: Option<Arc<Block>>,
}

impl Scaff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block; returns its name for use in joins
    pub fn add_block(&mut self, name: &str, action: impl BlockAction + 'static) -> String {
        self.blocks.add(name, action)
    }

    pub fn add_block_shared(&mut self, name: &str, action: Arc<dyn BlockAction>) -> String {
        self.blocks.add_shared(name, action)
    }

    pub fn add_join(
        &mut self,
        from: &str,
        to: &str,
        condition: Option<Arc<dyn FollowIf>>,
    ) -> Result<(), ScaffError> {
        self.joins.add(&self.blocks, from, to, condition)
    }

    pub fn set_entrypoint(&mut self, name: &str) -> Result<(), ScaffError> {
        let block = self
            .blocks
            .get(name)
            .ok_or_else(|| ScaffError::BlockNotFound {
                name: name.to_string(),
                side: JoinSide::To,
            })?;
        self.entrypoint = Some(block);
        Ok(())
    }

    pub fn entrypoint(&self) -> Option<&str> {
        self.entrypoint.as_ref().map(|b| b.name.as_str())
    }

    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    pub fn joins(&self) -> &Joins {
        &self.joins
    }

    pub fn validate(&self) -> Result<(), ScaffError> {
        if self.entrypoint.is_none() {
            return Err(ScaffError::EntrypointNotSet);
        }
        self.blocks.validate()
    }

    /// Execute the blueprint into `graph`.
    ///
    /// Returns once every reachable block has run or been skipped. On failure
    /// the first error is returned and the graph keeps whatever was written.
    pub async fn go(&self, graph: &Graph) -> Result<(), ScaffError> {
        self.validate()?;
        let entrypoint = self
            .entrypoint
            .clone()
            .ok_or(ScaffError::EntrypointNotSet)?;

        log::info!("Starting run {} at block {}", graph.id(), entrypoint.name);
        let result = FlowMgr::new(&self.joins, entrypoint).run(graph).await;
        log::info!("Run {} finished with {} nodes", graph.id(), graph.len());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::graff::state::{Node, ReadableGraph, ReadableNode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes `<parent result> :: <name>` or just `<name>` at the entrypoint
    struct Chain;

    #[async_trait]
    impl BlockAction for Chain {
        async fn run(
            &self,
            node: &Node,
            _graph: &ReadableGraph,
            triggered_by: Option<&ReadableNode>,
        ) -> Result<(), ActionError> {
            let value = match triggered_by {
                Some(parent) => format!("{} :: {}", parent.first_str("result"), node.name()),
                None => node.name().to_string(),
            };
            node.set_str("result", &value);
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl BlockAction for Fail {
        async fn run(
            &self,
            _node: &Node,
            _graph: &ReadableGraph,
            _triggered_by: Option<&ReadableNode>,
        ) -> Result<(), ActionError> {
            Err("boom".into())
        }
    }

    struct Panics;

    #[async_trait]
    impl BlockAction for Panics {
        async fn run(
            &self,
            _node: &Node,
            _graph: &ReadableGraph,
            _triggered_by: Option<&ReadableNode>,
        ) -> Result<(), ActionError> {
            panic!("block exploded");
        }
    }

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl BlockAction for Count {
        async fn run(
            &self,
            _node: &Node,
            _graph: &ReadableGraph,
            _triggered_by: Option<&ReadableNode>,
        ) -> Result<(), ActionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_single_block() {
        let mut scaff = Scaff::new();
        scaff.add_block("only", Chain);
        scaff.set_entrypoint("only").unwrap();

        let graph = Graph::new();
        scaff.go(&graph).await.unwrap();

        let node = graph.reader().first_node_by_name("only").unwrap();
        assert_eq!(node.first_str("result"), "only");
        assert!(node.is_done());
        assert_eq!(graph.len(), 1);
    }

    #[tokio::test]
    async fn test_entrypoint_not_set() {
        let mut scaff = Scaff::new();
        scaff.add_block("a", Chain);

        let graph = Graph::new();
        assert!(matches!(
            scaff.go(&graph).await,
            Err(ScaffError::EntrypointNotSet)
        ));
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_empty_scaff_fails_validation() {
        let graph = Graph::new();
        assert!(matches!(
            Scaff::new().go(&graph).await,
            Err(ScaffError::EntrypointNotSet)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_block_aborts_before_run() {
        let mut scaff = Scaff::new();
        scaff.add_block("a", Chain);
        scaff.add_block("a", Chain);
        scaff.set_entrypoint("a").unwrap();

        let graph = Graph::new();
        let err = scaff.go(&graph).await.unwrap_err();
        assert!(matches!(err, ScaffError::DuplicateBlock { ref name } if name == "a"));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_set_entrypoint_unknown_block() {
        let mut scaff = Scaff::new();
        assert!(matches!(
            scaff.set_entrypoint("ghost"),
            Err(ScaffError::BlockNotFound { .. })
        ));
        assert_eq!(scaff.entrypoint(), None);
    }

    #[tokio::test]
    async fn test_failure_stops_branch() {
        let mut scaff = Scaff::new();
        scaff.add_block("a", Chain);
        scaff.add_block("b", Fail);
        scaff.add_block("c", Chain);
        scaff.add_join("a", "b", None).unwrap();
        scaff.add_join("b", "c", None).unwrap();
        scaff.set_entrypoint("a").unwrap();

        let graph = Graph::new();
        let err = scaff.go(&graph).await.unwrap_err();

        assert_eq!(err.block(), Some("b"));
        assert!(err.to_string().contains("boom"));
        let reader = graph.reader();
        assert!(reader.first_node_by_name("a").unwrap().is_done());
        assert!(!reader.first_node_by_name("b").unwrap().is_done());
        assert!(reader.nodes_by_name("c").is_empty());
    }

    #[tokio::test]
    async fn test_panicking_block_is_reported() {
        let mut scaff = Scaff::new();
        scaff.add_block("a", Panics);
        scaff.set_entrypoint("a").unwrap();

        let err = scaff.go(&Graph::new()).await.unwrap_err();
        assert!(matches!(err, ScaffError::BlockPanicked { ref block } if block == "a"));
    }

    #[tokio::test]
    async fn test_condition_error_is_recorded() {
        let mut scaff = Scaff::new();
        scaff.add_block("a", Chain);
        scaff.add_block("b", Chain);
        scaff
            .add_join("a", "b", Some(follow_if::key_matches("ghost", "k", "v")))
            .unwrap();
        scaff.set_entrypoint("a").unwrap();

        let err = scaff.go(&Graph::new()).await.unwrap_err();
        match err {
            ScaffError::Condition { from, to, source } => {
                assert_eq!(from, "a");
                assert_eq!(to, "b");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_two_joins_run_target_twice() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scaff = Scaff::new();
        scaff.add_block("a", Chain);
        scaff.add_block("b", Chain);
        scaff.add_block("c", Chain);
        scaff.add_block("d", Count(count.clone()));
        scaff.add_join("a", "b", None).unwrap();
        scaff.add_join("a", "c", None).unwrap();
        scaff.add_join("b", "d", None).unwrap();
        scaff.add_join("c", "d", None).unwrap();
        scaff.set_entrypoint("a").unwrap();

        let graph = Graph::new();
        scaff.go(&graph).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        let runs = graph.reader().nodes_by_name("d");
        assert_eq!(runs.len(), 2);
        assert_ne!(runs[0].triggered_by(), runs[1].triggered_by());
    }
}
