// SPDX-License-Identifier: MIT

//! Parallel nested runs, one per input item

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

use crate::error::{ActionError, BranchError, BranchFailure, FanOutError};
use crate::graff::scaff::{BlockAction, Scaff};
use crate::graff::state::{Graph, Node, ReadableGraph, ReadableNode};

/// Runs `scaff` once per item and gathers one output from each run.
///
/// Items are every `in_key` value of `in_node` (or of the triggering node when
/// `in_node` is unset). Each run gets its own sub-graph, attached to this node
/// in item order and seeded with a node holding the item. Once every run has
/// succeeded, the `out_key` values of each run's `out_node` are appended to
/// `result_key` in item order.
pub struct FanOut {
    pub scaff: Arc<Scaff>,
    pub in_node: Option<String>,
    pub in_key: String,
    pub out_node: String,
    pub out_key: String,
    pub result_key: String,
}

impl FanOut {
    pub fn new(scaff: Arc<Scaff>) -> Self {
        Self {
            scaff,
            in_node: None,
            in_key: "result".to_string(),
            out_node: "result".to_string(),
            out_key: "result".to_string(),
            result_key: "result".to_string(),
        }
    }

    pub fn in_node(mut self, name: &str) -> Self {
        self.in_node = Some(name.to_string());
        self
    }

    pub fn out_node(mut self, name: &str) -> Self {
        self.out_node = name.to_string();
        self
    }

    /// Source node and the items it holds
    fn inputs(
        &self,
        graph: &ReadableGraph,
        triggered_by: Option<&ReadableNode>,
    ) -> Result<(String, Vec<Vec<u8>>), ActionError> {
        match &self.in_node {
            Some(name) => {
                let node = graph.first_node_by_name(name)?;
                Ok((name.clone(), node.all(&self.in_key)))
            }
            None => {
                let node =
                    triggered_by.ok_or("no triggering node provided, and no in_node specified")?;
                Ok((node.name().to_string(), node.all(&self.in_key)))
            }
        }
    }

    async fn run_branch(&self, graph: &Graph) -> Result<Vec<String>, BranchError> {
        self.scaff.go(graph).await?;
        let out = graph
            .first_node_by_name(&self.out_node)
            .ok_or_else(|| BranchError::MissingOutNode {
                name: self.out_node.clone(),
            })?;
        Ok(out.reader().all_str(&self.out_key))
    }
}

#[async_trait]
impl BlockAction for FanOut {
    async fn run(
        &self,
        node: &Node,
        graph: &ReadableGraph,
        triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        let (seed_name, items) = self.inputs(graph, triggered_by)?;
        log::info!("Fanning out {} items from {}", items.len(), seed_name);

        let branches: Vec<Graph> = items
            .into_iter()
            .map(|item| {
                let sub = Graph::new();
                sub.new_node(&seed_name, None).add(&self.in_key, item);
                node.add_sub_graph(sub.clone());
                sub
            })
            .collect();

        let outcomes = join_all(branches.iter().map(|sub| self.run_branch(sub))).await;

        let mut outputs = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(values) => outputs.push(values),
                Err(source) => failures.push(BranchFailure { index, source }),
            }
        }
        if !failures.is_empty() {
            return Err(Box::new(FanOutError { failures }));
        }

        for value in outputs.iter().flatten() {
            node.add_str(&self.result_key, value);
        }
        Ok(())
    }
}
