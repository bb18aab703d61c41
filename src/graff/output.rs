// SPDX-License-Identifier: MIT

//! JSON snapshots of a run's state tree

use serde::Serialize;

use crate::graff::state::{Notifier, ReadableGraph, ReadableNode};

/// Flattened view of a graph and all of its nested sub-graphs
#[derive(Debug, Clone, Serialize)]
pub struct Output {
    pub primary_graph_id: String,
    pub graphs: Vec<GraphOutput>,
    pub nodes: Vec<NodeOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphOutput {
    pub id: String,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeOutput {
    pub id: String,
    pub name: String,
    pub done: bool,
    pub triggered_by: Option<String>,
    pub values: Vec<ValueOutput>,
    pub sub_graph_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueOutput {
    pub name: String,
    pub values: Vec<String>,
}

/// Walk `graph` depth-first. Graphs appear parent before children; nodes in
/// creation order per graph.
pub fn snapshot(graph: &ReadableGraph) -> Output {
    let mut out = Output {
        primary_graph_id: graph.id().to_string(),
        graphs: Vec::new(),
        nodes: Vec::new(),
    };
    collect(graph, &mut out);
    out
}

fn collect(graph: &ReadableGraph, out: &mut Output) {
    let nodes = graph.nodes();
    out.graphs.push(GraphOutput {
        id: graph.id().to_string(),
        node_ids: nodes.iter().map(|n| n.id().to_string()).collect(),
    });

    for node in &nodes {
        let subs = node.sub_graphs();
        out.nodes.push(node_output(node, &subs));
        for sub in &subs {
            collect(sub, out);
        }
    }
}

fn node_output(node: &ReadableNode, subs: &[ReadableGraph]) -> NodeOutput {
    NodeOutput {
        id: node.id().to_string(),
        name: node.name().to_string(),
        done: node.is_done(),
        triggered_by: node.triggered_by().map(str::to_string),
        values: node
            .values()
            .into_iter()
            .map(|(name, values)| ValueOutput {
                name,
                values: values
                    .iter()
                    .map(|v| String::from_utf8_lossy(v).into_owned())
                    .collect(),
            })
            .collect(),
        sub_graph_ids: subs.iter().map(|g| g.id().to_string()).collect(),
    }
}

pub fn to_json(graph: &ReadableGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string(&snapshot(graph))
}

/// Log a pretty snapshot of `graph` on every change
pub fn print_updates(notifier: &Notifier, graph: ReadableGraph) {
    notifier.listen(move |change| match serde_json::to_string_pretty(&snapshot(&graph)) {
        Ok(json) => log::info!("node {} changed:\n{}", change.node_id, json),
        Err(e) => log::warn!("failed to serialize graph snapshot: {}", e),
    });
}
