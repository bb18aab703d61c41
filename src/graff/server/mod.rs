// SPDX-License-Identifier: MIT

//! Live viewer: serves graph snapshots over HTTP and Server-Sent Events

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::graff::output::{self, Output};
use crate::graff::state::{Notifier, ReadableGraph};

/// Shared state behind the viewer routes
#[derive(Clone)]
pub struct ViewerState {
    pub graph: ReadableGraph,
    pub updates: broadcast::Sender<String>,
}

impl ViewerState {
    /// Viewer for `graph`, wired to publish a snapshot on every change
    pub fn new(notifier: &Notifier, graph: ReadableGraph) -> Self {
        let (updates, _) = broadcast::channel(256);
        broadcast_changes(notifier, graph.clone(), updates.clone());
        Self { graph, updates }
    }
}

/// Push a JSON snapshot of `graph` to `tx` on every change
pub fn broadcast_changes(notifier: &Notifier, graph: ReadableGraph, tx: broadcast::Sender<String>) {
    notifier.listen(move |_| match output::to_json(&graph) {
        // No subscribers is fine; nobody is watching yet.
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => log::warn!("failed to serialize graph snapshot: {}", e),
    });
}

pub fn router(state: ViewerState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/graph", get(graph_snapshot))
        .route("/api/graph/stream", get(graph_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: ViewerState) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Viewer listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn graph_snapshot(State(state): State<ViewerState>) -> Json<Output> {
    Json(output::snapshot(&state.graph))
}

async fn graph_stream(
    State(state): State<ViewerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.updates.subscribe()).filter_map(|msg| match msg {
        Ok(json) => Some(Ok(Event::default().data(json))),
        Err(e) => {
            log::debug!("viewer subscriber lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graff::state::Graph;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_snapshot_route_reads_live_graph() {
        let notifier = Notifier::new();
        let graph = Graph::with_notifier(notifier.clone());
        let state = ViewerState::new(&notifier, graph.reader());

        graph.new_node("a", None).set_str("result", "hi");

        let Json(out) = graph_snapshot(State(state)).await;
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].values[0].values, vec!["hi"]);
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let notifier = Notifier::new();
        let graph = Graph::with_notifier(notifier.clone());
        let state = ViewerState::new(&notifier, graph.reader());
        let mut rx = state.updates.subscribe();

        let node = graph.new_node("a", None);
        node.set_str("result", "one");
        node.add_str("result", "two");

        let first: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["nodes"][0]["values"][0]["values"], json!(["one"]));
        assert_eq!(second["nodes"][0]["values"][0]["values"], json!(["one", "two"]));
    }
}
