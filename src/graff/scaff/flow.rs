// SPDX-License-Identifier: MIT

//! Concurrent scheduler behind [`Scaff::go`](super::Scaff::go)
//!
//! A single dispatcher owns the work queue. Every candidate block arrives as a
//! [`FlowEvent::Ready`] unit; its join condition is checked in the dispatcher
//! against the live graph, and only then is a task spawned to run the block.
//! Finished tasks enqueue their outgoing joins before reporting back, so the
//! outstanding counter cannot reach zero while work is still reachable.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::blocks::Block;
use super::follow_if::FollowIf;
use super::joins::{Join, Joins};
use crate::error::ScaffError;
use crate::graff::state::{lock, Graph, ReadableNode};

/// A candidate block execution waiting for the dispatcher
struct Unit {
    block: Arc<Block>,
    condition: Option<Arc<dyn FollowIf>>,
    triggered_by: Option<ReadableNode>,
    /// Source block of the join this unit came from
    from: Option<String>,
}

enum FlowEvent {
    Ready(Unit),
    Finished,
}

/// Shared bookkeeping for one call to `go`
#[derive(Default)]
struct FlowRun {
    error: Mutex<Option<ScaffError>>,
    outstanding: AtomicUsize,
}

impl FlowRun {
    /// Keep the first error; later ones are only logged
    fn record(&self, err: ScaffError) {
        let mut slot = lock(&self.error);
        if slot.is_none() {
            log::error!("{}", err);
            *slot = Some(err);
        } else {
            log::debug!("discarding error after first failure: {}", err);
        }
    }

    fn failed(&self) -> bool {
        lock(&self.error).is_some()
    }

    fn take_error(&self) -> Option<ScaffError> {
        lock(&self.error).take()
    }
}

pub(crate) struct FlowMgr<'a> {
    joins: &'a Joins,
    entrypoint: Arc<Block>,
}

impl<'a> FlowMgr<'a> {
    pub(crate) fn new(joins: &'a Joins, entrypoint: Arc<Block>) -> Self {
        Self { joins, entrypoint }
    }

    /// Drive one run to completion and return the first error, if any
    pub(crate) async fn run(&self, graph: &Graph) -> Result<(), ScaffError> {
        let run = Arc::new(FlowRun::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        run.outstanding.store(1, Ordering::SeqCst);
        let _ = tx.send(FlowEvent::Ready(Unit {
            block: self.entrypoint.clone(),
            condition: None,
            triggered_by: None,
            from: None,
        }));

        while let Some(event) = rx.recv().await {
            match event {
                FlowEvent::Ready(unit) => {
                    if !self.dispatch(unit, graph, &run, &tx) {
                        run.outstanding.fetch_sub(1, Ordering::SeqCst);
                    }
                }
                FlowEvent::Finished => {
                    run.outstanding.fetch_sub(1, Ordering::SeqCst);
                }
            }

            if run.outstanding.load(Ordering::SeqCst) == 0 {
                break;
            }
        }

        match run.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Consider one unit; returns true when a task was spawned for it
    fn dispatch(
        &self,
        unit: Unit,
        graph: &Graph,
        run: &Arc<FlowRun>,
        tx: &UnboundedSender<FlowEvent>,
    ) -> bool {
        if run.failed() {
            log::debug!("run failed, skipping block {}", unit.block.name);
            return false;
        }

        if let Some(condition) = &unit.condition {
            match condition.matches(&graph.reader()) {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("condition not met for block {}", unit.block.name);
                    return false;
                }
                Err(e) => {
                    run.record(ScaffError::Condition {
                        from: unit.from.clone().unwrap_or_default(),
                        to: unit.block.name.clone(),
                        source: e,
                    });
                    return false;
                }
            }
        }

        let joins: Vec<Arc<Join>> = self
            .joins
            .get(&unit.block.name)
            .map(<[Arc<Join>]>::to_vec)
            .unwrap_or_default();

        tokio::spawn(run_unit(unit, joins, graph.clone(), run.clone(), tx.clone()));
        true
    }
}

async fn run_unit(
    unit: Unit,
    joins: Vec<Arc<Join>>,
    graph: Graph,
    run: Arc<FlowRun>,
    tx: UnboundedSender<FlowEvent>,
) {
    let name = unit.block.name.clone();
    let outcome = AssertUnwindSafe(execute(unit, joins, &graph, &run, &tx))
        .catch_unwind()
        .await;

    if outcome.is_err() {
        run.record(ScaffError::BlockPanicked { block: name });
    }
    let _ = tx.send(FlowEvent::Finished);
}

async fn execute(
    unit: Unit,
    joins: Vec<Arc<Join>>,
    graph: &Graph,
    run: &FlowRun,
    tx: &UnboundedSender<FlowEvent>,
) {
    let block = unit.block;
    log::info!("Executing block: {}", block.name);

    let node = graph.new_node(&block.name, unit.triggered_by.as_ref());
    let reader = graph.reader();

    if let Err(source) = block
        .action
        .run(&node, &reader, unit.triggered_by.as_ref())
        .await
    {
        run.record(ScaffError::Block {
            block: block.name.clone(),
            source,
        });
        return;
    }

    node.mark_done();
    log::info!("Block {} completed", block.name);

    let trigger = node.reader();
    for join in joins {
        run.outstanding.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(FlowEvent::Ready(Unit {
            block: join.to.clone(),
            condition: join.condition.clone(),
            triggered_by: Some(trigger.clone()),
            from: Some(block.name.clone()),
        }));
    }
}
