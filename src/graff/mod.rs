// SPDX-License-Identifier: MIT

//! Workflow blueprints and their concurrent execution
//!
//! - [scaff] - blocks, joins, conditions and the scheduler
//! - [state] - per-run graphs of nodes and change notifications
//! - [actions] - ready-made block actions
//! - [output] - JSON snapshots of run state
//! - [loader] - YAML blueprints
//! - [server] - live viewer over HTTP/SSE

pub mod actions;
pub mod loader;
pub mod output;
pub mod scaff;
pub mod server;
pub mod state;
pub mod types;

pub use loader::ScaffLoader;
pub use scaff::{Block, BlockAction, FollowIf, Scaff};
pub use state::{ChangeNotification, Graph, Node, Notifier, ReadableGraph, ReadableNode};
