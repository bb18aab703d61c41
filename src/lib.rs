// SPDX-License-Identifier: MIT

//! graff-rs: reusable workflow blueprints run as concurrent, growing graphs
//!
//! A [`Scaff`] names its blocks and the joins between them. Each call to
//! [`Scaff::go`] runs it into a fresh [`Graph`], creating one node per block
//! execution and starting blocks in parallel as their predecessors finish.

pub mod config;
pub mod error;
pub mod graff;
pub mod llm;

pub use error::{ActionError, GraffError};
pub use graff::{
    BlockAction, ChangeNotification, FollowIf, Graph, Node, Notifier, ReadableGraph,
    ReadableNode, Scaff, ScaffLoader,
};
