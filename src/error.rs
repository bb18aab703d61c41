// SPDX-License-Identifier: MIT

//! Typed error handling for graff-rs
//!
//! Every layer gets its own `thiserror` enum; `GraffError` ties them together
//! for callers (such as the CLI) that just want one type to bubble up.

use thiserror::Error;

/// Error type returned by block actions.
///
/// Actions are user code, so any error type is accepted.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for graff-rs
#[derive(Debug, Error)]
pub enum GraffError {
    #[error(transparent)]
    Scaff(#[from] ScaffError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Lookup failures against a run's graph
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// No node with the given block name exists in the graph
    #[error("node not found: {name}")]
    NodeNotFound { name: String },

    /// No node with the given identity exists in the graph
    #[error("node id not found: {id}")]
    NodeIdNotFound { id: String },
}

/// Failures raised while evaluating a join condition
#[derive(Debug, Clone, Error)]
pub enum ConditionError {
    #[error("error getting node state: {0}")]
    State(#[from] StateError),

    /// A custom predicate failed for its own reasons
    #[error("condition failed: {0}")]
    Failed(String),
}

impl ConditionError {
    /// True when the predicate failed only because a node does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::State(StateError::NodeNotFound { .. }))
    }
}

/// Which end of a join referenced an unknown block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    From,
    To,
}

impl std::fmt::Display for JoinSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinSide::From => write!(f, "from"),
            JoinSide::To => write!(f, "to"),
        }
    }
}

/// Blueprint validation and execution errors
#[derive(Debug, Error)]
pub enum ScaffError {
    // ------ Blueprint errors ------
    #[error("error validating scaff: entrypoint not set")]
    EntrypointNotSet,

    #[error("error validating scaff: block name not unique: {name}")]
    DuplicateBlock { name: String },

    #[error("block not found: {name} ({side} side)")]
    BlockNotFound { name: String, side: JoinSide },

    // ------ Execution errors ------
    #[error("error running block '{block}': {source}")]
    Block {
        block: String,
        #[source]
        source: ActionError,
    },

    #[error("block '{block}' panicked while running")]
    BlockPanicked { block: String },

    #[error("error checking join condition {from} -> {to}: {source}")]
    Condition {
        from: String,
        to: String,
        #[source]
        source: ConditionError,
    },
}

impl ScaffError {
    /// Name of the block an execution error originated from, if any
    pub fn block(&self) -> Option<&str> {
        match self {
            Self::Block { block, .. } | Self::BlockPanicked { block } => Some(block),
            Self::Condition { from, .. } => Some(from),
            _ => None,
        }
    }
}

/// Why a single fan-out branch failed
#[derive(Debug, Error)]
pub enum BranchError {
    #[error("error running sub-graph: {0}")]
    Run(#[from] ScaffError),

    #[error("could not find out node with name: {name}")]
    MissingOutNode { name: String },
}

/// A failed fan-out branch and its position in the input
#[derive(Debug, Error)]
#[error("[{index}] {source}")]
pub struct BranchFailure {
    pub index: usize,
    #[source]
    pub source: BranchError,
}

/// Every branch failure of one fan-out, in input order
#[derive(Debug, Error)]
#[error("{} fan-out branch(es) failed; {}", .failures.len(), join_failures(.failures))]
pub struct FanOutError {
    pub failures: Vec<BranchFailure>,
}

fn join_failures(failures: &[BranchFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Language-model backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Non-success status from the backend
    #[error("API error from {provider} ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// Response body could not be understood
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Blueprint file loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("blueprint file not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// An `llm` block was declared but no client was supplied
    #[error("block '{block}' needs an LLM client but none was configured")]
    MissingLlmClient { block: String },

    #[error(transparent)]
    Scaff(#[from] ScaffError),
}

/// Environment / CLI configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_error_names_block() {
        let err = ScaffError::Block {
            block: "summarise".to_string(),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "error running block 'summarise': boom");
        assert_eq!(err.block(), Some("summarise"));
    }

    #[test]
    fn test_block_not_found_names_side() {
        let err = ScaffError::BlockNotFound {
            name: "ghost".to_string(),
            side: JoinSide::To,
        };
        assert_eq!(err.to_string(), "block not found: ghost (to side)");
        assert_eq!(err.block(), None);
    }

    #[test]
    fn test_condition_error_not_found() {
        let err = ConditionError::from(StateError::NodeNotFound {
            name: "a".to_string(),
        });
        assert!(err.is_not_found());
        assert!(!ConditionError::Failed("nope".into()).is_not_found());
    }

    #[test]
    fn test_fan_out_error_lists_branches() {
        let err = FanOutError {
            failures: vec![
                BranchFailure {
                    index: 0,
                    source: BranchError::Run(ScaffError::EntrypointNotSet),
                },
                BranchFailure {
                    index: 2,
                    source: BranchError::MissingOutNode {
                        name: "write".to_string(),
                    },
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 fan-out branch(es) failed; [0] error running sub-graph: error validating scaff: \
             entrypoint not set; [2] could not find out node with name: write"
        );
        let first: &dyn std::error::Error = &err.failures[0];
        assert!(first.source().is_some());
    }
}
