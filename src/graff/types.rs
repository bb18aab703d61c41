// SPDX-License-Identifier: MIT

//! YAML schema for scaff blueprints

use serde::{Deserialize, Serialize};

fn default_key() -> String {
    "result".to_string()
}

fn default_separator() -> String {
    "\n".to_string()
}

/// A complete blueprint
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScaffDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub entrypoint: String,
    pub blocks: Vec<BlockDefinition>,
    #[serde(default)]
    pub joins: Vec<JoinDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BlockDefinition {
    pub name: String,
    pub action: ActionDefinition,
}

/// Action of a block, selected by `type`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDefinition {
    Input {
        value: String,
    },
    Llm {
        #[serde(default)]
        system: String,
        user: String,
        /// Blocks whose `result` is prepended to the prompt
        #[serde(default)]
        include: Vec<String>,
    },
    Split {
        #[serde(default = "default_key")]
        in_key: String,
        #[serde(default = "default_key")]
        out_key: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
    Print {
        #[serde(default = "default_key")]
        key: String,
    },
    Scaff {
        scaff: Box<ScaffDefinition>,
    },
    FanOut {
        scaff: Box<ScaffDefinition>,
        #[serde(default)]
        in_node: Option<String>,
        #[serde(default = "default_key")]
        in_key: String,
        #[serde(default = "default_key")]
        out_node: String,
        #[serde(default = "default_key")]
        out_key: String,
        #[serde(default = "default_key")]
        result_key: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JoinDefinition {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub when: Option<ConditionDefinition>,
}

/// Join condition, written as `key_matches: {..}` or `nodes_completed: [..]`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ConditionDefinition {
    KeyMatches { key_matches: KeyMatchesDefinition },
    NodesCompleted { nodes_completed: Vec<String> },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KeyMatchesDefinition {
    pub block: String,
    pub key: String,
    pub value: String,
}
