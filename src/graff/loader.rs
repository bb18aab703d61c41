// SPDX-License-Identifier: MIT

//! Blueprint loader - builds a [`Scaff`] from YAML

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::actions::{FanOut, Input, Llm, Print, ScaffNode, Split};
use super::scaff::{follow_if, BlockAction, FollowIf, Scaff};
use super::types::{ActionDefinition, ConditionDefinition, ScaffDefinition};
use crate::error::{LlmError, LoadError};
use crate::llm::LlmClient;

/// Turns blueprint definitions into runnable scaffs.
///
/// `llm` blocks share the client given here; a blueprint that uses one
/// without a client fails to build.
pub struct ScaffLoader {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ScaffLoader {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// Read, parse and build a blueprint file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Scaff, LoadError> {
        let def = Self::parse_file(path)?;
        self.build(&def)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ScaffDefinition, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Check that a blueprint file builds, without needing a configured LLM
    pub fn validate_file<P: AsRef<Path>>(path: P) -> Result<ScaffDefinition, LoadError> {
        let def = Self::parse_file(path)?;
        Self::new(Some(Arc::new(Unconfigured))).build(&def)?;
        Ok(def)
    }

    pub fn from_yaml_str(&self, content: &str) -> Result<Scaff, LoadError> {
        let def = Self::parse_yaml(content)?;
        self.build(&def)
    }

    pub fn parse_yaml(content: &str) -> Result<ScaffDefinition, LoadError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build and validate a scaff, including any nested ones
    pub fn build(&self, def: &ScaffDefinition) -> Result<Scaff, LoadError> {
        let mut scaff = Scaff::new();
        for block in &def.blocks {
            let action = self.action(&block.name, &block.action)?;
            scaff.add_block_shared(&block.name, action);
        }
        for join in &def.joins {
            let condition = join.when.as_ref().map(Self::condition);
            scaff.add_join(&join.from, &join.to, condition)?;
        }
        scaff.set_entrypoint(&def.entrypoint)?;
        scaff.validate()?;

        log::debug!(
            "built scaff '{}' with {} blocks and {} joins",
            def.name,
            scaff.blocks().len(),
            scaff.joins().len()
        );
        Ok(scaff)
    }

    fn action(&self, block: &str, def: &ActionDefinition) -> Result<Arc<dyn BlockAction>, LoadError> {
        let action: Arc<dyn BlockAction> = match def {
            ActionDefinition::Input { value } => Arc::new(Input::new(value.as_str())),
            ActionDefinition::Llm {
                system,
                user,
                include,
            } => {
                let client = self.llm.clone().ok_or_else(|| LoadError::MissingLlmClient {
                    block: block.to_string(),
                })?;
                let mut llm = Llm::new(client, system, user);
                llm.include = include.clone();
                Arc::new(llm)
            }
            ActionDefinition::Split {
                in_key,
                out_key,
                separator,
            } => Arc::new(Split {
                in_key: in_key.clone(),
                out_key: out_key.clone(),
                separator: separator.clone(),
            }),
            ActionDefinition::Print { key } => Arc::new(Print { key: key.clone() }),
            ActionDefinition::Scaff { scaff } => {
                Arc::new(ScaffNode::new(Arc::new(self.build(scaff)?)))
            }
            ActionDefinition::FanOut {
                scaff,
                in_node,
                in_key,
                out_node,
                out_key,
                result_key,
            } => Arc::new(FanOut {
                scaff: Arc::new(self.build(scaff)?),
                in_node: in_node.clone(),
                in_key: in_key.clone(),
                out_node: out_node.clone(),
                out_key: out_key.clone(),
                result_key: result_key.clone(),
            }),
        };
        Ok(action)
    }

    fn condition(def: &ConditionDefinition) -> Arc<dyn FollowIf> {
        match def {
            ConditionDefinition::KeyMatches { key_matches: km } => {
                follow_if::key_matches(&km.block, &km.key, &km.value)
            }
            ConditionDefinition::NodesCompleted { nodes_completed } => {
                follow_if::nodes_completed(nodes_completed.as_slice())
            }
        }
    }
}

/// Stand-in client for validation; never meant to be called
struct Unconfigured;

#[async_trait]
impl LlmClient for Unconfigured {
    async fn chat(
        &self,
        _system: &str,
        _user: &str,
        _stream: Option<mpsc::Sender<String>>,
    ) -> Result<String, LlmError> {
        Err(LlmError::ApiKeyMissing("no provider configured".into()))
    }
}

impl Default for ScaffLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
