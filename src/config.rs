// SPDX-License-Identifier: MIT

//! Environment-driven LLM configuration
//!
//! Variables (a `.env` file is honoured by the binary):
//! - `GRAFF_LLM_PROVIDER` - `groq` (default), `openai` or `ollama`
//! - `GRAFF_LLM_MODEL` - model name, provider default when unset
//! - `GROQ_API_KEY`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`
//! - `OLLAMA_HOST`

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigError, LlmError};
use crate::llm::{LlmClient, Ollama, OpenAiCompatible};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Groq,
    OpenAi,
    Ollama,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => write!(f, "groq"),
            Provider::OpenAi => write!(f, "openai"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_host: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("GRAFF_LLM_PROVIDER") {
            Some(p) => p.parse()?,
            None => Provider::default(),
        };

        Ok(Self {
            provider,
            model: get("GRAFF_LLM_MODEL"),
            groq_api_key: get("GROQ_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            ollama_host: get("OLLAMA_HOST"),
        })
    }

    /// Apply CLI flags on top of the environment
    pub fn with_overrides(
        mut self,
        provider: Option<&str>,
        model: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(p) = provider {
            self.provider = p.parse()?;
        }
        if model.is_some() {
            self.model = model;
        }
        Ok(self)
    }

    pub fn build_client(&self) -> Result<Arc<dyn LlmClient>, LlmError> {
        let model = self.model.as_deref();
        let client: Arc<dyn LlmClient> = match self.provider {
            Provider::Groq => {
                let key = self
                    .groq_api_key
                    .as_deref()
                    .ok_or_else(|| LlmError::ApiKeyMissing("groq (set GROQ_API_KEY)".into()))?;
                Arc::new(OpenAiCompatible::groq(key, model))
            }
            Provider::OpenAi => {
                let key = self.openai_api_key.as_deref().ok_or_else(|| {
                    LlmError::ApiKeyMissing("openai (set OPENAI_API_KEY)".into())
                })?;
                Arc::new(OpenAiCompatible::openai(
                    key,
                    model,
                    self.openai_base_url.as_deref(),
                ))
            }
            Provider::Ollama => Arc::new(Ollama::new(self.ollama_host.as_deref(), model)),
        };
        log::info!("Using LLM provider: {}", self.provider);
        Ok(client)
    }
}
