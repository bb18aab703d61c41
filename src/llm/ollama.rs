// SPDX-License-Identifier: MIT

//! Ollama chat API

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use super::{forward, LineBuffer, LlmClient};
use crate::error::LlmError;

pub const OLLAMA_DEFAULT_HOST: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3:8b";

/// One object of the NDJSON reply
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

pub struct Ollama {
    client: Client,
    host: String,
    model: String,
}

impl Ollama {
    pub fn new(host: Option<&str>, model: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            host: host
                .unwrap_or(OLLAMA_DEFAULT_HOST)
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or(OLLAMA_DEFAULT_MODEL).to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn parse_line(line: &str) -> Result<Option<ChatChunk>, LlmError> {
        if line.is_empty() {
            return Ok(None);
        }
        let chunk: ChatChunk = serde_json::from_str(line)?;
        if let Some(err) = chunk.error {
            return Err(LlmError::InvalidResponse(err));
        }
        Ok(Some(chunk))
    }
}

#[async_trait]
impl LlmClient for Ollama {
    async fn chat(
        &self,
        system: &str,
        user: &str,
        stream: Option<mpsc::Sender<String>>,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": user }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": stream.is_some(),
        });

        let url = format!("{}/api/chat", self.host);
        log::debug!("ollama request to {} (model {})", url, self.model);

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "ollama".to_string(),
                status,
                body,
            });
        }

        let mut full = String::new();
        let mut lines = LineBuffer::default();
        let mut bytes = resp.bytes_stream();
        let mut finished = false;

        while let Some(chunk) = bytes.next().await {
            for line in lines.feed(&chunk?) {
                if let Some(chunk) = Self::parse_line(&line)? {
                    if let Some(message) = chunk.message {
                        full.push_str(&message.content);
                        forward(&stream, &message.content).await;
                    }
                    finished |= chunk.done;
                }
            }
            if finished {
                break;
            }
        }
        // Non-streaming replies are a single object, usually without a newline.
        if !finished {
            if let Some(rest) = lines.finish() {
                if let Some(chunk) = Self::parse_line(&rest)? {
                    if let Some(message) = chunk.message {
                        full.push_str(&message.content);
                        forward(&stream, &message.content).await;
                    }
                }
            }
        }

        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_content() {
        let chunk = Ollama::parse_line(r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.message.unwrap().content, "Hi");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_line_done() {
        let chunk = Ollama::parse_line(r#"{"done":true,"total_duration":1234}"#)
            .unwrap()
            .unwrap();
        assert!(chunk.done);
        assert!(chunk.message.is_none());
    }

    #[test]
    fn test_parse_line_empty_and_error() {
        assert!(Ollama::parse_line("").unwrap().is_none());
        assert!(matches!(
            Ollama::parse_line(r#"{"error":"model not found"}"#),
            Err(LlmError::InvalidResponse(ref msg)) if msg == "model not found"
        ));
    }

    #[test]
    fn test_defaults() {
        let client = Ollama::new(None, None);
        assert_eq!(client.model(), OLLAMA_DEFAULT_MODEL);
        assert_eq!(client.host, OLLAMA_DEFAULT_HOST);

        let client = Ollama::new(Some("http://gpu-box:11434/"), Some("mistral"));
        assert_eq!(client.host, "http://gpu-box:11434");
        assert_eq!(client.model(), "mistral");
    }
}
