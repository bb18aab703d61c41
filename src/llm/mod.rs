// SPDX-License-Identifier: MIT

//! Language-model backends used by the `llm` block action
//!
//! - [openai] - OpenAI-compatible chat completions (Groq, OpenAI)
//! - [ollama] - local Ollama server

pub mod ollama;
pub mod openai;

pub use ollama::Ollama;
pub use openai::OpenAiCompatible;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LlmError;

/// Chat-style completion backend.
///
/// When `stream` is given, partial text is sent on it as it arrives and the
/// sender is dropped when the reply is complete. The full reply is returned
/// either way.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(
        &self,
        system: &str,
        user: &str,
        stream: Option<mpsc::Sender<String>>,
    ) -> Result<String, LlmError>;
}

/// Splits a byte stream into complete newline-terminated lines
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }

    /// Whatever is left once the stream ends without a trailing newline
    pub(crate) fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf).trim().to_string();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// Forward one chunk to the stream, if any. A closed receiver just stops forwarding.
pub(crate) async fn forward(stream: &Option<mpsc::Sender<String>>, chunk: &str) {
    if let Some(tx) = stream {
        if tx.send(chunk.to_string()).await.is_err() {
            log::debug!("stream receiver dropped, discarding chunk");
        }
    }
}
