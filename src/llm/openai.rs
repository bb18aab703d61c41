// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat completions (Groq, OpenAI)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::json;
use tokio::sync::mpsc;

use super::{forward, LineBuffer, LlmClient};
use crate::error::LlmError;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client for any endpoint speaking the `/chat/completions` protocol
pub struct OpenAiCompatible {
    client: Client,
    provider: String,
    api_key: String,
    model: String,
    base_url: String,
}

/// One parsed server-sent event line
#[derive(Debug, PartialEq)]
enum SseLine {
    Content(String),
    Done,
    Skip,
}

impl OpenAiCompatible {
    pub fn new(provider: &str, api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            provider: provider.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn groq(api_key: &str, model: Option<&str>) -> Self {
        Self::new(
            "groq",
            api_key,
            model.unwrap_or(GROQ_DEFAULT_MODEL),
            GROQ_BASE_URL,
        )
    }

    pub fn openai(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> Self {
        Self::new(
            "openai",
            api_key,
            model.unwrap_or(OPENAI_DEFAULT_MODEL),
            base_url.unwrap_or(OPENAI_BASE_URL),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, system: &str, user: &str, stream: bool) -> serde_json::Value {
        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": user }));

        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        })
    }

    fn parse_sse_line(line: &str) -> Result<SseLine, LlmError> {
        let data = match line.strip_prefix("data:") {
            Some(data) => data.trim(),
            None => return Ok(SseLine::Skip),
        };
        if data == "[DONE]" {
            return Ok(SseLine::Done);
        }

        let event: serde_json::Value = serde_json::from_str(data)?;
        let choices = event["choices"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing 'choices' in stream".into()))?;

        let text: String = choices
            .iter()
            .filter_map(|c| c["delta"]["content"].as_str())
            .collect();
        if text.is_empty() {
            Ok(SseLine::Skip)
        } else {
            Ok(SseLine::Content(text))
        }
    }

    fn parse_response(response: &serde_json::Value) -> Result<String, LlmError> {
        response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".into()))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatible {
    async fn chat(
        &self,
        system: &str,
        user: &str,
        stream: Option<mpsc::Sender<String>>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(system, user, stream.is_some());
        log::debug!("{} request to {} (model {})", self.provider, url, self.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: self.provider.clone(),
                status,
                body,
            });
        }

        if stream.is_none() {
            let json: serde_json::Value = resp.json().await?;
            return Self::parse_response(&json);
        }

        let mut full = String::new();
        let mut lines = LineBuffer::default();
        let mut bytes = resp.bytes_stream();

        'outer: while let Some(chunk) = bytes.next().await {
            for line in lines.feed(&chunk?) {
                match Self::parse_sse_line(&line)? {
                    SseLine::Content(text) => {
                        full.push_str(&text);
                        forward(&stream, &text).await;
                    }
                    SseLine::Done => break 'outer,
                    SseLine::Skip => {}
                }
            }
        }

        log::debug!("{} streamed {} chars", self.provider, full.len());
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            OpenAiCompatible::parse_sse_line(line).unwrap(),
            SseLine::Content("Hel".to_string())
        );
    }

    #[test]
    fn test_parse_sse_done_and_noise() {
        assert_eq!(
            OpenAiCompatible::parse_sse_line("data: [DONE]").unwrap(),
            SseLine::Done
        );
        assert_eq!(OpenAiCompatible::parse_sse_line("").unwrap(), SseLine::Skip);
        assert_eq!(
            OpenAiCompatible::parse_sse_line(": keep-alive").unwrap(),
            SseLine::Skip
        );
    }

    #[test]
    fn test_parse_sse_final_delta_without_content() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(
            OpenAiCompatible::parse_sse_line(line).unwrap(),
            SseLine::Skip
        );
    }

    #[test]
    fn test_parse_sse_rejects_bad_payload() {
        assert!(matches!(
            OpenAiCompatible::parse_sse_line(r#"data: {"id":"x"}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            OpenAiCompatible::parse_sse_line("data: {not json"),
            Err(LlmError::Json(_))
        ));
    }

    #[test]
    fn test_parse_response() {
        let resp = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello there" } }]
        });
        assert_eq!(
            OpenAiCompatible::parse_response(&resp).unwrap(),
            "Hello there"
        );
        assert!(OpenAiCompatible::parse_response(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_request_body_skips_empty_system() {
        let client = OpenAiCompatible::groq("key", None);
        let body = client.request_body("", "hi", true);

        assert_eq!(body["model"], GROQ_DEFAULT_MODEL);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_body_with_system() {
        let client = OpenAiCompatible::openai("key", Some("gpt-4o"), Some("http://localhost:8080/v1/"));
        let body = client.request_body("be brief", "hi", false);

        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["stream"], false);
    }
}
