// SPDX-License-Identifier: MIT

//! Language-model block

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ActionError;
use crate::graff::scaff::BlockAction;
use crate::graff::state::{Node, ReadableGraph, ReadableNode};
use crate::llm::LlmClient;

/// Sends a prompt to an [`LlmClient`] and streams the reply into `result`.
///
/// The prompt is the `result` of every included block, each wrapped in
/// output markers, followed by the user message. Every streamed chunk
/// rewrites `result` with the text so far, so observers see it grow.
pub struct Llm {
    pub system: String,
    pub user: String,
    pub include: Vec<String>,
    pub client: Arc<dyn LlmClient>,
}

impl Llm {
    pub fn new(client: Arc<dyn LlmClient>, system: &str, user: &str) -> Self {
        Self {
            system: system.to_string(),
            user: user.to_string(),
            include: Vec::new(),
            client,
        }
    }

    pub fn with_include(mut self, block: &str) -> Self {
        self.include.push(block.to_string());
        self
    }

    fn build_prompt(&self, graph: &ReadableGraph) -> Result<String, ActionError> {
        let mut prompt = String::new();
        for name in &self.include {
            let node = graph.first_node_by_name(name)?;
            prompt.push_str(&format!(
                "### OUTPUT BLOCK START###\nNAME: {}\nRESULT: {}\n### OUTPUT BLOCK END###\n",
                node.name(),
                node.first_str("result")
            ));
        }
        prompt.push_str("\n\n");
        prompt.push_str(&self.user);
        Ok(prompt)
    }
}

#[async_trait]
impl BlockAction for Llm {
    async fn run(
        &self,
        node: &Node,
        graph: &ReadableGraph,
        _triggered_by: Option<&ReadableNode>,
    ) -> Result<(), ActionError> {
        let prompt = self.build_prompt(graph)?;
        let (tx, mut rx) = mpsc::channel::<String>(64);

        let chat = self.client.chat(&self.system, &prompt, Some(tx));
        let collect = async {
            let mut text = String::new();
            while let Some(chunk) = rx.recv().await {
                text.push_str(&chunk);
                node.set_str("result", &text);
            }
            text
        };
        let (reply, streamed) = tokio::join!(chat, collect);

        let reply = reply.map_err(|e| format!("failed to chat: {}", e))?;
        if streamed.is_empty() && !reply.is_empty() {
            node.set_str("result", &reply);
        }
        log::debug!("llm block {} produced {} chars", node.name(), reply.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, StateError};
    use crate::graff::state::{Graph, Notifier};
    use std::sync::Mutex;

    /// Streams fixed chunks and records the prompt it was given
    struct MockClient {
        chunks: Vec<&'static str>,
        stream: bool,
        seen: Mutex<Option<(String, String)>>,
    }

    impl MockClient {
        fn new(chunks: Vec<&'static str>, stream: bool) -> Self {
            Self {
                chunks,
                stream,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockClient {
        async fn chat(
            &self,
            system: &str,
            user: &str,
            stream: Option<mpsc::Sender<String>>,
        ) -> Result<String, LlmError> {
            *self.seen.lock().unwrap() = Some((system.to_string(), user.to_string()));
            if self.stream {
                if let Some(tx) = stream {
                    for chunk in &self.chunks {
                        tx.send(chunk.to_string()).await.unwrap();
                    }
                }
            }
            Ok(self.chunks.concat())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn chat(
            &self,
            _system: &str,
            _user: &str,
            _stream: Option<mpsc::Sender<String>>,
        ) -> Result<String, LlmError> {
            Err(LlmError::ApiKeyMissing("groq".into()))
        }
    }

    #[tokio::test]
    async fn test_streams_into_result() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let graph = Graph::with_notifier(notifier.clone());
        let node = graph.new_node("writer", None);

        let reader = graph.reader();
        let s = seen.clone();
        notifier.listen(move |change| {
            let n = reader.node(&change.node_id).unwrap();
            s.lock().unwrap().push(n.first_str("result"));
        });

        let client = Arc::new(MockClient::new(vec!["Once ", "upon ", "a time"], true));
        Llm::new(client, "sys", "tell a story")
            .run(&node, &graph.reader(), None)
            .await
            .unwrap();

        assert_eq!(node.reader().first_str("result"), "Once upon a time");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Once ", "Once upon ", "Once upon a time"]
        );
    }

    #[tokio::test]
    async fn test_non_streaming_reply_sets_result() {
        let graph = Graph::new();
        let node = graph.new_node("writer", None);

        let client = Arc::new(MockClient::new(vec!["whole reply"], false));
        Llm::new(client, "", "hi")
            .run(&node, &graph.reader(), None)
            .await
            .unwrap();

        assert_eq!(node.reader().first_str("result"), "whole reply");
    }

    #[tokio::test]
    async fn test_prompt_includes_outputs() {
        let graph = Graph::new();
        graph.new_node("plot", None).set_str("result", "a dragon");
        let node = graph.new_node("writer", None);

        let client = Arc::new(MockClient::new(vec!["ok"], true));
        Llm::new(client.clone(), "be brief", "write it")
            .with_include("plot")
            .run(&node, &graph.reader(), None)
            .await
            .unwrap();

        let (system, user) = client.seen.lock().unwrap().clone().unwrap();
        assert_eq!(system, "be brief");
        assert_eq!(
            user,
            "### OUTPUT BLOCK START###\nNAME: plot\nRESULT: a dragon\n### OUTPUT BLOCK END###\n\n\nwrite it"
        );
    }

    #[tokio::test]
    async fn test_missing_include_fails() {
        let graph = Graph::new();
        let node = graph.new_node("writer", None);

        let client = Arc::new(MockClient::new(vec!["ok"], true));
        let err = Llm::new(client, "", "hi")
            .with_include("ghost")
            .run(&node, &graph.reader(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StateError>(),
            Some(StateError::NodeNotFound { name }) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_returned() {
        let graph = Graph::new();
        let node = graph.new_node("writer", None);

        let err = Llm::new(Arc::new(FailingClient), "", "hi")
            .run(&node, &graph.reader(), None)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("failed to chat"));
        assert!(node.reader().first_str("result").is_empty());
    }
}
