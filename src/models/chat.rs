//! Chat-completions provider.
//!
//! One provider covers both the hosted OpenAI API and every
//! OpenAI-compatible server (OpenRouter, Ollama, Groq, LM Studio, vLLM,
//! …): the only real differences are the endpoint URL and whether an
//! API key is required, so both are constructor arguments.
//!
//! Config example:
//! ```yaml
//! models:
//!   - id: local-llama
//!     provider: ollama
//!     model: llama3
//!     endpoint: http://localhost:11434/v1/chat/completions
//!     api_key: $OLLAMA_KEY   # optional, many local servers need none
//! ```

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    parse_chat_response, wire_messages, ChatMessage, ModelProvider, ProviderResponse, TokenUsage,
};

/// Hosted OpenAI chat-completions endpoint.
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Speaks the OpenAI chat-completions wire format against a configurable
/// endpoint.
pub struct ChatProvider {
    endpoint: String,
    /// Empty string means no Authorization header is sent.
    api_key: String,
    model: String,
    client: Client,
}

impl ChatProvider {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            endpoint,
            api_key,
            model,
            client: http_client(),
        }
    }

    /// Provider against the hosted OpenAI API.
    pub fn openai(api_key: String, model: String) -> Self {
        Self::new(OPENAI_ENDPOINT.to_string(), api_key, model)
    }

    /// Build the request body, wrapping tool definitions in the `tools`
    /// envelope the current API expects.
    fn request_body(&self, messages: &[ChatMessage], tools: &[Value]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(messages),
        });
        if !tools.is_empty() {
            let wrapped: Vec<Value> = tools
                .iter()
                .map(|def| json!({ "type": "function", "function": def }))
                .collect();
            body["tools"] = Value::Array(wrapped);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    /// POST the body and decode the JSON reply.  Non-2xx statuses become
    /// errors carrying the status code, which [`super::ProviderManager`]
    /// inspects to decide whether a retry is worthwhile.
    async fn execute(&self, body: &Value) -> anyhow::Result<Value> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat endpoint returned {status}: {text}");
        }

        Ok(resp.json().await?)
    }
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
}

#[async_trait]
impl ModelProvider for ChatProvider {
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let body = self.request_body(messages, &[]);
        let reply = self.execute(&body).await?;
        Ok(reply["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        let body = self.request_body(messages, functions);
        let reply = self.execute(&body).await?;
        Ok(parse_chat_response(&reply))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
