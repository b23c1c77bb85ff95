//! Model provider layer.
//!
//! [`ChatProvider`] speaks the OpenAI chat-completions wire format against
//! any endpoint; [`ProviderManager`] chains providers with retry and
//! fallback.  The coordinator only ever sees the [`ModelProvider`] trait.

pub mod chat;

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

pub use chat::ChatProvider;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// Carries optional tool-calling metadata so assistant `tool_calls`
/// messages and `tool`-role results round-trip through the API correctly.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Raw `tool_calls` array on assistant messages that invoke tools.
    pub tool_calls: Option<Vec<Value>>,
    /// On `tool`-role messages: the id of the call this result answers.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// A plain message with no tool metadata.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Wire-format JSON object for the chat-completions API.
    pub fn to_wire(&self) -> Value {
        let mut wire = serde_json::Map::new();
        wire.insert("role".into(), json!(self.role));
        match &self.tool_calls {
            Some(calls) => {
                wire.insert("tool_calls".into(), json!(calls));
                // Assistant messages carrying tool_calls use null content.
                let content = if self.content.is_empty() {
                    Value::Null
                } else {
                    json!(self.content)
                };
                wire.insert("content".into(), content);
            }
            None => {
                wire.insert("content".into(), json!(self.content));
            }
        }
        if let Some(id) = &self.tool_call_id {
            wire.insert("tool_call_id".into(), json!(id));
        }
        Value::Object(wire)
    }
}

/// Render a conversation as the API's `messages` array.
pub fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages.iter().map(ChatMessage::to_wire).collect()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Token usage statistics reported by the API.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Call id assigned by the API; empty for legacy responses.
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments string, as sent on the wire.
    pub arguments: String,
}

/// What the model answered: a final text reply, or a request to run one
/// or more tools.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Final(String),
    ToolCalls(Vec<ToolCallRequest>),
}

/// Interpret a chat-completions response body.
///
/// A `tool_calls` array on the first choice wins over text content; the
/// legacy `function_call` field (still emitted by some compatible
/// servers) is folded into the same [`ProviderResponse::ToolCalls`]
/// shape, with an empty id.
pub fn parse_chat_response(body: &Value) -> (ProviderResponse, Option<TokenUsage>) {
    let usage = body.get("usage").map(|u| TokenUsage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    });

    let message = &body["choices"][0]["message"];

    let mut requests = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let function = &call["function"];
            let Some(name) = function["name"].as_str() else {
                continue;
            };
            requests.push(ToolCallRequest {
                id: call["id"].as_str().unwrap_or_default().to_string(),
                name: name.to_string(),
                arguments: function["arguments"].as_str().unwrap_or("{}").to_string(),
            });
        }
    } else if let Some(name) = message["function_call"]["name"].as_str() {
        requests.push(ToolCallRequest {
            id: String::new(),
            name: name.to_string(),
            arguments: message["function_call"]["arguments"]
                .as_str()
                .unwrap_or("{}")
                .to_string(),
        });
    }

    if requests.is_empty() {
        let text = message["content"].as_str().unwrap_or_default().to_string();
        (ProviderResponse::Final(text), usage)
    } else {
        (ProviderResponse::ToolCalls(requests), usage)
    }
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a conversation and return the assistant's text reply.
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    /// Offer tool definitions alongside the conversation.
    ///
    /// The default refuses; backends without tool-calling support are
    /// routed around by [`ProviderManager`].
    async fn send_chat_with_functions(
        &self,
        _messages: &[ChatMessage],
        _functions: &[Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        anyhow::bail!("provider has no tool-calling support")
    }

    /// Downcast helper so callers can check the concrete type.
    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// ProviderManager
// ---------------------------------------------------------------------------

/// Ordered chain of providers with per-provider retry.
///
/// Each provider gets `attempts_per_provider` tries with exponential
/// backoff before the next one is consulted.  Implements
/// [`ModelProvider`] itself, so callers treat the chain as one backend.
pub struct ProviderManager {
    providers: Vec<Box<dyn ModelProvider>>,
    attempts_per_provider: usize,
    function_calling: bool,
}

impl ProviderManager {
    /// Chain `providers` in preference order.  `attempts_per_provider`
    /// is clamped to at least 1.  Tool calling starts disabled.
    pub fn new(providers: Vec<Box<dyn ModelProvider>>, attempts_per_provider: usize) -> Self {
        Self {
            providers,
            attempts_per_provider: attempts_per_provider.max(1),
            function_calling: false,
        }
    }

    /// Enable or disable offering tool definitions to the primary
    /// provider.
    pub fn with_function_calling(mut self, enabled: bool) -> Self {
        self.function_calling = enabled;
        self
    }

    pub fn function_calling(&self) -> bool {
        self.function_calling
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Send the conversation, offering tools when the primary provider
    /// can use them.  Otherwise falls back to a plain chat round and
    /// wraps the reply in [`ProviderResponse::Final`].
    pub async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        if self.function_calling && !functions.is_empty() {
            if let Some(primary) = self.providers.first() {
                return primary.send_chat_with_functions(messages, functions).await;
            }
        }
        let reply = self.dispatch(messages).await?;
        Ok((ProviderResponse::Final(reply), None))
    }

    /// Walk the provider chain until one produces a reply.
    async fn dispatch(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let mut last_err = anyhow::anyhow!("no providers configured");

        for (idx, provider) in self.providers.iter().enumerate() {
            match self.attempt(provider.as_ref(), idx, messages).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(provider_idx = idx, "provider exhausted, falling back");
                    last_err = e;
                }
            }
        }

        Err(last_err.context("all providers exhausted"))
    }

    /// Retry a single provider with 100 ms × 2^n backoff.  Client errors
    /// (4xx) are returned immediately: retrying a bad key or a missing
    /// model cannot succeed.
    async fn attempt(
        &self,
        provider: &dyn ModelProvider,
        idx: usize,
        messages: &[ChatMessage],
    ) -> anyhow::Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match provider.send_chat(messages).await {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            let unretryable = is_client_error(&err);
            warn!(
                provider_idx = idx,
                attempt,
                max_attempts = self.attempts_per_provider,
                unretryable,
                error = %err,
                "provider call failed"
            );
            if unretryable || attempt >= self.attempts_per_provider {
                return Err(err);
            }

            tokio::time::sleep(Duration::from_millis(100u64 << (attempt - 1))).await;
        }
    }
}

/// Detect HTTP 4xx failures from a provider error message (providers
/// phrase these as "… returned <status>: …").  They are configuration
/// problems, not transient faults, so backoff is wasted on them.
fn is_client_error(err: &anyhow::Error) -> bool {
    let text = err.to_string();
    let Some(rest) = text.split("returned ").nth(1) else {
        return false;
    };
    matches!(rest.get(..3), Some("400" | "401" | "403" | "404" | "422"))
}

#[async_trait]
impl ModelProvider for ProviderManager {
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.dispatch(messages).await
    }

    async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        ProviderManager::send_chat_with_functions(self, messages, functions).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// StubProvider
// ---------------------------------------------------------------------------

/// Credential-free fallback: replies with a fixed notice that echoes the
/// last user message, so the daemon stays runnable end-to-end during
/// development.
pub struct StubProvider;

#[async_trait]
impl ModelProvider for StubProvider {
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!(
            "[stub] no model credentials configured — received: {last_user}"
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Config-driven factory
// ---------------------------------------------------------------------------

/// Build a provider for one model config entry.
///
/// An explicit `endpoint` always wins, whatever the provider id says.
/// Without one, a provider id mentioning "openai" gets the hosted
/// endpoint when an API key resolves.  Everything else falls back to the
/// stub with a warning.
pub fn build_provider(mc: &crate::config::ModelConfig) -> Box<dyn ModelProvider> {
    let model = mc.model.clone().unwrap_or_else(|| mc.id.clone());
    let api_key = resolve_config_key(mc.api_key.as_deref(), &mc.provider);

    if let Some(endpoint) = mc.endpoint.as_deref().filter(|e| !e.is_empty()) {
        return Box::new(ChatProvider::new(endpoint.to_string(), api_key, model));
    }

    if mc.provider.contains("openai") {
        if api_key.is_empty() {
            warn!("\"openai\" model configured but no API key resolved — using stub");
            return Box::new(StubProvider);
        }
        return Box::new(ChatProvider::openai(api_key, model));
    }

    warn!(provider = %mc.provider, "provider needs an explicit endpoint — using stub");
    Box::new(StubProvider)
}

/// Build the coordinator's [`ProviderManager`] from the loaded config.
///
/// Chains the primary model and `fallback_models` in order, with a final
/// [`StubProvider`] safety net so a discovery turn always produces text.
pub fn build_provider_manager(cfg: &crate::config::Config) -> ProviderManager {
    let mut providers: Vec<Box<dyn ModelProvider>> = Vec::new();

    let model_refs = cfg
        .coordinator
        .model
        .iter()
        .chain(cfg.coordinator.fallback_models.iter());
    for model_ref in model_refs {
        match cfg.models.iter().find(|m| &m.id == model_ref) {
            Some(mc) => providers.push(build_provider(mc)),
            None => warn!(model_ref = %model_ref, "model not found in config, skipping"),
        }
    }

    // Only the primary provider is consulted for tool calling; the stub
    // cannot drive tools.
    let function_calling = providers
        .first()
        .map_or(false, |p| !p.as_any().is::<StubProvider>());

    providers.push(Box::new(StubProvider));

    ProviderManager::new(providers, 3).with_function_calling(function_calling)
}

/// Resolve an API key: config value → env var → empty string.
///
/// A config value starting with `$` is an env-var reference.
fn resolve_config_key(configured: Option<&str>, provider_id: &str) -> String {
    match configured {
        Some(value) if value.starts_with('$') => std::env::var(&value[1..]).unwrap_or_default(),
        Some(value) if !value.is_empty() => value.to_string(),
        _ => {
            let var = format!("{}_API_KEY", provider_id.to_uppercase().replace('-', "_"));
            std::env::var(var).unwrap_or_default()
        }
    }
}
