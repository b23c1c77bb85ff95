//! Tests for ProviderManager retry, fallback, and client-error handling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use geoscout::models::{ChatMessage, ModelProvider, ProviderManager, ProviderResponse};

// ---------------------------------------------------------------------------
// Mock providers
// ---------------------------------------------------------------------------

/// A provider that fails `fail_count` times then succeeds.
struct FailNProvider {
    fail_count: usize,
    calls: AtomicUsize,
    reply: String,
}

impl FailNProvider {
    fn new(fail_count: usize, reply: &str) -> Self {
        Self {
            fail_count,
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl ModelProvider for FailNProvider {
    async fn send_chat(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            Err(anyhow::anyhow!("intentional failure #{}", n + 1))
        } else {
            Ok(self.reply.clone())
        }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A provider that always fails, with a shared call counter.
struct CountingFailProvider {
    calls: Arc<AtomicUsize>,
    error: String,
}

#[async_trait]
impl ModelProvider for CountingFailProvider {
    async fn send_chat(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("{}", self.error))
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A provider that always fails (no counter).
struct AlwaysFailProvider;

#[async_trait]
impl ModelProvider for AlwaysFailProvider {
    async fn send_chat(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("always fails"))
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Retry / fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_succeeds_after_transient_failures() {
    // Fails twice, then succeeds on the 3rd attempt.
    let provider = FailNProvider::new(2, "success after retries");
    let manager = ProviderManager::new(vec![Box::new(provider)], 3);

    let messages = vec![ChatMessage::new("user", "hello")];

    let result = manager.send_chat(&messages).await;
    assert_eq!(result.unwrap(), "success after retries");
}

#[tokio::test]
async fn fallback_to_next_provider_on_exhausted_retries() {
    let failing = AlwaysFailProvider;
    let working = FailNProvider::new(0, "fallback reply");
    let manager = ProviderManager::new(vec![Box::new(failing), Box::new(working)], 2);

    let messages = vec![ChatMessage::new("user", "hello")];

    let result = manager.send_chat(&messages).await;
    assert_eq!(result.unwrap(), "fallback reply");
}

#[tokio::test]
async fn all_providers_fail_returns_error() {
    let manager = ProviderManager::new(
        vec![Box::new(AlwaysFailProvider), Box::new(AlwaysFailProvider)],
        2,
    );

    let messages = vec![ChatMessage::new("user", "hello")];

    let result = manager.send_chat(&messages).await;
    let err_msg = format!("{:#}", result.unwrap_err());
    assert!(
        err_msg.contains("all providers exhausted"),
        "expected 'all providers exhausted' in: {err_msg}"
    );
}

#[tokio::test]
async fn retry_count_respected() {
    // Provider never succeeds; the manager retries exactly
    // attempts_per_provider times.
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingFailProvider {
        calls: Arc::clone(&calls),
        error: "transient network failure".into(),
    };
    let manager = ProviderManager::new(vec![Box::new(provider)], 3);

    let messages = vec![ChatMessage::new("user", "hello")];

    let _result = manager.send_chat(&messages).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3, "expected exactly 3 attempts");
}

#[tokio::test]
async fn client_errors_skip_remaining_retries() {
    // A 401 must not be retried; the manager should fall straight through
    // to the next provider.
    let calls = Arc::new(AtomicUsize::new(0));
    let auth_fail = CountingFailProvider {
        calls: Arc::clone(&calls),
        error: "chat endpoint returned 401 Unauthorized: bad key".into(),
    };
    let working = FailNProvider::new(0, "fallback reply");
    let manager = ProviderManager::new(vec![Box::new(auth_fail), Box::new(working)], 3);

    let messages = vec![ChatMessage::new("user", "hello")];

    let result = manager.send_chat(&messages).await;
    assert_eq!(result.unwrap(), "fallback reply");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "401 should not be retried");
}

// ---------------------------------------------------------------------------
// Function-calling gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn functions_gate_wraps_plain_reply_when_disabled() {
    let provider = FailNProvider::new(0, "plain reply");
    let manager = ProviderManager::new(vec![Box::new(provider)], 1);
    assert!(!manager.function_calling());

    let messages = vec![ChatMessage::new("user", "hello")];
    let funcs = vec![serde_json::json!({
        "name": "search_catalog",
        "parameters": { "type": "object", "properties": {} }
    })];

    let (resp, usage) = manager
        .send_chat_with_functions(&messages, &funcs)
        .await
        .unwrap();
    assert!(usage.is_none());
    match resp {
        ProviderResponse::Final(text) => assert_eq!(text, "plain reply"),
        other => panic!("expected Final, got {other:?}"),
    }
}

#[tokio::test]
async fn stub_provider_keeps_manager_alive() {
    let manager = ProviderManager::new(
        vec![
            Box::new(AlwaysFailProvider),
            Box::new(geoscout::models::StubProvider),
        ],
        1,
    );

    let messages = vec![ChatMessage::new("user", "find flood data")];
    let reply = manager.send_chat(&messages).await.unwrap();
    assert!(reply.contains("find flood data"));
}
