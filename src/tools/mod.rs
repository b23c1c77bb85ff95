//! Tool runner for the discovery coordinator.
//!
//! A **tools metadata registry** tracks every available tool's name,
//! description, and JSON-Schema for its arguments.  Call [`init()`] at
//! startup to register the builtins; [`function_defs()`] renders the
//! registry as OpenAI-style function definitions for the model.
//!
//! Tools receive a [`ToolContext`] carrying the shared catalog service and
//! the webpage HTTP client, so nothing reaches into globals at call time.

pub mod builtins;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::catalog::CatalogService;
use crate::config::WebpageConfig;

/// Metadata describing a tool available to the coordinator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"search_catalog"`).
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// JSON Schema object describing the expected `args` value.
    pub args_schema: Value,
}

/// Global tool metadata registry.
static REGISTRY: Lazy<Mutex<Vec<ToolMeta>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Register a tool's metadata in the global registry.
///
/// Duplicate names are silently ignored (first-registration wins).
pub fn register_tool(meta: ToolMeta) {
    let mut reg = REGISTRY.lock().expect("tool registry poisoned");
    if reg.iter().any(|m| m.name == meta.name) {
        return;
    }
    reg.push(meta);
}

/// Return metadata for every registered tool.
pub fn list_tools() -> Vec<ToolMeta> {
    REGISTRY.lock().expect("tool registry poisoned").clone()
}

/// Render the registry as OpenAI-style function definitions.
pub fn function_defs() -> Vec<Value> {
    list_tools()
        .into_iter()
        .map(|meta| {
            serde_json::json!({
                "name": meta.name,
                "description": meta.description,
                "parameters": meta.args_schema,
            })
        })
        .collect()
}

/// Shared state handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Process-wide catalog cache.
    pub catalog: Arc<CatalogService>,
    /// Client for the webpage-fetch and official-search tools.
    pub webpage_client: reqwest::Client,
    /// Base URL of the official catalog's search page.
    pub official_search_url: String,
}

impl ToolContext {
    pub fn new(catalog: Arc<CatalogService>, webpage: &WebpageConfig) -> Self {
        let webpage_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(webpage.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            catalog,
            webpage_client,
            official_search_url: builtins::official_search::DEFAULT_SEARCH_URL.to_string(),
        }
    }

    /// Point the official-catalog search at a different base URL (tests).
    pub fn with_official_search_url(mut self, url: impl Into<String>) -> Self {
        self.official_search_url = url.into();
        self
    }
}

/// Call a built-in tool by name.
///
/// This is the entry point used by the coordinator; it matches on the
/// tool name and delegates to the correct implementation.
pub async fn call_tool(ctx: &ToolContext, name: &str, args: Value) -> anyhow::Result<Value> {
    match name {
        "get_catalog_keywords" => builtins::catalog_keywords::get_catalog_keywords(ctx, args).await,
        "search_catalog" => builtins::catalog_search::search_catalog(ctx, args).await,
        "search_official_catalog" => {
            builtins::official_search::search_official_catalog(ctx, args).await
        }
        "fetch_webpage" => builtins::fetch_webpage::fetch_webpage(ctx, args).await,
        other => anyhow::bail!("unknown tool: {other}"),
    }
}

/// Names of all built-in tools.
pub fn builtin_tool_names() -> &'static [&'static str] {
    &[
        "get_catalog_keywords",
        "search_catalog",
        "search_official_catalog",
        "fetch_webpage",
    ]
}

/// Module initialization (called from main).
///
/// Registers all built-in tools in the metadata registry.
pub fn init() {
    builtins::catalog_keywords::register();
    builtins::catalog_search::register();
    builtins::official_search::register();
    builtins::fetch_webpage::register();

    tracing::debug!(
        tools = ?builtin_tool_names(),
        "tools module loaded ({} registered)",
        list_tools().len(),
    );
}
