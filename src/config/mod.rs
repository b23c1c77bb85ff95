use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Well-known location of the community catalog document.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/samapriya/awesome-gee-community-datasets/master/community_datasets.json";

/// Top-level configuration loaded from `config.yaml`.
///
/// Every section has defaults so the daemon starts without a config file
/// (stub model provider, well-known catalog URL).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model provider definitions.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    /// Discovery coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Catalog source settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Webpage-fetch tool settings.
    #[serde(default)]
    pub webpage: WebpageConfig,
}

/// A configured LLM provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Unique identifier for this provider entry (e.g. "openai-default").
    pub id: String,
    /// Provider kind: "openai", "openai-compat", "ollama", etc.
    pub provider: String,
    /// Model name to request (e.g. "gpt-4o-mini").
    #[serde(default)]
    pub model: Option<String>,
    /// API key (plain text or env-var reference like `$OPENAI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat completions endpoint (required for openai-compat backends).
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Discovery coordinator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Which model config id drives the coordinator.  `None` falls back
    /// to the stub provider.
    #[serde(default)]
    pub model: Option<String>,
    /// Ordered list of fallback model config ids.
    #[serde(default)]
    pub fallback_models: Vec<String>,
    /// Maximum tool-call iterations per discovery turn.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            fallback_models: Vec::new(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_max_tool_iterations() -> usize {
    6
}

/// Catalog source settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default = "default_catalog_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            fetch_timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    30
}

/// Webpage-fetch tool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebpageConfig {
    #[serde(default = "default_webpage_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for WebpageConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_webpage_timeout_secs(),
        }
    }
}

fn default_webpage_timeout_secs() -> u64 {
    15
}

impl Config {
    /// Read and parse a YAML configuration file.
    ///
    /// A missing file is not an error — defaults apply so first-run users
    /// get a working daemon.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        let config: Config =
            serde_yaml::from_str(&contents).context("failed to parse config YAML")?;
        config.validate()?;

        tracing::debug!(
            models = config.models.len(),
            catalog_url = %config.catalog.url,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate semantic constraints that serde cannot enforce.
    fn validate(&self) -> anyhow::Result<()> {
        use std::collections::HashSet;

        let model_ids: HashSet<&str> = self.models.iter().map(|m| m.id.as_str()).collect();
        if model_ids.len() != self.models.len() {
            anyhow::bail!("config: duplicate model IDs detected");
        }

        if let Some(ref model) = self.coordinator.model {
            if !model_ids.contains(model.as_str()) {
                anyhow::bail!("config: coordinator references unknown model '{model}'");
            }
        }
        for fb in &self.coordinator.fallback_models {
            if !model_ids.contains(fb.as_str()) {
                anyhow::bail!("config: coordinator fallback references unknown model '{fb}'");
            }
        }

        if self.coordinator.max_tool_iterations == 0 {
            anyhow::bail!("config: max_tool_iterations must be at least 1");
        }
        if self.catalog.fetch_timeout_secs == 0 {
            anyhow::bail!("config: catalog fetch_timeout_secs must be at least 1");
        }
        if self.webpage.fetch_timeout_secs == 0 {
            anyhow::bail!("config: webpage fetch_timeout_secs must be at least 1");
        }

        Ok(())
    }
}
