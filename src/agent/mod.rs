//! Coordinator: drives a single dataset-discovery turn.
//!
//! Each turn is stateless — the user's question goes in, the coordinator
//! runs the model through the tool loop (keyword vocabulary → catalog
//! search → optional webpage fetches) and returns the final recommendation
//! text.

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ChatMessage, ModelProvider, ProviderManager, ProviderResponse, ToolCallRequest};
use crate::tools::{self, ToolContext};

/// System instructions for the discovery coordinator.
///
/// The workflow mirrors the tool contract: vocabulary first, then search,
/// then per-dataset page fetches for detail.  The answer format is the
/// two-tier priority list users of the service expect.
const INSTRUCTIONS: &str = r#"You are a geospatial dataset discovery assistant. You help researchers find Earth observation datasets for their work.

Workflow for every request:
1. Call get_catalog_keywords to obtain the searchable vocabulary.
2. Pick the keywords from that vocabulary most relevant to the user's research need (topic, sensor, variable, region) and call search_catalog with them.
3. For each returned dataset, call fetch_webpage on its url to learn resolution, spatial and temporal coverage, update frequency, band layout, and typical use cases.
4. Use search_official_catalog when the community catalog has no match or the user asks about official Earth Engine datasets.
5. If search_catalog reports no matches, try once more with a different keyword selection before telling the user nothing was found.

Your goal is to check off as many items from the top and second priority lists as the fetched pages allow. Always structure your answer exactly like this:

## Plain-English Summary

A concise explanation of what the recommended dataset(s) measure and typical use cases (e.g. "Vegetation indices from MODIS, useful for NDVI-based land cover change").

## Top priority list

For each candidate dataset, in priority order:
- Dataset Title and ID, with a short human-readable label.
- Temporal Coverage: start and end dates of data availability, update frequency (e.g. daily, 8-day composite, monthly), and any known delays or gaps.
- Spatial Resolution and Coverage: pixel size (e.g. 250m, 30m) and global vs. regional coverage.
- Usage Recommendations: situations where the dataset is especially valuable, and caveats (e.g. "Better for large-area trends; noisy in cloudy regions").
- Comparison Notes: when multiple datasets match, side-by-side notes on tradeoffs (e.g. "Use VIIRS for finer nightlight detail, but MODIS for longer historical range").
- Direct Catalog Link: a clickable link to the dataset's page for further exploration.

## Second priority list

When the fetched pages provide them:
- Band Information: available bands with descriptions (e.g. NDVI, EVI, red, nir), data types, and band-specific quirks.
- Access and Filtering Fields: metadata fields useful for filtering (e.g. acquisition time, cloud cover, QA bands) with guidance on using them effectively.
- Preview Guidance: how to visualize the dataset quickly, with a code snippet when the page shows one.

If a detail is not on the fetched pages, state "Information not found" rather than guessing. If the catalog is unavailable, say so plainly and suggest trying again later; do not invent datasets. Never recommend a dataset that did not come from search_catalog or search_official_catalog."#;

/// Drives one discovery conversation turn end to end.
pub struct Coordinator {
    providers: ProviderManager,
    ctx: ToolContext,
    /// Max tool-call iterations per turn.
    max_tool_iterations: usize,
}

impl Coordinator {
    pub fn new(providers: ProviderManager, ctx: ToolContext, max_tool_iterations: usize) -> Self {
        Self {
            providers,
            ctx,
            max_tool_iterations: max_tool_iterations.max(1),
        }
    }

    /// Run a single discovery turn for the given user query.
    ///
    /// Drives the model through the tool loop until it produces a final
    /// text reply or the iteration budget runs out.  Tool failures are
    /// fed back to the model as error results rather than aborting the
    /// turn.
    pub async fn run_discovery(&self, query: &str) -> anyhow::Result<String> {
        let mut messages = vec![
            ChatMessage::new("system", INSTRUCTIONS),
            ChatMessage::new("user", query),
        ];

        let function_defs = tools::function_defs();

        let (mut response, _usage) = self
            .providers
            .send_chat_with_functions(&messages, &function_defs)
            .await
            .context("model call failed")?;

        for _iter in 0..self.max_tool_iterations {
            match response {
                ProviderResponse::Final(text) => return Ok(text),
                ProviderResponse::ToolCalls(calls) => {
                    self.invoke_batch(&calls, &mut messages).await;
                }
            }

            let (new_resp, _usage) = self
                .providers
                .send_chat_with_functions(&messages, &function_defs)
                .await
                .context("model call failed (tool loop)")?;
            response = new_resp;
        }

        if let ProviderResponse::Final(text) = response {
            return Ok(text);
        }

        // Budget exhausted mid-tool-call: ask for a plain wrap-up without
        // offering the tools again.
        warn!(
            max_iterations = self.max_tool_iterations,
            "tool iteration budget exhausted, requesting final answer"
        );
        messages.push(ChatMessage::new(
            "system",
            "Tool budget exhausted. Answer the user now using only the \
             information gathered so far.",
        ));
        self.providers
            .send_chat(&messages)
            .await
            .context("model call failed (wrap-up)")
    }

    /// Execute a batch of tool calls and append the assistant tool_calls
    /// message plus one tool-result message per call.
    ///
    /// A failing tool becomes an `{"error": …}` result the model can read
    /// and react to; it never fails the turn.
    async fn invoke_batch(&self, calls: &[ToolCallRequest], messages: &mut Vec<ChatMessage>) {
        // Ids first: the assistant message must reference the same ids as
        // the tool results that follow it.
        let entries: Vec<(String, &ToolCallRequest)> = calls
            .iter()
            .map(|c| {
                let id = if c.id.is_empty() {
                    // Legacy function_call responses carry no id.
                    format!("call_{}", Uuid::new_v4().simple())
                } else {
                    c.id.clone()
                };
                (id, c)
            })
            .collect();

        let tc_json: Vec<serde_json::Value> = entries
            .iter()
            .map(|(id, c)| {
                serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": c.name,
                        "arguments": c.arguments,
                    }
                })
            })
            .collect();
        messages.push(ChatMessage {
            role: "assistant".into(),
            content: String::new(),
            tool_calls: Some(tc_json),
            tool_call_id: None,
        });

        for (id, call) in entries {
            let args: serde_json::Value =
                serde_json::from_str(&call.arguments).unwrap_or(serde_json::json!({}));

            debug!(tool = %call.name, "invoking tool");

            let result_json = match tools::call_tool(&self.ctx, &call.name, args).await {
                Ok(v) => v.to_string(),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool execution failed, feeding error back");
                    serde_json::json!({ "error": e.to_string() }).to_string()
                }
            };

            messages.push(ChatMessage {
                role: "tool".into(),
                content: result_json,
                tool_calls: None,
                tool_call_id: Some(id),
            });
        }
    }
}
