//! search_official_catalog — full-text search of the official Earth
//! Engine data catalog.
//!
//! Complements `search_catalog`: the community catalog only covers
//! community-contributed datasets, so official ones (MODIS, Landsat,
//! Sentinel, …) are found through the developer-site search instead.
//! Like `fetch_webpage`, the result body comes back verbatim for the
//! model to read.

use serde_json::{json, Value};

use crate::tools::{register_tool, ToolContext, ToolMeta};

/// Search page of the official Earth Engine dataset catalog.
pub const DEFAULT_SEARCH_URL: &str =
    "https://developers.google.com/s/results/earth-engine/datasets";

/// Execute a search_official_catalog invocation.
///
/// Failures come back as error strings in the result value, not as tool
/// errors — the model decides how to proceed.
pub async fn search_official_catalog(ctx: &ToolContext, args: Value) -> anyhow::Result<Value> {
    let query = args
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim();

    if query.is_empty() {
        return Ok(json!({ "error": "query is required" }));
    }

    let resp = match ctx
        .webpage_client
        .get(&ctx.official_search_url)
        .query(&[("q", query)])
        .header(reqwest::header::USER_AGENT, super::BROWSER_USER_AGENT)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            return Ok(json!({ "error": format!("official catalog search failed: {e}") }));
        }
    };

    let status = resp.status();
    if !status.is_success() {
        return Ok(json!({
            "error": format!("official catalog search returned {status} for query: {query}"),
        }));
    }

    match resp.text().await {
        Ok(content) => Ok(json!({ "query": query, "content": content })),
        Err(e) => Ok(json!({ "error": format!("official catalog body read failed: {e}") })),
    }
}

/// Register the `search_official_catalog` tool metadata.
pub fn register() {
    register_tool(ToolMeta {
        name: "search_official_catalog".into(),
        description: "Search the official Earth Engine dataset catalog by free-text query. Use this when the community catalog has no match or the user wants official datasets (MODIS, Landsat, Sentinel, ...). Returns the search results page verbatim; read it to extract dataset names and links.".into(),
        args_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query, e.g. 'surface temperature' or 'sentinel-2'"
                }
            },
            "required": ["query"]
        }),
    });
}
