//! fetch_webpage — raw text of a dataset's web page.
//!
//! A direct pass-through GET: no HTML parsing happens here.  The
//! coordinator reads the returned text and extracts metadata (resolution,
//! coverage, update frequency, use case) itself.

use serde_json::{json, Value};

use crate::tools::{register_tool, ToolContext, ToolMeta};

/// Execute a fetch_webpage invocation.
///
/// Fetch failures come back as error strings in the result value, not as
/// tool errors — the model decides how to proceed.
pub async fn fetch_webpage(ctx: &ToolContext, args: Value) -> anyhow::Result<Value> {
    let url = args
        .get("url")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim();

    if url.is_empty() {
        return Ok(json!({ "error": "url is required" }));
    }

    // Fail fast without a network call for non-HTTP schemes.
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Ok(json!({
            "error": format!("invalid URL (must start with http:// or https://): {url}"),
        }));
    }

    let resp = match ctx
        .webpage_client
        .get(url)
        .header(reqwest::header::USER_AGENT, super::BROWSER_USER_AGENT)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            return Ok(json!({ "error": format!("webpage fetch failed: {e}") }));
        }
    };

    let status = resp.status();
    if !status.is_success() {
        return Ok(json!({ "error": format!("webpage fetch returned {status} for {url}") }));
    }

    match resp.text().await {
        Ok(content) => Ok(json!({ "url": url, "content": content })),
        Err(e) => Ok(json!({ "error": format!("webpage body read failed: {e}") })),
    }
}

/// Register the `fetch_webpage` tool metadata.
pub fn register() {
    register_tool(ToolMeta {
        name: "fetch_webpage".into(),
        description: "Fetch the raw text content of a webpage URL (e.g. a dataset's page from a search_catalog result). Returns the body verbatim; analyze it yourself to extract dataset details.".into(),
        args_schema: json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Absolute http:// or https:// URL to fetch"
                }
            },
            "required": ["url"]
        }),
    });
}
