//! get_catalog_keywords — expose the catalog-derived keyword vocabulary.
//!
//! The coordinator calls this first and picks the subset of tokens
//! relevant to the user's request; `search_catalog` only accepts keywords
//! drawn from this vocabulary.

use serde_json::{json, Value};

use crate::tools::{register_tool, ToolContext, ToolMeta};

/// Return the full keyword vocabulary, forcing a catalog load if needed.
///
/// When the catalog has never been fetched successfully, returns an
/// explicit "keywords not available" marker rather than an empty list.
pub async fn get_catalog_keywords(ctx: &ToolContext, _args: Value) -> anyhow::Result<Value> {
    match ctx.catalog.get_keywords().await {
        Some(keywords) => Ok(json!({
            "count": keywords.len(),
            "keywords": keywords,
        })),
        None => Ok(json!({
            "error": "keywords not available",
            "hint": "the dataset catalog could not be fetched; ask the user to try again later",
        })),
    }
}

/// Register the `get_catalog_keywords` tool metadata.
pub fn register() {
    register_tool(ToolMeta {
        name: "get_catalog_keywords".into(),
        description: "List every searchable keyword derived from the community dataset catalog. CALL THIS FIRST, then pick the handful of keywords that best match the user's research need and pass them to search_catalog.".into(),
        args_schema: json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    });
}
