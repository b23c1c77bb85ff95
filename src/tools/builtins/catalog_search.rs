//! search_catalog — resolve a keyword set to matching dataset records.
//!
//! Every non-match outcome is reported as a normal informational result
//! (not a tool error) so the conversation stays informative: "catalog
//! unavailable", "no valid keywords supplied", and "no datasets found"
//! are three distinct markers.

use serde_json::{json, Value};

use crate::catalog::SearchOutcome;
use crate::tools::{register_tool, ToolContext, ToolMeta};

/// Execute a search_catalog invocation.
///
/// Args:
///   - matched_keywords (array of strings, required): keywords drawn from
///     the `get_catalog_keywords` vocabulary
pub async fn search_catalog(ctx: &ToolContext, args: Value) -> anyhow::Result<Value> {
    // The keyword list must be a non-empty array of strings; anything
    // else is a caller-contract violation, reported distinctly from
    // catalog state.
    let Some(keywords) = parse_keywords(&args) else {
        return Ok(json!({
            "message": "no valid keywords supplied",
            "hint": "pass matched_keywords as a non-empty array of strings taken from get_catalog_keywords",
        }));
    };

    match ctx.catalog.search(&keywords).await {
        SearchOutcome::Matches(datasets) => Ok(json!({
            "count": datasets.len(),
            "datasets": datasets,
        })),
        SearchOutcome::CatalogUnavailable => Ok(json!({
            "message": "catalog unavailable",
            "hint": "the dataset catalog could not be fetched; ask the user to try again later",
        })),
        SearchOutcome::NoValidKeywords => Ok(json!({
            "message": "no valid keywords supplied",
            "hint": "pass matched_keywords as a non-empty array of strings taken from get_catalog_keywords",
        })),
        SearchOutcome::NoMatches { keywords } => Ok(json!({
            "message": format!("no datasets found for keywords: {}", keywords.join(", ")),
            "keywords": keywords,
        })),
    }
}

/// Extract `matched_keywords` as a non-empty list of strings.
///
/// Returns `None` when the field is absent, not an array, empty, or
/// contains any non-string element.
fn parse_keywords(args: &Value) -> Option<Vec<String>> {
    let arr = args.get("matched_keywords")?.as_array()?;
    if arr.is_empty() {
        return None;
    }
    arr.iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Register the `search_catalog` tool metadata.
pub fn register() {
    register_tool(ToolMeta {
        name: "search_catalog".into(),
        description: "Search the community dataset catalog with keywords selected from the get_catalog_keywords vocabulary. Returns at most 5 matching datasets (id, title, url) in catalog order.".into(),
        args_schema: json!({
            "type": "object",
            "properties": {
                "matched_keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Keywords relevant to the user's request, drawn from the catalog vocabulary"
                }
            },
            "required": ["matched_keywords"]
        }),
    });
}
