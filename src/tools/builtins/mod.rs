//! Built-in tool implementations.

pub mod catalog_keywords;
pub mod catalog_search;
pub mod fetch_webpage;
pub mod official_search;

/// Browser-like user agent; some dataset hosts reject default clients.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
