//! Identity of items across runs and sources.
//!
//! A key is the item link normalized so that cosmetic variants of the same
//! article agree: the scheme is always `https`, the host is lowercased and
//! loses a leading `www.`, the path is lowercased without trailing slashes,
//! and the query string and fragment are dropped. The same article posted
//! to two sources therefore collapses to one key.

use crate::types::{Item, ProcessedIndex};
use url::Url;

pub const CANONICAL_SCHEME: &str = "https";

/// Dedup key of an item.
pub fn generate_key(item: &Item) -> String {
    normalize_url(&item.link)
}

/// Normalize a raw link. Anything that is not an absolute URL falls back to
/// its trimmed, lowercased text.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(url) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };
    let Some(host) = url.host_str() else {
        return trimmed.to_lowercase();
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = url.path().to_lowercase();
    let path = path.trim_end_matches('/');

    match url.port() {
        Some(port) => format!("{}://{}:{}{}", CANONICAL_SCHEME, host, port, path),
        None => format!("{}://{}{}", CANONICAL_SCHEME, host, path),
    }
}

pub fn is_processed(key: &str, index: &ProcessedIndex) -> bool {
    index.contains(key)
}

/// Items whose keys are absent from `index`, in their original order.
pub fn filter_unprocessed(items: Vec<Item>, index: &ProcessedIndex) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !is_processed(&generate_key(item), index))
        .collect()
}
