use crate::types::Item;
use std::fmt;
use std::str::FromStr;

/// How many new items a run may process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleLimiter {
    /// Every new item.
    #[default]
    Unlimited,
    /// Only the first new item, for trial runs against a live feed.
    One,
}

impl ArticleLimiter {
    /// Applied after dedup; keeps the leading items in feed order.
    pub fn limit(&self, items: Vec<Item>) -> Vec<Item> {
        match self {
            ArticleLimiter::Unlimited => items,
            ArticleLimiter::One => items.into_iter().take(1).collect(),
        }
    }
}

impl FromStr for ArticleLimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "unlimited" => Ok(ArticleLimiter::Unlimited),
            "one" | "1" => Ok(ArticleLimiter::One),
            other => Err(format!("unknown article limit {:?}, expected \"all\" or \"one\"", other)),
        }
    }
}

impl fmt::Display for ArticleLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleLimiter::Unlimited => f.write_str("all"),
            ArticleLimiter::One => f.write_str("one"),
        }
    }
}
