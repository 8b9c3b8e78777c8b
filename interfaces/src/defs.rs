use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::state::ProcessedIndex;

/// Header name to value, sent with a fetch.
pub type RequestHeaders = BTreeMap<String, String>;

/// One entry of a feed, normalized into the shape shared by every source.
///
/// Items are produced by a feed strategy and are not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub comments_url: Option<String>,
    pub description: String,
    /// Publish date exactly as the source wrote it.
    pub published: String,
    pub source: String,
    pub categories: Vec<String>,
    /// Derived from `published` when one of the source's layouts matched.
    pub published_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(source: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            comments_url: None,
            description: String::new(),
            published: String::new(),
            source: source.into(),
            categories: Vec::new(),
            published_at: None,
        }
    }

    pub fn with_comments_url(mut self, url: impl Into<String>) -> Self {
        self.comments_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_published(mut self, published: impl Into<String>, published_at: Option<DateTime<Utc>>) -> Self {
        self.published = published.into();
        self.published_at = published_at;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.trim().eq_ignore_ascii_case(category))
    }
}

/// What the index remembers about a processed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub title: String,
    pub url: String,
    pub source: String,
    pub processed_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn from_item(item: &Item, processed_at: DateTime<Utc>) -> Self {
        Self {
            title: item.title.clone(),
            url: item.link.clone(),
            source: item.source.clone(),
            processed_at,
        }
    }
}

pub const DISCUSSION_TITLE_SUFFIX: &str = " (discussion)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub source: String,
    pub url: String,
    pub summary: String,
}

impl Notification {
    pub fn article(item: &Item, summary: &str) -> Self {
        Self {
            title: item.title.clone(),
            source: item.source.clone(),
            url: item.link.clone(),
            summary: summary.to_owned(),
        }
    }

    /// Discussion summaries point at the article itself, not the comment page.
    pub fn discussion(item: &Item, summary: &str) -> Self {
        Self {
            title: format!("{}{}", item.title, DISCUSSION_TITLE_SUFFIX),
            source: item.source.clone(),
            url: item.link.clone(),
            summary: summary.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryRequest {
    Url(String),
    Text(String),
}

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("storage error: {0}")]
    Storage(String),
}

// Object style note:
// Implementations of these traits are shared across a whole run behind an
// `Arc`, so every method takes `&self` and any mutable state lives behind a
// lock or in the backing service.

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `url` and return the body as text. Non-2xx responses are errors.
    async fn fetch(&self, url: &str, headers: &RequestHeaders) -> Result<String, BackendError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> String;

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, BackendError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), BackendError>;
}

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load the whole index. A store that has never been written loads empty.
    async fn load(&self) -> Result<ProcessedIndex, BackendError>;

    /// Durably record one entry. Existing keys are left untouched.
    async fn save_entry(&self, key: &str, entry: &IndexEntry) -> Result<(), BackendError>;

    /// Write back a full snapshot, keeping anything already stored.
    async fn persist(&self, index: &ProcessedIndex) -> Result<(), BackendError>;
}
