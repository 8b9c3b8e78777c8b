use std::fmt;

use serde::{Deserialize, Serialize};
// Use the interfaces crate for the collaborator contracts
pub use interfaces::defs::{BackendError, FeedFetcher, IndexStore, Notifier, Summarizer};
pub use interfaces::defs::{IndexEntry, Item, Notification, RequestHeaders, SummaryRequest};
pub use interfaces::state::ProcessedIndex;

/// Static identity of a feed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub endpoint: String,
    pub display_name: String,
}

impl FeedConfig {
    pub fn new(name: &str, endpoint: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

pub fn default_user_agent() -> String {
    format!("feed-pipeline/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Feed fetch failed for {url}: {source}")]
    FeedFetch { url: String, source: BackendError },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Unparseable date: {value:?}")]
    DateParse { value: String },

    #[error("Summarization failed: {0}")]
    Summarization(#[source] BackendError),

    #[error("Discussion fetch failed: {0}")]
    DiscussionFetch(String),

    #[error("Discussion summarization failed: {0}")]
    DiscussionSummarization(#[source] BackendError),

    #[error("Notification failed: {0}")]
    Notification(#[source] BackendError),

    #[error("Index load failed: {0}")]
    IndexLoad(#[source] BackendError),

    #[error("Index mark failed for {key}: {source}")]
    IndexMark { key: String, source: BackendError },

    #[error("Index persist failed: {0}")]
    IndexPersist(#[source] BackendError),

    #[error("Run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether this error ends the run. Date and discussion failures are
    /// logged and the run carries on without the affected enrichment.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::DateParse { .. }
                | PipelineError::DiscussionFetch(_)
                | PipelineError::DiscussionSummarization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Step of a run, used to report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    IndexLoad,
    Summarize,
    Discussion,
    Notify,
    NotifyDiscussion,
    Mark,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::IndexLoad => "index-load",
            Stage::Summarize => "summarize",
            Stage::Discussion => "discussion",
            Stage::Notify => "notify",
            Stage::NotifyDiscussion => "notify-discussion",
            Stage::Mark => "mark",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// The item a run was working on when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub title: String,
    pub link: String,
    pub key: String,
}

impl ItemRef {
    pub fn new(item: &Item, key: &str) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.clone(),
            key: key.to_string(),
        }
    }
}

/// A fatal failure of one source run.
#[derive(Debug)]
pub struct RunError {
    pub source_name: String,
    pub stage: Stage,
    pub item: Option<ItemRef>,
    pub error: PipelineError,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} run failed at {}", self.source_name, self.stage)?;
        if let Some(item) = &self.item {
            write!(f, " on {:?} <{}>", item.title, item.link)?;
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
