use crate::types::{default_user_agent, FeedConfig, Item, RequestHeaders, Result};
use chrono::{DateTime, Utc};

/// Per-source behaviour for one content feed.
///
/// Every method is pure: the strategy never performs I/O. Fetching and all
/// other side effects belong to the processor and its collaborators.
pub trait FeedStrategy: Send + Sync {
    /// Name, endpoint and display name of the source. Constant for an instance.
    fn config(&self) -> FeedConfig;

    /// Headers to send when fetching the endpoint
    fn request_headers(&self) -> RequestHeaders;

    /// Parse a fetched body in this source's one wire format.
    ///
    /// A body in any other format, or one that is not well-formed, is a
    /// `PipelineError::Parse`. A publish date that no layout accepts leaves
    /// the item's `published_at` empty rather than failing the feed.
    fn parse_feed(&self, body: &str) -> Result<Vec<Item>>;

    /// Apply the source's inclusion rules. Order is preserved.
    fn filter_items(&self, items: Vec<Item>) -> Vec<Item>;

    /// Try each of the source's date layouts in order; the first match wins.
    /// Empty input always fails.
    fn parse_date(&self, value: &str) -> Result<DateTime<Utc>>;

    /// Sources with a community discussion page expose it here.
    fn discussion(&self) -> Option<&dyn DiscussionCapability> {
        None
    }
}

/// Locates and reads the comment thread that belongs to an item.
pub trait DiscussionCapability: Send + Sync {
    /// Where to fetch the machine-readable thread, if the item has one.
    fn discussion_url(&self, item: &Item) -> Option<String>;

    /// Headers for the thread fetch. Thread endpoints serve JSON, not the feed format.
    fn request_headers(&self) -> RequestHeaders {
        let mut headers = RequestHeaders::new();
        headers.insert("User-Agent".to_string(), default_user_agent());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    /// Turn a fetched thread into plain comment text. May return an empty
    /// string when the thread has no comments.
    fn extract_comments(&self, body: &str) -> Result<String>;
}
