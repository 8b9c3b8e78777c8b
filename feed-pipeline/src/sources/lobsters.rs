use crate::dates::DateLayout;
use crate::parser::FeedFormat;
use crate::sources::comments::CommentDigest;
use crate::sources::XmlFeedSource;
use crate::traits::{DiscussionCapability, FeedStrategy};
use crate::types::{FeedConfig, Item, PipelineError, RequestHeaders, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const NAME: &str = "lobsters";
const ENDPOINT: &str = "https://lobste.rs/rss";

/// Tag of question posts, which carry no article to summarize.
pub const EXCLUDED_TAG: &str = "ask";

const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc2822,
    DateLayout::WithOffset("%a, %d %b %Y %H:%M:%S %z"),
];

pub struct LobstersSource {
    inner: XmlFeedSource,
    discussion: LobstersDiscussion,
}

impl LobstersSource {
    pub fn new() -> Self {
        let config = FeedConfig::new(NAME, ENDPOINT, "Lobsters");
        Self {
            inner: XmlFeedSource::new(config, FeedFormat::Rss2, DATE_LAYOUTS),
            discussion: LobstersDiscussion,
        }
    }
}

impl Default for LobstersSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStrategy for LobstersSource {
    fn config(&self) -> FeedConfig {
        self.inner.config()
    }

    fn request_headers(&self) -> RequestHeaders {
        self.inner.request_headers()
    }

    fn parse_feed(&self, body: &str) -> Result<Vec<Item>> {
        self.inner.parse_feed(body)
    }

    fn filter_items(&self, items: Vec<Item>) -> Vec<Item> {
        items
            .into_iter()
            .filter(|item| !item.has_category(EXCLUDED_TAG))
            .collect()
    }

    fn parse_date(&self, value: &str) -> Result<DateTime<Utc>> {
        self.inner.parse_date(value)
    }

    fn discussion(&self) -> Option<&dyn DiscussionCapability> {
        Some(&self.discussion)
    }
}

/// Story JSON at `/s/<short_id>.json`.
pub struct LobstersDiscussion;

#[derive(Debug, Deserialize)]
struct Story {
    #[serde(default)]
    comments: Vec<StoryComment>,
}

#[derive(Debug, Deserialize)]
struct StoryComment {
    comment_plain: Option<String>,
    comment: Option<String>,
    // A plain username in current responses, an object in older ones.
    commenting_user: Option<serde_json::Value>,
    #[serde(default)]
    is_deleted: bool,
}

impl StoryComment {
    fn author(&self) -> Option<&str> {
        match self.commenting_user.as_ref()? {
            serde_json::Value::String(name) => Some(name.as_str()),
            serde_json::Value::Object(user) => user.get("username").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    fn body(&self) -> Option<&str> {
        self.comment_plain.as_deref().or(self.comment.as_deref())
    }
}

impl DiscussionCapability for LobstersDiscussion {
    fn discussion_url(&self, item: &Item) -> Option<String> {
        let comments = Url::parse(item.comments_url.as_deref()?).ok()?;
        let host = comments.host_str()?;
        let mut segments = comments.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("s"), Some(short_id)) if !short_id.is_empty() => Some(format!(
                "{}://{}/s/{}.json",
                comments.scheme(),
                host,
                short_id
            )),
            _ => None,
        }
    }

    fn extract_comments(&self, body: &str) -> Result<String> {
        let story: Story = serde_json::from_str(body)
            .map_err(|e| PipelineError::DiscussionFetch(format!("Invalid Lobsters story: {}", e)))?;

        let mut digest = CommentDigest::new();
        for comment in story.comments.iter().filter(|c| !c.is_deleted) {
            let Some(body) = comment.body() else { continue };
            if !digest.push(comment.author(), body) {
                break;
            }
        }
        debug!("Collected {} Lobsters comments", digest.len());
        Ok(digest.finish())
    }
}
