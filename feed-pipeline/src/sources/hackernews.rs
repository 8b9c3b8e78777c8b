use crate::dates::DateLayout;
use crate::parser::FeedFormat;
use crate::sources::comments::CommentDigest;
use crate::sources::XmlFeedSource;
use crate::traits::{DiscussionCapability, FeedStrategy};
use crate::types::{FeedConfig, Item, PipelineError, RequestHeaders, Result};
use crate::utils::url::{is_on_domain, query_param};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

pub const NAME: &str = "hackernews";
const FRONT_PAGE: &str = "https://hnrss.org/frontpage";
const SITE_DOMAIN: &str = "news.ycombinator.com";
const ITEMS_API: &str = "https://hn.algolia.com/api/v1/items";

const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc2822,
    DateLayout::WithOffset("%a, %d %b %Y %H:%M:%S %z"),
    DateLayout::NaiveUtc("%a, %d %b %Y %H:%M:%S GMT"),
];

/// Hacker News front page, read through hnrss.
///
/// Text posts (Ask HN and friends) link back to `news.ycombinator.com/item?id=..`.
/// Their only identity is the query string, which dedup keys drop, so they
/// are filtered out.
pub struct HackerNewsSource {
    inner: XmlFeedSource,
    discussion: HackerNewsDiscussion,
}

impl HackerNewsSource {
    pub fn new() -> Self {
        Self::with_endpoint(FRONT_PAGE)
    }

    /// Any other hnrss listing, e.g. `https://hnrss.org/best`.
    pub fn with_endpoint(endpoint: &str) -> Self {
        let config = FeedConfig::new(NAME, endpoint, "Hacker News");
        Self {
            inner: XmlFeedSource::new(config, FeedFormat::Rss2, DATE_LAYOUTS),
            discussion: HackerNewsDiscussion,
        }
    }
}

impl Default for HackerNewsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStrategy for HackerNewsSource {
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
            .filter(|item| {
                let self_post = is_on_domain(&item.link, SITE_DOMAIN);
                if self_post {
                    debug!("Dropping Hacker News text post {:?}", item.title);
                }
                !self_post
            })
            .collect()
    }

    fn parse_date(&self, value: &str) -> Result<DateTime<Utc>> {
        self.inner.parse_date(value)
    }

    fn discussion(&self) -> Option<&dyn DiscussionCapability> {
        Some(&self.discussion)
    }
}

/// Comment threads from the Algolia items API.
pub struct HackerNewsDiscussion;

#[derive(Debug, Deserialize)]
struct ThreadNode {
    author: Option<String>,
    text: Option<String>,
    #[serde(default)]
    children: Vec<ThreadNode>,
}

impl HackerNewsDiscussion {
    /// Depth-first, so replies stay next to their parent.
    fn collect(nodes: &[ThreadNode], digest: &mut CommentDigest) -> bool {
        for node in nodes {
            if let Some(text) = &node.text {
                if !digest.push(node.author.as_deref(), text) {
                    return false;
                }
            }
            if !Self::collect(&node.children, digest) {
                return false;
            }
        }
        true
    }
}

impl DiscussionCapability for HackerNewsDiscussion {
    fn discussion_url(&self, item: &Item) -> Option<String> {
        let comments = item.comments_url.as_deref()?;
        let id = query_param(comments, "id")?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(format!("{}/{}", ITEMS_API, id))
    }

    fn extract_comments(&self, body: &str) -> Result<String> {
        let root: ThreadNode = serde_json::from_str(body)
            .map_err(|e| PipelineError::DiscussionFetch(format!("Invalid Hacker News thread: {}", e)))?;

        let mut digest = CommentDigest::new();
        Self::collect(&root.children, &mut digest);
        debug!("Collected {} Hacker News comments", digest.len());
        Ok(digest.finish())
    }
}
