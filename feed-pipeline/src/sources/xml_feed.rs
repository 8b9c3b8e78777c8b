use crate::dates::{parse_with_layouts, DateLayout};
use crate::parser::{FeedFormat, FeedParser};
use crate::traits::FeedStrategy;
use crate::types::{default_user_agent, FeedConfig, Item, RequestHeaders, Result};
use chrono::{DateTime, Utc};

/// A feed in one fixed XML format with no inclusion rules of its own.
///
/// Sources with extra behaviour wrap this and delegate the shared parts.
#[derive(Debug, Clone)]
pub struct XmlFeedSource {
    config: FeedConfig,
    format: FeedFormat,
    date_layouts: &'static [DateLayout],
    user_agent: String,
}

impl XmlFeedSource {
    pub fn new(config: FeedConfig, format: FeedFormat, date_layouts: &'static [DateLayout]) -> Self {
        Self {
            config,
            format,
            date_layouts,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn format(&self) -> FeedFormat {
        self.format
    }
}

impl FeedStrategy for XmlFeedSource {
    fn config(&self) -> FeedConfig {
        self.config.clone()
    }

    fn request_headers(&self) -> RequestHeaders {
        let mut headers = RequestHeaders::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert("Accept".to_string(), self.format.accept_header().to_string());
        headers
    }

    fn parse_feed(&self, body: &str) -> Result<Vec<Item>> {
        FeedParser::new(self.format, &self.config.name).parse(body, |value| self.parse_date(value))
    }

    fn filter_items(&self, items: Vec<Item>) -> Vec<Item> {
        items
    }

    fn parse_date(&self, value: &str) -> Result<DateTime<Utc>> {
        parse_with_layouts(value, self.date_layouts)
    }
}
