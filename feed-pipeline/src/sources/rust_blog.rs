use crate::dates::DateLayout;
use crate::parser::FeedFormat;
use crate::sources::XmlFeedSource;
use crate::types::FeedConfig;

pub const NAME: &str = "rustblog";
const ENDPOINT: &str = "https://blog.rust-lang.org/feed.xml";

const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc3339,
    DateLayout::NaiveUtc("%Y-%m-%dT%H:%M:%S%.f"),
    DateLayout::DateOnly("%Y-%m-%d"),
];

/// Release announcements and team posts from the Rust Blog (Atom).
pub fn main_feed() -> XmlFeedSource {
    let config = FeedConfig::new(NAME, ENDPOINT, "Rust Blog");
    XmlFeedSource::new(config, FeedFormat::Atom, DATE_LAYOUTS)
}
