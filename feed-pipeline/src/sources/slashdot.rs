use crate::dates::DateLayout;
use crate::parser::FeedFormat;
use crate::sources::XmlFeedSource;
use crate::types::FeedConfig;

pub const NAME: &str = "slashdot";
const ENDPOINT: &str = "https://rss.slashdot.org/Slashdot/slashdotMain";

// `dc:date` is ISO 8601, usually with a `+00:00` offset.
const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc3339,
    DateLayout::WithOffset("%Y-%m-%dT%H:%M:%S%z"),
    DateLayout::NaiveUtc("%Y-%m-%d %H:%M:%S"),
];

/// Slashdot main stories, published as RSS 1.0.
pub fn main_feed() -> XmlFeedSource {
    let config = FeedConfig::new(NAME, ENDPOINT, "Slashdot");
    XmlFeedSource::new(config, FeedFormat::Rdf, DATE_LAYOUTS)
}
