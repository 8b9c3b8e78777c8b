pub mod comments;
pub mod hackernews;
pub mod lobsters;
pub mod rust_blog;
pub mod slashdot;
pub mod xml_feed;

pub use hackernews::HackerNewsSource;
pub use lobsters::LobstersSource;
pub use xml_feed::XmlFeedSource;
