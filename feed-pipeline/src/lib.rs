pub mod dates;
pub mod dedup;
pub mod fetcher;
pub mod index_store;
pub mod limiter;
pub mod notifier;
pub mod parser;
pub mod processor;
pub mod registry;
pub mod sources;
pub mod summarizer;
pub mod traits;
pub mod types;
pub mod utils;

pub use types::*;
pub use fetcher::HttpFetcher;
pub use index_store::{IndexHandle, JsonFileIndexStore, PgIndexStore};
pub use limiter::ArticleLimiter;
pub use notifier::{LogNotifier, WebhookConfig, WebhookFlavor, WebhookNotifier};
pub use parser::{FeedFormat, FeedParser};
pub use processor::{run_all, Collaborators, RunReport, SourceProcessor};
pub use registry::{default_strategies, FeedRegistry};
pub use summarizer::{HttpSummarizer, MockSummarizer, SummarizerConfig};
pub use traits::{DiscussionCapability, FeedStrategy};
