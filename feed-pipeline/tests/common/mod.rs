#![allow(dead_code)]

// Shared fixtures and in-memory collaborators for the integration tests.

use async_trait::async_trait;
use feed_pipeline::dates::DateLayout;
use feed_pipeline::sources::XmlFeedSource;
use feed_pipeline::{
    BackendError, Collaborators, FeedConfig, FeedFetcher, FeedFormat, IndexEntry, IndexStore,
    Notification, Notifier, ProcessedIndex, RequestHeaders, Summarizer, SummaryRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

pub const HACKERNEWS_FEED: &str = include_str!("../fixtures/hackernews.xml");
pub const LOBSTERS_FEED: &str = include_str!("../fixtures/lobsters.xml");
pub const SLASHDOT_FEED: &str = include_str!("../fixtures/slashdot.rdf");
pub const RUST_BLOG_FEED: &str = include_str!("../fixtures/rustblog.atom");
pub const HN_THREAD: &str = include_str!("../fixtures/hn_thread.json");
pub const LOBSTERS_STORY: &str = include_str!("../fixtures/lobsters_story.json");

pub const HN_ENDPOINT: &str = "https://hnrss.org/frontpage";
pub const HN_THREAD_URL: &str = "https://hn.algolia.com/api/v1/items/38800001";

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Plain RSS 2.0 source without filtering or discussion.
pub fn test_source(name: &str) -> XmlFeedSource {
    const LAYOUTS: &[DateLayout] = &[DateLayout::Rfc2822];
    XmlFeedSource::new(
        FeedConfig::new(name, &endpoint_for(name), name),
        FeedFormat::Rss2,
        LAYOUTS,
    )
}

pub fn endpoint_for(name: &str) -> String {
    format!("https://feeds.test/{}.xml", name)
}

/// RSS 2.0 document with one item per `(title, link)`.
pub fn rss_feed(items: &[(&str, &str)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>Test</title>\n",
    );
    for (title, link) in items {
        body.push_str(&format!(
            "<item><title>{}</title><link>{}</link><pubDate>Mon, 15 Jan 2024 14:30:00 +0000</pubDate></item>\n",
            title,
            link.replace('&', "&amp;")
        ));
    }
    body.push_str("</channel></rss>\n");
    body
}

/// Serves canned bodies by URL; anything unknown is a 404.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<String, u16>>,
    requests: Mutex<Vec<(String, RequestHeaders)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Headers sent with the first request for `url`.
    pub fn headers_for(&self, url: &str) -> Option<RequestHeaders> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(requested, _)| requested == url)
            .map(|(_, headers)| headers.clone())
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, headers: &RequestHeaders) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push((url.to_string(), headers.clone()));
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(BackendError::Status {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(BackendError::Status {
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }
}

/// Summaries are derived from the input; selected inputs fail.
#[derive(Default)]
pub struct ScriptedSummarizer {
    fail_urls: Vec<String>,
    fail_text: bool,
    empty_text: bool,
    calls: Mutex<Vec<SummaryRequest>>,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_url(mut self, url: &str) -> Self {
        self.fail_urls.push(url.to_string());
        self
    }

    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    pub fn empty_text(mut self) -> Self {
        self.empty_text = true;
        self
    }

    pub fn calls(&self) -> Vec<SummaryRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn summarized_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SummaryRequest::Url(url) => Some(url),
                SummaryRequest::Text(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(request.clone());
        match request {
            SummaryRequest::Url(url) if self.fail_urls.contains(url) => Err(BackendError::Status {
                status: 500,
                message: "summarizer down".to_string(),
            }),
            SummaryRequest::Url(url) => Ok(format!("summary of {}", url)),
            SummaryRequest::Text(_) if self.fail_text => {
                Err(BackendError::InvalidResponse("no summary".to_string()))
            }
            SummaryRequest::Text(_) if self.empty_text => Ok(String::new()),
            SummaryRequest::Text(text) => {
                Ok(format!("discussion: {}", text.lines().next().unwrap_or_default()))
            }
        }
    }
}

/// Records notifications; the n-th attempt (1-based) can be made to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    fail_on_attempt: Option<usize>,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_attempt(attempt: usize) -> Self {
        Self {
            fail_on_attempt: Some(attempt),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.title).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), BackendError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on_attempt == Some(attempt) {
            return Err(BackendError::Status {
                status: 502,
                message: "webhook unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Index store kept in memory, with optional injected failures.
#[derive(Default)]
pub struct MemoryIndexStore {
    index: Mutex<ProcessedIndex>,
    fail_load: bool,
    fail_save_for: Option<String>,
    fail_persist: bool,
    persist_calls: Mutex<usize>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut index = store.index.lock().unwrap();
            for key in keys {
                index.insert(
                    key.to_string(),
                    IndexEntry {
                        title: "seen before".to_string(),
                        url: key.to_string(),
                        source: "earlier".to_string(),
                        processed_at: chrono::Utc::now(),
                    },
                );
            }
        }
        store
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn failing_save_for(key: &str) -> Self {
        Self {
            fail_save_for: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_persist() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> ProcessedIndex {
        self.index.lock().unwrap().clone()
    }

    pub fn persist_calls(&self) -> usize {
        *self.persist_calls.lock().unwrap()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn load(&self) -> Result<ProcessedIndex, BackendError> {
        if self.fail_load {
            return Err(BackendError::Storage("index unreadable".to_string()));
        }
        Ok(self.snapshot())
    }

    async fn save_entry(&self, key: &str, entry: &IndexEntry) -> Result<(), BackendError> {
        if self.fail_save_for.as_deref() == Some(key) {
            return Err(BackendError::Storage("disk full".to_string()));
        }
        self.index.lock().unwrap().insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn persist(&self, index: &ProcessedIndex) -> Result<(), BackendError> {
        *self.persist_calls.lock().unwrap() += 1;
        if self.fail_persist {
            return Err(BackendError::Storage("read-only filesystem".to_string()));
        }
        self.index.lock().unwrap().merge(index);
        Ok(())
    }
}

/// Fakes wired together, with handles kept for assertions.
pub struct Harness {
    pub fetcher: Arc<StaticFetcher>,
    pub summarizer: Arc<ScriptedSummarizer>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryIndexStore>,
}

impl Harness {
    pub fn new(
        fetcher: StaticFetcher,
        summarizer: ScriptedSummarizer,
        notifier: RecordingNotifier,
        store: MemoryIndexStore,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            summarizer: Arc::new(summarizer),
            notifier: Arc::new(notifier),
            store: Arc::new(store),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            summarizer: self.summarizer.clone(),
            notifier: self.notifier.clone(),
            store: self.store.clone(),
        }
    }
}
