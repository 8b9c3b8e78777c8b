use crate::dedup;
use crate::index_store::IndexHandle;
use crate::limiter::ArticleLimiter;
use crate::traits::{DiscussionCapability, FeedStrategy};
use crate::types::{
    FeedConfig, FeedFetcher, IndexStore, Item, ItemRef, Notification, Notifier, PipelineError,
    RunError, Stage, Summarizer, SummaryRequest,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// External services a run talks to. Cheap to clone and shared by every
/// processor of a process.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn FeedFetcher>,
    pub summarizer: Arc<dyn Summarizer>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn IndexStore>,
}

/// Counts from one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub source: String,
    pub run_id: Uuid,
    /// Items parsed from the feed.
    pub fetched: usize,
    /// Items left after the source's inclusion rules.
    pub filtered: usize,
    /// Items not yet in the index.
    pub new_items: usize,
    /// Items left after the article limit.
    pub selected: usize,
    pub processed: usize,
    pub notifications_sent: usize,
    pub discussion_summaries: usize,
}

impl RunReport {
    fn new(source: String, run_id: Uuid) -> Self {
        Self {
            source,
            run_id,
            fetched: 0,
            filtered: 0,
            new_items: 0,
            selected: 0,
            processed: 0,
            notifications_sent: 0,
            discussion_summaries: 0,
        }
    }
}

/// Race an external call against cancellation.
async fn guarded<T, E, F>(
    cancel: &CancellationToken,
    call: F,
    wrap: impl FnOnce(E) -> PipelineError,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = call => result.map_err(wrap),
    }
}

/// Runs one source end to end: fetch, parse, filter, dedup, limit, then
/// summarize, notify and mark each selected item in feed order.
///
/// The first fatal error ends the run. Items finished before it stay marked
/// in the store, so the next run picks up where this one stopped.
pub struct SourceProcessor {
    strategy: Arc<dyn FeedStrategy>,
    collaborators: Collaborators,
    limiter: ArticleLimiter,
}

impl SourceProcessor {
    pub fn new(strategy: Arc<dyn FeedStrategy>, collaborators: Collaborators, limiter: ArticleLimiter) -> Self {
        Self {
            strategy,
            collaborators,
            limiter,
        }
    }

    pub fn source_name(&self) -> String {
        self.strategy.config().name
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport, RunError> {
        let config = self.strategy.config();
        let run_id = Uuid::new_v4();
        let span = info_span!("feed_run", source = %config.name, %run_id);
        self.run_inner(config, run_id, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        config: FeedConfig,
        run_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        let mut report = RunReport::new(config.name.clone(), run_id);
        info!("Starting {} run ({})", config.display_name, config.endpoint);

        let headers = self.strategy.request_headers();
        let body = guarded(
            cancel,
            self.collaborators.fetcher.fetch(&config.endpoint, &headers),
            |source| PipelineError::FeedFetch {
                url: config.endpoint.clone(),
                source,
            },
        )
        .await
        .map_err(|e| self.fail(Stage::Fetch, None, e))?;

        let items = self
            .strategy
            .parse_feed(&body)
            .map_err(|e| self.fail(Stage::Parse, None, e))?;
        report.fetched = items.len();
        let items = self.strategy.filter_items(items);
        report.filtered = items.len();

        let mut index = guarded(
            cancel,
            IndexHandle::open(self.collaborators.store.clone()),
            PipelineError::IndexLoad,
        )
        .await
        .map_err(|e| self.fail(Stage::IndexLoad, None, e))?;

        let fresh = dedup::filter_unprocessed(items, index.snapshot());
        report.new_items = fresh.len();
        let selected = self.limiter.limit(fresh);
        report.selected = selected.len();
        info!(
            "{} items fetched, {} kept by filter, {} new, {} selected (limit: {})",
            report.fetched, report.filtered, report.new_items, report.selected, self.limiter
        );

        for item in &selected {
            let key = dedup::generate_key(item);
            if index.contains(&key) {
                debug!("Skipping {:?}: {} already marked in this run", item.title, key);
                continue;
            }
            self.process_item(item, &key, &mut index, cancel, &mut report)
                .await?;
        }

        guarded(cancel, index.persist(), PipelineError::IndexPersist)
            .await
            .map_err(|e| self.fail(Stage::Persist, None, e))?;

        info!(
            "Finished {} run: {} processed, {} notifications sent",
            config.name, report.processed, report.notifications_sent
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        item: &Item,
        key: &str,
        index: &mut IndexHandle,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        let item_ref = || Some(ItemRef::new(item, key));
        debug!("Processing {:?} ({})", item.title, key);

        let summary = guarded(
            cancel,
            self.collaborators
                .summarizer
                .summarize(&SummaryRequest::Url(item.link.clone())),
            PipelineError::Summarization,
        )
        .await
        .map_err(|e| self.fail(Stage::Summarize, item_ref(), e))?;

        let discussion = match self.strategy.discussion() {
            Some(capability) => self
                .discussion_summary(capability, item, cancel)
                .await
                .map_err(|e| self.fail(Stage::Discussion, item_ref(), e))?,
            None => None,
        };

        guarded(
            cancel,
            self.collaborators
                .notifier
                .notify(&Notification::article(item, &summary)),
            PipelineError::Notification,
        )
        .await
        .map_err(|e| self.fail(Stage::Notify, item_ref(), e))?;
        report.notifications_sent += 1;

        if let Some(discussion) = discussion {
            guarded(
                cancel,
                self.collaborators
                    .notifier
                    .notify(&Notification::discussion(item, &discussion)),
                PipelineError::Notification,
            )
            .await
            .map_err(|e| self.fail(Stage::NotifyDiscussion, item_ref(), e))?;
            report.notifications_sent += 1;
            report.discussion_summaries += 1;
        }

        guarded(cancel, index.mark(key, item), |source| PipelineError::IndexMark {
            key: key.to_string(),
            source,
        })
        .await
        .map_err(|e| self.fail(Stage::Mark, item_ref(), e))?;
        report.processed += 1;

        info!("Processed {:?}", item.title);
        Ok(())
    }

    /// Summary of the item's comment thread. Failures and empty threads are
    /// logged and yield `None`; only fatal errors (cancellation) come back as
    /// `Err`.
    async fn discussion_summary(
        &self,
        capability: &dyn DiscussionCapability,
        item: &Item,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PipelineError> {
        let Some(url) = capability.discussion_url(item) else {
            debug!("No discussion thread for {:?}", item.title);
            return Ok(None);
        };

        let headers = capability.request_headers();
        let comments = guarded(
            cancel,
            self.collaborators.fetcher.fetch(&url, &headers),
            |e| PipelineError::DiscussionFetch(format!("{}: {}", url, e)),
        )
        .await
        .and_then(|body| capability.extract_comments(&body));

        let comments = match comments {
            Ok(comments) if comments.trim().is_empty() => {
                info!("No comments yet on {:?}, skipping discussion summary", item.title);
                return Ok(None);
            }
            Ok(comments) => comments,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping discussion for {:?}: {}", item.title, e);
                return Ok(None);
            }
        };

        let summary = guarded(
            cancel,
            self.collaborators
                .summarizer
                .summarize(&SummaryRequest::Text(comments)),
            PipelineError::DiscussionSummarization,
        )
        .await;

        match summary {
            Ok(summary) if summary.trim().is_empty() => {
                warn!("Empty discussion summary for {:?}", item.title);
                Ok(None)
            }
            Ok(summary) => Ok(Some(summary)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Skipping discussion for {:?}: {}", item.title, e);
                Ok(None)
            }
        }
    }

    fn fail(&self, stage: Stage, item: Option<ItemRef>, error: PipelineError) -> RunError {
        let run_error = RunError {
            source_name: self.source_name(),
            stage,
            item,
            error,
        };
        error!("{}", run_error);
        run_error
    }
}

/// Run each strategy once, one after another. Runs are independent: a
/// failed source does not stop the ones after it.
pub async fn run_all(
    strategies: Vec<Arc<dyn FeedStrategy>>,
    collaborators: &Collaborators,
    limiter: ArticleLimiter,
    cancel: &CancellationToken,
) -> Vec<Result<RunReport, RunError>> {
    let mut results = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let processor = SourceProcessor::new(strategy, collaborators.clone(), limiter);
        results.push(processor.run(cancel).await);
    }
    results
}
