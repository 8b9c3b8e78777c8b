use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use feed_pipeline::{
    run_all, ArticleLimiter, Collaborators, FeedRegistry, FeedStrategy, FetchConfig, HttpFetcher,
    HttpSummarizer, IndexStore, JsonFileIndexStore, LogNotifier, MockSummarizer, Notifier,
    PgIndexStore, Summarizer, SummarizerConfig, WebhookConfig, WebhookFlavor, WebhookNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feed-pipeline", version, about = "Summarize new feed items and post them to a webhook")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered sources
    Sources,
    /// Process new items from the named sources, or from all of them
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source names, see `sources`
    sources: Vec<String>,

    /// JSON index file, used when no database is configured
    #[arg(long, env = "FEED_INDEX_FILE", default_value = "processed_items.json")]
    index_file: PathBuf,

    /// Keep the index in Postgres instead of a file
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// `all` or `one` new item per source
    #[arg(long, env = "FEED_ARTICLE_LIMIT", default_value = "all")]
    limit: ArticleLimiter,

    #[arg(long, env = "SUMMARIZER_URL")]
    summarizer_url: Option<String>,

    #[arg(long, env = "SUMMARIZER_API_TOKEN", hide_env_values = true)]
    summarizer_token: Option<String>,

    #[arg(long, env = "SUMMARIZER_ENGINE")]
    summarizer_engine: Option<String>,

    #[arg(long, env = "NOTIFY_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// `slack` or `discord`
    #[arg(long, env = "NOTIFY_WEBHOOK_FLAVOR", default_value = "slack")]
    webhook_flavor: WebhookFlavor,

    /// Cancel whatever is still running after this many seconds
    #[arg(long, env = "FEED_RUN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log notifications instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Use canned summaries instead of the summarization service
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let registry = FeedRegistry::with_defaults();

    match cli.command {
        Command::Sources => {
            for name in registry.names() {
                if let Some(strategy) = registry.get_strategy(&name) {
                    let config = strategy.config();
                    let discussion = if strategy.discussion().is_some() { "discussion" } else { "" };
                    println!(
                        "{:<12} {:<14} {:<50} {}",
                        config.name, config.display_name, config.endpoint, discussion
                    );
                }
            }
            Ok(())
        }
        Command::Run(args) => run(args, &registry).await,
    }
}

async fn run(args: RunArgs, registry: &FeedRegistry) -> Result<()> {
    let strategies = select_strategies(registry, &args.sources)?;
    let collaborators = build_collaborators(&args).await?;

    let cancel = CancellationToken::new();
    watch_for_shutdown(cancel.clone(), args.timeout_secs);

    info!(
        "Running {} source(s) with article limit {}",
        strategies.len(),
        args.limit
    );
    let results = run_all(strategies, &collaborators, args.limit, &cancel).await;

    let mut failed = 0;
    for result in &results {
        match result {
            Ok(report) => info!(
                "{}: {} processed, {} notifications sent, {} discussion summaries",
                report.source, report.processed, report.notifications_sent, report.discussion_summaries
            ),
            // Already logged with full context by the processor.
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        bail!("{} of {} source runs failed", failed, results.len());
    }
    Ok(())
}

fn select_strategies(registry: &FeedRegistry, names: &[String]) -> Result<Vec<Arc<dyn FeedStrategy>>> {
    if names.is_empty() {
        return Ok(registry
            .names()
            .iter()
            .filter_map(|name| registry.get_strategy(name))
            .collect());
    }

    names
        .iter()
        .map(|name| {
            registry.get_strategy(name).with_context(|| {
                format!("unknown source {:?}, expected one of: {}", name, registry.names().join(", "))
            })
        })
        .collect()
}

async fn build_collaborators(args: &RunArgs) -> Result<Collaborators> {
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::default())?);

    let summarizer: Arc<dyn Summarizer> = if args.offline {
        Arc::new(MockSummarizer::new("offline"))
    } else {
        let api_token = args
            .summarizer_token
            .clone()
            .context("SUMMARIZER_API_TOKEN is required unless --offline is set")?;
        let mut config = SummarizerConfig {
            api_token,
            engine: args.summarizer_engine.clone(),
            ..Default::default()
        };
        if let Some(endpoint) = &args.summarizer_url {
            config.endpoint = endpoint.clone();
        }
        Arc::new(HttpSummarizer::new(config)?)
    };
    info!("Summarizer: {}", summarizer.name());

    let notifier: Arc<dyn Notifier> = if args.dry_run {
        Arc::new(LogNotifier)
    } else {
        let url = args
            .webhook_url
            .clone()
            .context("NOTIFY_WEBHOOK_URL is required unless --dry-run is set")?;
        Arc::new(WebhookNotifier::new(WebhookConfig {
            url,
            flavor: args.webhook_flavor,
            ..Default::default()
        })?)
    };

    let store: Arc<dyn IndexStore> = match &args.database_url {
        Some(database_url) => {
            info!("Using Postgres index");
            Arc::new(
                PgIndexStore::connect(database_url)
                    .await
                    .context("failed to open the Postgres index")?,
            )
        }
        None => {
            info!("Using index file {}", args.index_file.display());
            Arc::new(JsonFileIndexStore::new(args.index_file.clone()))
        }
    };

    Ok(Collaborators {
        fetcher,
        summarizer,
        notifier,
        store,
    })
}

/// Cancel `cancel` on Ctrl-C, and after `timeout_secs` when given.
fn watch_for_shutdown(cancel: CancellationToken, timeout_secs: Option<u64>) {
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the current run");
            on_interrupt.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("Run time limit of {}s reached, cancelling", secs);
            cancel.cancel();
        });
    }
}
