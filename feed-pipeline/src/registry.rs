use crate::sources::{rust_blog, slashdot, HackerNewsSource, LobstersSource};
use crate::traits::FeedStrategy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One instance of every built-in source.
pub fn default_strategies() -> Vec<Arc<dyn FeedStrategy>> {
    vec![
        Arc::new(HackerNewsSource::new()),
        Arc::new(LobstersSource::new()),
        Arc::new(slashdot::main_feed()),
        Arc::new(rust_blog::main_feed()),
    ]
}

/// Feed strategies by source name.
#[derive(Default)]
pub struct FeedRegistry {
    strategies: HashMap<String, Arc<dyn FeedStrategy>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry holding `default_strategies()`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for strategy in default_strategies() {
            registry.register(strategy);
        }
        registry
    }

    /// Register a strategy under its configured name. A strategy already
    /// registered under that name is replaced.
    pub fn register(&mut self, strategy: Arc<dyn FeedStrategy>) {
        let name = strategy.config().name;
        if self.strategies.insert(name.clone(), strategy).is_some() {
            debug!("Replaced feed strategy: {}", name);
        } else {
            info!("Registering feed strategy: {}", name);
        }
    }

    /// Get a strategy by name
    pub fn get_strategy(&self, name: &str) -> Option<Arc<dyn FeedStrategy>> {
        self.strategies.get(name).cloned()
    }

    pub fn all_strategies(&self) -> &HashMap<String, Arc<dyn FeedStrategy>> {
        &self.strategies
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
