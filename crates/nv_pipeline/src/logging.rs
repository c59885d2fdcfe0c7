use std::collections::VecDeque;
use std::sync::Once;

use tracing::Level;

static INIT: Once = Once::new();

/// Prepends one or more prefixes, such as the article URL, to every message.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    prefixes: VecDeque<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_article(url: &str) -> Self {
        Self::new().with_prefix(format!("[{}]", url))
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefixes.push_back(prefix);
        self
    }

    fn prefix(&self) -> String {
        self.prefixes.iter().map(|p| format!("{} ", p)).collect()
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{}{}", self.prefix(), message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{}{}", self.prefix(), message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{}{}", self.prefix(), message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{}{}", self.prefix(), message);
    }
}

/// Installs the global fmt subscriber once. Later calls are no-ops.
pub fn init_logging(verbose: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    });
}
