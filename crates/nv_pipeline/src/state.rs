use std::fmt;

use nv_core::Error;
use serde::Serialize;

use crate::logging::Logger;

/// Stage at which an article can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Fetching,
    Summarizing,
    Persisting,
    /// Priority update of an already stored article
    Reranking,
}

impl Stage {
    /// Error of this stage's kind, e.g. for timeouts and abandoned work.
    pub fn error(self, reason: String) -> Error {
        match self {
            Stage::Fetching => Error::Fetch(reason),
            Stage::Summarizing => Error::Summarization(reason),
            Stage::Persisting | Stage::Reranking => Error::Persistence(reason),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle of one homepage candidate within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleState {
    Discovered,
    /// Already stored, skipped
    Deduplicated,
    Fetching,
    Fetched,
    Summarizing,
    Summarized,
    Persisting,
    Persisted,
    Failed { stage: Stage, reason: String },
}

impl ArticleState {
    pub fn can_advance_to(&self, next: &ArticleState) -> bool {
        use ArticleState::*;
        matches!(
            (self, next),
            (Discovered, Deduplicated)
                | (Discovered, Fetching)
                | (Fetching, Fetched)
                | (Fetched, Summarizing)
                | (Summarizing, Summarized)
                | (Summarized, Persisting)
                | (Persisting, Persisted)
                | (Fetching, Failed { stage: Stage::Fetching, .. })
                | (Summarizing, Failed { stage: Stage::Summarizing, .. })
                | (Persisting, Failed { stage: Stage::Persisting, .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArticleState::Deduplicated | ArticleState::Persisted | ArticleState::Failed { .. }
        )
    }

    /// The stage an error raised in this state belongs to.
    pub fn failing_stage(&self) -> Stage {
        match self {
            ArticleState::Discovered | ArticleState::Fetching => Stage::Fetching,
            ArticleState::Fetched | ArticleState::Summarizing => Stage::Summarizing,
            _ => Stage::Persisting,
        }
    }
}

/// Walks one article through [`ArticleState`], logging each step.
#[derive(Debug)]
pub(crate) struct ArticleTracker {
    state: ArticleState,
    logger: Logger,
}

impl ArticleTracker {
    pub fn new(url: &str) -> Self {
        Self {
            state: ArticleState::Discovered,
            logger: Logger::for_article(url),
        }
    }

    pub fn state(&self) -> &ArticleState {
        &self.state
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn advance(&mut self, next: ArticleState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        self.logger.debug(&format!("{:?} -> {:?}", self.state, next));
        self.state = next;
    }

    /// Moves to `Failed` at the current stage and returns that stage.
    pub fn fail(&mut self, reason: String) -> Stage {
        let stage = self.state.failing_stage();
        if !matches!(self.state, ArticleState::Fetching | ArticleState::Summarizing | ArticleState::Persisting) {
            // failed between steps, e.g. abandoned after a fetch completed
            self.state = match stage {
                Stage::Fetching => ArticleState::Fetching,
                Stage::Summarizing => ArticleState::Summarizing,
                _ => ArticleState::Persisting,
            };
        }
        self.logger.error(&format!("❌ Failed while {:?}: {}", stage, reason));
        self.advance(ArticleState::Failed { stage, reason });
        stage
    }
}
