use std::fmt;

use chrono::{DateTime, Utc};
use nv_core::{ErrorKind, Priority, RankKey};
use serde::Serialize;

use crate::state::Stage;

/// Process exit code for a run that could not start or list the homepage.
pub const FATAL_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub url: String,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedRecord {
    pub url: String,
    pub priority: Priority,
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn rank_key(&self) -> RankKey {
        RankKey {
            priority: self.priority,
            created_at: self.created_at,
            position: self.position,
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// Every new article was persisted, or there was nothing to do
    Complete,
    /// At least one article failed or was never attempted
    Partial,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Complete => 0,
            RunOutcome::Partial => 2,
        }
    }
}

/// Everything that happened during one pass over a homepage.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub homepage: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Distinct candidates found on the homepage
    pub candidates: usize,
    pub persisted: Vec<PersistedRecord>,
    pub skipped_known: Vec<String>,
    /// Known articles whose stored priority was updated
    pub reranked: Vec<String>,
    /// Candidates never started because the run was cancelled
    pub not_attempted: Vec<String>,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub(crate) fn new(homepage: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            homepage: homepage.to_string(),
            started_at,
            finished_at: started_at,
            candidates: 0,
            persisted: Vec::new(),
            skipped_known: Vec::new(),
            reranked: Vec::new(),
            not_attempted: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_persisted(&self, url: &str) -> bool {
        self.persisted.iter().any(|p| p.url == url)
    }

    pub fn failure_for(&self, url: &str) -> Option<&FailureRecord> {
        self.failures.iter().find(|f| f.url == url)
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.failures.is_empty() && self.not_attempted.is_empty() {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome().exit_code()
    }

    /// Sorts the collected records so output does not depend on completion order.
    /// Persisted articles come out in ranking order.
    pub(crate) fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = finished_at;
        self.persisted.sort_by_key(PersistedRecord::rank_key);
        self.failures.sort_by(|a, b| a.url.cmp(&b.url));
        self.skipped_known.sort();
        self.reranked.sort();
        self.not_attempted.sort();
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        writeln!(f, "Run over {} finished in {:.1}s", self.homepage, elapsed)?;
        writeln!(f, "  candidates:    {}", self.candidates)?;
        writeln!(f, "  persisted:     {}", self.persisted_count())?;
        writeln!(f, "  failed:        {}", self.failed_count())?;
        writeln!(f, "  skipped known: {}", self.skipped_known.len())?;
        if !self.reranked.is_empty() {
            writeln!(f, "  reranked:      {}", self.reranked.len())?;
        }
        writeln!(f, "  not attempted: {}", self.not_attempted.len())?;
        for failure in &self.failures {
            writeln!(
                f,
                "  ✗ ({}, {}, {}: {})",
                failure.url, failure.stage, failure.kind, failure.reason
            )?;
        }
        Ok(())
    }
}
