use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use nv_core::{
    ArticleCandidate, Error, Result, Scraper, StorageManager, SummarizedArticle, Summarizer,
};
use rand::Rng;
use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::logging::Logger;
use crate::priority::compute_priority;
use crate::report::{FailureRecord, PersistedRecord, RunReport};
use crate::state::{ArticleState, ArticleTracker, Stage};

/// Result of one article unit, collected after the fan-out.
enum UnitResult {
    Persisted(PersistedRecord),
    Failed(FailureRecord),
    NotAttempted(String),
}

/// Run-level stop conditions shared by all units.
#[derive(Clone, Copy)]
struct Deadlines {
    soft: Option<Instant>,
    hard: Option<Instant>,
}

/// Processes one homepage end to end: list, dedup, fetch, summarize, rank, persist.
pub struct ContentPipeline {
    scraper: Arc<dyn Scraper>,
    summarizer: Arc<dyn Summarizer>,
    storage: Arc<dyn StorageManager>,
    config: PipelineConfig,
    logger: Logger,
}

impl ContentPipeline {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        summarizer: Arc<dyn Summarizer>,
        storage: Arc<dyn StorageManager>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let logger = Logger::new().with_prefix(format!("[{}]", scraper.source()));
        Ok(Self {
            scraper,
            summarizer,
            storage,
            config,
            logger,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The configured homepage, or the scraper's own when none is set.
    pub fn homepage(&self) -> String {
        self.config
            .homepage
            .clone()
            .unwrap_or_else(|| self.scraper.homepage().to_string())
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_with_cancel(&CancelToken::new()).await
    }

    pub async fn run_with_cancel(&self, cancel: &CancelToken) -> Result<RunReport> {
        self.run_at(Utc::now(), cancel).await
    }

    /// One full pass with `now` as the run start used for recency.
    ///
    /// Only a failing `known_urls` or homepage listing returns `Err`; every
    /// per-article failure ends up in the report.
    pub async fn run_at(&self, now: DateTime<Utc>, cancel: &CancelToken) -> Result<RunReport> {
        let started = Instant::now();
        let deadlines = Deadlines {
            soft: self.config.soft_deadline().map(|d| started + d),
            hard: self.config.hard_deadline().map(|d| started + d),
        };
        let homepage = self.homepage();
        let mut report = RunReport::new(&homepage, now);
        self.logger.info(&format!(
            "🦗 Starting run over {} (summarizer: {})",
            homepage,
            self.summarizer.name()
        ));

        let known = self.storage.known_urls().await.map_err(|e| {
            self.logger.error(&format!("💾 Could not read stored URLs: {}", e));
            e
        })?;
        self.logger.info(&format!("💾 {} articles already stored", known.len()));

        let listed = match tokio::time::timeout(
            self.config.fetch_timeout(),
            self.scraper.list_urls(&homepage),
        )
        .await
        {
            Ok(listed) => listed,
            Err(_) => Err(Error::Fetch(format!(
                "listing {} timed out after {}ms",
                homepage, self.config.fetch_timeout_ms
            ))),
        }
        .map_err(|e| {
            self.logger.error(&format!("❌ Homepage listing failed: {}", e));
            e
        })?;

        let candidates = dedup_candidates(listed);
        report.candidates = candidates.len();
        let (known_candidates, fresh): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|candidate| known.contains(&candidate.url));
        report.skipped_known = known_candidates.iter().map(|c| c.url.clone()).collect();
        self.logger.info(&format!(
            "📰 {} candidates, {} new, {} already stored",
            report.candidates,
            fresh.len(),
            known_candidates.len()
        ));

        let results: Vec<UnitResult> = stream::iter(fresh)
            .map(|candidate| self.process(candidate, now, cancel, deadlines))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        for result in results {
            match result {
                UnitResult::Persisted(record) => report.persisted.push(record),
                UnitResult::Failed(failure) => report.failures.push(failure),
                UnitResult::NotAttempted(url) => report.not_attempted.push(url),
            }
        }

        if self.config.rerank_known {
            self.rerank_known(&known_candidates, now, cancel, deadlines, &mut report)
                .await;
        }

        let elapsed = chrono::Duration::from_std(started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        report.finish(now + elapsed);
        self.logger.info(&format!(
            "✅ Run finished: {} persisted, {} failed, {} not attempted",
            report.persisted_count(),
            report.failed_count(),
            report.not_attempted.len()
        ));
        Ok(report)
    }

    async fn process(
        &self,
        candidate: ArticleCandidate,
        now: DateTime<Utc>,
        cancel: &CancelToken,
        deadlines: Deadlines,
    ) -> UnitResult {
        let delay = self.politeness_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if should_stop(cancel, deadlines) {
            Logger::for_article(&candidate.url).warn("⏹️ Not attempted, run is stopping");
            return UnitResult::NotAttempted(candidate.url);
        }

        let mut tracker = ArticleTracker::new(&candidate.url);
        let prepared = match deadlines.hard {
            Some(deadline) => {
                let result =
                    tokio::time::timeout_at(deadline, self.prepare(&candidate, now, &mut tracker))
                        .await;
                match result {
                    Ok(prepared) => prepared,
                    Err(_) => Err(tracker
                        .state()
                        .failing_stage()
                        .error("abandoned at hard deadline".to_string())),
                }
            }
            None => self.prepare(&candidate, now, &mut tracker).await,
        };

        let article = match prepared {
            Ok(article) => article,
            Err(e) => return failed(&mut tracker, &candidate.url, e),
        };

        tracker.advance(ArticleState::Persisting);
        tracker.logger().info("💾 Storing article");
        let saved = bounded(
            Stage::Persisting,
            self.config.persist_timeout(),
            self.storage.save(&article),
        )
        .await;
        match saved {
            Ok(()) => {
                tracker.advance(ArticleState::Persisted);
                tracker
                    .logger()
                    .info(&format!("✨ Stored with priority {}", article.priority));
                UnitResult::Persisted(PersistedRecord {
                    url: article.url,
                    priority: article.priority,
                    position: candidate.position,
                    created_at: article.created_at,
                })
            }
            Err(e) => failed(&mut tracker, &candidate.url, e),
        }
    }

    /// Fetch and summarize one article, then compose the record to store.
    async fn prepare(
        &self,
        candidate: &ArticleCandidate,
        now: DateTime<Utc>,
        tracker: &mut ArticleTracker,
    ) -> Result<SummarizedArticle> {
        tracker.advance(ArticleState::Fetching);
        tracker.logger().info("📰 Fetching article");
        let mut raw = bounded(
            Stage::Fetching,
            self.config.fetch_timeout(),
            self.scraper.fetch(&candidate.url),
        )
        .await?;
        // the listing URL is the dedup key, even if the page reports another
        raw.url = candidate.url.clone();
        tracker.advance(ArticleState::Fetched);

        tracker.advance(ArticleState::Summarizing);
        tracker.logger().info("🤖 Generating summary");
        let digest = bounded(
            Stage::Summarizing,
            self.config.summarize_timeout(),
            self.summarizer.summarize(&raw.text),
        )
        .await?;
        tracker.advance(ArticleState::Summarized);

        let created_at = raw.published_at.unwrap_or(now);
        let priority = compute_priority(&self.config.weights, candidate, created_at, now);
        Ok(SummarizedArticle::compose(
            raw,
            digest,
            priority,
            candidate.position,
            created_at,
        ))
    }

    async fn rerank_known(
        &self,
        candidates: &[ArticleCandidate],
        now: DateTime<Utc>,
        cancel: &CancelToken,
        deadlines: Deadlines,
        report: &mut RunReport,
    ) {
        for candidate in candidates {
            if should_stop(cancel, deadlines) {
                self.logger.warn("⏹️ Skipping remaining priority updates");
                return;
            }
            match self.rerank(candidate, now).await {
                Ok(true) => report.reranked.push(candidate.url.clone()),
                Ok(false) => {}
                Err(e) => {
                    Logger::for_article(&candidate.url)
                        .error(&format!("❌ Priority update failed: {}", e));
                    report.failures.push(FailureRecord {
                        url: candidate.url.clone(),
                        stage: Stage::Reranking,
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Recomputes a stored article's priority from its new listing position.
    /// Returns whether the stored value changed.
    async fn rerank(&self, candidate: &ArticleCandidate, now: DateTime<Utc>) -> Result<bool> {
        let timeout = self.config.persist_timeout();
        let stored = bounded(Stage::Reranking, timeout, self.storage.get(&candidate.url))
            .await?
            .ok_or_else(|| Error::Persistence(format!("{} is no longer stored", candidate.url)))?;

        let priority = compute_priority(&self.config.weights, candidate, stored.created_at, now);
        if priority == stored.priority {
            return Ok(false);
        }
        bounded(
            Stage::Reranking,
            timeout,
            self.storage.update_priority(&candidate.url, priority),
        )
        .await?;
        Logger::for_article(&candidate.url).info(&format!(
            "🔄 Priority {} -> {}",
            stored.priority, priority
        ));
        Ok(true)
    }

    fn politeness_delay(&self) -> Duration {
        let jitter = if self.config.request_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.config.request_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.request_delay_ms.saturating_add(jitter))
    }
}

/// Bounds one blocking call; running out of time becomes that stage's error.
async fn bounded<T, F>(stage: Stage, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(stage.error(format!("timed out after {}ms", limit.as_millis()))),
    }
}

/// True once no new unit may start: cancelled, or either deadline has passed.
fn should_stop(cancel: &CancelToken, deadlines: Deadlines) -> bool {
    let now = Instant::now();
    cancel.is_cancelled()
        || deadlines.soft.is_some_and(|soft| now >= soft)
        || deadlines.hard.is_some_and(|hard| now >= hard)
}

fn failed(tracker: &mut ArticleTracker, url: &str, error: Error) -> UnitResult {
    let reason = error.to_string();
    let stage = tracker.fail(reason.clone());
    UnitResult::Failed(FailureRecord {
        url: url.to_string(),
        stage,
        kind: error.kind(),
        reason,
    })
}

/// Keeps the first occurrence of every URL so each one has a single writer.
fn dedup_candidates(candidates: Vec<ArticleCandidate>) -> Vec<ArticleCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect()
}
