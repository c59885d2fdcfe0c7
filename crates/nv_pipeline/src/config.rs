use std::time::Duration;

use nv_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Knobs of the priority formula, see [`crate::compute_priority`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub base: i64,
    /// Penalty per listing position
    pub position_step: i64,
    /// Penalty per hour of article age
    pub hourly_decay: i64,
    /// Age beyond which an article stops losing priority
    pub max_age_hours: i64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            base: 10_000,
            position_step: 10,
            hourly_decay: 5,
            max_age_hours: 168,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Homepage to process. Falls back to the scraper's own homepage.
    pub homepage: Option<String>,
    /// Maximum number of articles in flight
    pub concurrency: usize,
    pub fetch_timeout_ms: u64,
    pub summarize_timeout_ms: u64,
    pub persist_timeout_ms: u64,
    /// Pause before each article fetch
    pub request_delay_ms: u64,
    /// Random extra pause in `[0, request_jitter_ms)`
    pub request_jitter_ms: u64,
    /// After this, no new article work is started
    pub soft_deadline_ms: Option<u64>,
    /// After this, unfinished fetch/summarize work is abandoned
    pub hard_deadline_ms: Option<u64>,
    /// Recompute the priority of already stored articles seen on the homepage
    pub rerank_known: bool,
    pub weights: PriorityWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            homepage: None,
            concurrency: 4,
            fetch_timeout_ms: 30_000,
            summarize_timeout_ms: 120_000,
            persist_timeout_ms: 10_000,
            request_delay_ms: 0,
            request_jitter_ms: 0,
            soft_deadline_ms: None,
            hard_deadline_ms: None,
            rerank_known: false,
            weights: PriorityWeights::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(homepage) = &self.homepage {
            url::Url::parse(homepage)
                .map_err(|e| Error::Configuration(format!("invalid homepage {}: {}", homepage, e)))?;
        }
        if self.concurrency == 0 {
            return Err(Error::Configuration("concurrency must be at least 1".to_string()));
        }
        if self.fetch_timeout_ms == 0 || self.summarize_timeout_ms == 0 || self.persist_timeout_ms == 0 {
            return Err(Error::Configuration("timeouts must be greater than zero".to_string()));
        }
        if let (Some(soft), Some(hard)) = (self.soft_deadline_ms, self.hard_deadline_ms) {
            if soft > hard {
                return Err(Error::Configuration(
                    "the soft deadline cannot be later than the hard deadline".to_string(),
                ));
            }
        }
        let w = &self.weights;
        if w.position_step < 0 || w.hourly_decay < 0 || w.max_age_hours < 0 {
            return Err(Error::Configuration(
                "priority penalties must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn summarize_timeout(&self) -> Duration {
        Duration::from_millis(self.summarize_timeout_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn soft_deadline(&self) -> Option<Duration> {
        self.soft_deadline_ms.map(Duration::from_millis)
    }

    pub fn hard_deadline(&self) -> Option<Duration> {
        self.hard_deadline_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            PipelineConfig { concurrency: 0, ..Default::default() },
            PipelineConfig { homepage: Some("rtvslo".to_string()), ..Default::default() },
            PipelineConfig { fetch_timeout_ms: 0, ..Default::default() },
            PipelineConfig {
                soft_deadline_ms: Some(2_000),
                hard_deadline_ms: Some(1_000),
                ..Default::default()
            },
            PipelineConfig {
                weights: PriorityWeights { position_step: -1, ..Default::default() },
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(Error::Configuration(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"concurrency": 2, "weights": {"base": 50}}"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.weights.base, 50);
        assert_eq!(config.weights.position_step, 10);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert!(config.hard_deadline().is_none());
    }
}
