use std::path::Path;

use nv_core::{Error, Result};
use nv_inference::SummarizerConfig;
use nv_pipeline::PipelineConfig;
use nv_scrapers::ScraperConfig;
use nv_storage::StorageConfig;
use serde::Deserialize;

use crate::cli::{RunArgs, StorageArgs};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Whole-process configuration, one section per component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub summarizer: SummarizerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Reads a JSON file, or starts from defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw).map_err(|e| {
                    Error::Configuration(format!("invalid config file {}: {}", path.display(), e))
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn apply_storage_args(&mut self, args: &StorageArgs) {
        if let Some(engine) = &args.storage {
            self.storage.engine = engine.clone();
        }
        if let Some(url) = &args.database_url {
            self.storage.database_url = Some(url.clone());
        }
    }

    pub fn apply_run_args(&mut self, args: &RunArgs) {
        self.apply_storage_args(&args.common);
        if let Some(site) = &args.site {
            self.scraper.site = site.clone();
        }
        if let Some(homepage) = &args.homepage {
            self.scraper.homepage = Some(homepage.clone());
            self.pipeline.homepage = Some(homepage.clone());
        }
        if let Some(kind) = &args.summarizer {
            self.summarizer.kind = kind.clone();
        }
        if let Some(model_url) = &args.model_url {
            self.summarizer.model_url = model_url.clone();
        }
        if let Some(model) = &args.model {
            self.summarizer.model = model.clone();
        }
        if let Some(api_key) = &args.api_key {
            self.summarizer.api_key = Some(api_key.clone());
        }
        if let Some(concurrency) = args.concurrency {
            self.pipeline.concurrency = concurrency;
        }
        if let Some(deadline) = args.deadline {
            self.pipeline.soft_deadline_ms = Some(deadline.as_millis());
        }
        if let Some(deadline) = args.hard_deadline {
            self.pipeline.hard_deadline_ms = Some(deadline.as_millis());
        }
        if args.rerank_known {
            self.pipeline.rerank_known = true;
        }
    }

    /// Fills credentials that neither the file nor the flags provided.
    /// `DATABASE_URL` is only read for the postgres engine.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.summarizer.api_key.is_none() {
            self.summarizer.api_key = lookup(API_KEY_ENV).filter(|key| !key.is_empty());
        }
        if self.storage.engine == "postgres" && self.storage.database_url.is_none() {
            self.storage.database_url = lookup(DATABASE_URL_ENV).filter(|url| !url.is_empty());
        }
    }

    /// Checks every section before any network or database work starts.
    pub fn validate(&self) -> Result<()> {
        self.scraper.validate()?;
        self.summarizer.validate()?;
        self.storage.validate()?;
        self.pipeline.validate()
    }
}
