use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// Duration written as `90`, `45s`, `10m` or `1h15m30s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn as_millis(self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }
}

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3_600),
        'd' => Some(86_400),
        _ => None,
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err("empty duration".to_string());
        }

        let mut rest = compact.as_str();
        let mut seconds = 0u64;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("expected a number before '{}' in '{}'", rest, s));
            }
            let amount: u64 = rest[..digits]
                .parse()
                .map_err(|_| format!("number out of range in '{}'", s))?;
            rest = &rest[digits..];

            // a bare number counts as seconds
            let factor = match rest.chars().next() {
                None => 1,
                Some(unit) => {
                    rest = &rest[unit.len_utf8()..];
                    unit_seconds(unit)
                        .ok_or_else(|| format!("unknown duration unit '{}' in '{}'", unit, s))?
                }
            };
            seconds = seconds.saturating_add(amount.saturating_mul(factor));
        }

        Ok(HumanDuration(Duration::from_secs(seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize a news homepage into ranked articles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// One full pass over the configured homepage
    Run(RunArgs),
    /// List the available scrapers, summarizers and storage engines
    List,
    /// Print stored articles, highest priority first
    Ranked(RankedArgs),
}

/// Options shared by every command that opens storage.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Storage engine (memory, sqlite, postgres)
    #[arg(long)]
    pub storage: Option<String>,
    /// Database connection string; falls back to DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: StorageArgs,
    /// Site to scrape (rtvslo, generic)
    #[arg(long)]
    pub site: Option<String>,
    /// Homepage to list instead of the site's default
    #[arg(long)]
    pub homepage: Option<String>,
    /// Summarizer variant (chat, ollama)
    #[arg(long)]
    pub summarizer: Option<String>,
    /// Ollama endpoint with model, e.g. http://localhost:11434/gemma3:12b
    #[arg(long)]
    pub model_url: Option<String>,
    /// Chat model name
    #[arg(long)]
    pub model: Option<String>,
    /// API key for the chat summarizer; falls back to OPENAI_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,
    /// Maximum number of articles processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Stop starting new articles after this long (e.g. 10m)
    #[arg(long)]
    pub deadline: Option<HumanDuration>,
    /// Abandon unfinished fetch and summarize work after this long
    #[arg(long)]
    pub hard_deadline: Option<HumanDuration>,
    /// Recompute priorities of articles that are already stored
    #[arg(long)]
    pub rerank_known: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RankedArgs {
    #[command(flatten)]
    pub common: StorageArgs,
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
