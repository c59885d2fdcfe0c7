use std::process::ExitCode;

use clap::Parser;
use nv_core::{Scraper, StorageManager, Summarizer};
use nv_pipeline::{init_logging, CancelToken, ContentPipeline, FATAL_EXIT_CODE};
use tracing::{error, info, warn};

mod cli;
mod config;

use cli::{Cli, Commands, RankedArgs, RunArgs};
use config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::List => {
            list();
            Ok(0)
        }
        Commands::Ranked(args) => ranked(args).await,
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("💥 {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(FATAL_EXIT_CODE as u8)
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<i32> {
    init_logging(args.common.verbose);

    let mut config = AppConfig::load(args.common.config.as_deref())?;
    config.apply_run_args(&args);
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;

    let scraper = nv_scrapers::create_scraper(&config.scraper)?;
    info!("🦗 Scraper initialized ({})", scraper.source());
    let summarizer = nv_inference::create_summarizer(&config.summarizer)?;
    info!("🧠 Summarizer initialized ({})", summarizer.name());
    let storage = nv_storage::create_storage(&config.storage).await?;
    info!("✨ Storage initialized ({})", config.storage.engine);

    let pipeline = ContentPipeline::new(scraper, summarizer, storage, config.pipeline)?;

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ Interrupted, letting in-flight articles finish");
            trigger.cancel();
        }
    });

    let report = pipeline.run_with_cancel(&cancel).await?;
    print!("{}", report);
    Ok(report.exit_code())
}

fn list() {
    println!("Scrapers:");
    for site in nv_scrapers::SITES {
        println!("  {}", site);
    }
    println!("Summarizers:");
    for kind in nv_inference::SUMMARIZERS {
        println!("  {}", kind);
    }
    println!("Storage engines:");
    for engine in nv_storage::ENGINES {
        println!("  {}", engine);
    }
}

async fn ranked(args: RankedArgs) -> anyhow::Result<i32> {
    init_logging(args.common.verbose);

    let mut config = AppConfig::load(args.common.config.as_deref())?;
    config.apply_storage_args(&args.common);
    config.apply_env(|key| std::env::var(key).ok());
    config.storage.validate()?;

    let storage = nv_storage::create_storage(&config.storage).await?;
    let articles = storage.ranked(args.limit).await?;
    if articles.is_empty() {
        println!("No stored articles");
    }
    for article in articles {
        println!(
            "{:>6}  {}  {}",
            article.priority.value(),
            article.created_at.format("%Y-%m-%d %H:%M"),
            article.url
        );
        println!("        {}", article.headline);
    }
    Ok(0)
}
