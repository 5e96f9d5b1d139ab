//! Subweave - subtitle pipeline for Matroska libraries
//!
//! Command-line entry point: parses arguments, sets up logging, loads the
//! configuration and dispatches to the workflow.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subweave::cli::{Args, CacheAction, Commands, LanguageArgs, StepArgs};
use subweave::config::{Config, ExistingPolicy};
use subweave::error::SubweaveError;
use subweave::language::{self, LANGUAGES};
use subweave::media::{SystemRunner, Tool, ToolRunner};
use subweave::report::Step;
use subweave::translate;
use subweave::workflow::Workflow;

const DEFAULT_CONFIG: &str = "subweave.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file; the guard flushes the file on exit
    let _log_guard = setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Fall back to subweave.toml in the current directory
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Rename { step } => run_step(config, Step::Rename, &step, args.verbose).await?,
        Commands::Extract { step } => run_step(config, Step::Extract, &step, args.verbose).await?,
        Commands::Clean { step } => run_step(config, Step::Clean, &step, args.verbose).await?,
        Commands::Translate { step, languages } => {
            apply_languages(&mut config, &languages);
            run_step(config, Step::Translate, &step, args.verbose).await?
        }
        Commands::Embed { step, languages } => {
            apply_languages(&mut config, &languages);
            run_step(config, Step::Embed, &step, args.verbose).await?
        }
        Commands::RunAll { step, languages } => {
            apply_languages(&mut config, &languages);
            apply_overwrite(&mut config, &step);

            let workflow = Workflow::new(config)?.with_progress(show_progress(args.verbose));
            let report = workflow.run_all(&step.folder).await?;
            println!("{}", report.render());
        }
        Commands::Check => check_tools(&config)?,
        Commands::Languages => {
            println!("{:<24} {:<8} {:<8}", "Language", "Code", "ISO 639-2");
            println!("{}", "-".repeat(42));
            for lang in LANGUAGES {
                println!("{:<24} {:<8} {:<8}", lang.name, lang.code, lang.iso639_2);
            }
        }
        Commands::TranslateText { text, languages } => {
            apply_languages(&mut config, &languages);
            config.validate()?;

            let source = language::source_code(&config.languages.source)?;
            let target = language::resolve(&config.languages.target)?;
            // Same cached service the translate step uses
            let service = translate::build_service(&config.translate)?;
            let translated = service.translate(&text, &source, target.code).await?;
            println!("{} -> {}: {}", source, target.name, translated);
        }
        Commands::Purge { folder } => {
            let workflow = Workflow::new(config)?;
            let removed = workflow.purge(&folder).await?;
            println!("Removed {} cleaned subtitle file(s)", removed.len());
        }
        Commands::Cache { action } => {
            // Memory-only when the persistent cache is disabled
            let cache = translate::build_cache(&config.translate);
            match action {
                CacheAction::List => {
                    let entries = cache.list().await?;
                    if entries.is_empty() {
                        println!("No cached translations found.");
                    } else {
                        println!("\nCached Translations:");
                        println!("{:<8} {:<8} {:<12} {:<50}", "Source", "Target", "Cached", "Text");
                        println!("{}", "-".repeat(80));
                        for entry in entries {
                            let age = (Utc::now() - entry.cached_at).num_seconds().max(0) as u64;
                            let preview: String = entry.source_text.chars().take(47).collect();
                            println!(
                                "{:<8} {:<8} {:<12} {:<50}",
                                entry.source_language,
                                entry.target_language,
                                format_duration(age),
                                preview
                            );
                        }
                    }
                }
                CacheAction::Info => {
                    let info = cache.info().await?;
                    println!("\nTranslation Cache:");
                    match cache.dir() {
                        Some(dir) => println!("Location: {}", dir.display()),
                        None => println!("Location: memory only (cache_enabled = false)"),
                    }
                    println!("Entries: {}", info.entries);
                    println!("Size: {:.2} MB", info.total_size as f64 / 1024.0 / 1024.0);
                    if let Some(oldest) = info.oldest_entry {
                        println!("Oldest entry: {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                    if let Some(newest) = info.newest_entry {
                        println!("Newest entry: {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
                CacheAction::Clear => {
                    let count = cache.clear().await?;
                    println!("Cleared {} cached translations", count);
                }
            }
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(SubweaveError::Config(format!(
                    "{} already exists; pass --force to replace it",
                    path.display()
                ))
                .into());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

async fn run_step(mut config: Config, step: Step, args: &StepArgs, verbose: bool) -> Result<()> {
    apply_overwrite(&mut config, args);
    let workflow = Workflow::new(config)?.with_progress(show_progress(verbose));
    let report = workflow.run_step(step, &args.folder).await?;
    println!("{}", report.render(&args.folder));

    // Per-file failures are reported, not fatal
    if report.has_failures() {
        warn!("{} file(s) failed in the {} step", report.failed.len(), step);
    }
    Ok(())
}

/// Progress bars only on an interactive terminal, and not alongside debug output
fn show_progress(verbose: bool) -> bool {
    !verbose && std::io::stderr().is_terminal()
}

fn apply_languages(config: &mut Config, languages: &LanguageArgs) {
    if let Some(source) = &languages.source {
        config.languages.source = source.clone();
    }
    if let Some(target) = &languages.target {
        config.languages.target = target.clone();
    }
}

fn apply_overwrite(config: &mut Config, args: &StepArgs) {
    if args.overwrite {
        config.pipeline.on_existing = ExistingPolicy::Overwrite;
    }
}

/// Report where each configured tool resolves to
fn check_tools(config: &Config) -> Result<()> {
    let runner = SystemRunner::new();
    let mut missing = 0;

    println!("{:<12} {:<10} {}", "Tool", "Status", "Path");
    println!("{}", "-".repeat(60));
    for tool in [Tool::FileBot, Tool::MkvMerge, Tool::MkvExtract] {
        let configured = tool.configured_path(&config.tools);
        match runner.locate(tool, configured) {
            Ok(path) => println!("{:<12} {:<10} {}", tool.name(), "found", path.display()),
            Err(_) => {
                // FileBot only matters when renaming is on
                let required = tool != Tool::FileBot || config.rename.enabled;
                if required {
                    missing += 1;
                }
                let status = if required { "MISSING" } else { "unused" };
                println!("{:<12} {:<10} {}", tool.name(), status, configured);
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{} required tool(s) not found; check the [tools] section", missing);
    }
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".subweave").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subweave.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console layer goes to stderr so reports on stdout stay clean
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // File layer without ANSI colors
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subweave.log").display()
    );

    Ok(guard)
}

/// Format duration in seconds to human readable string
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86_400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86_400, (seconds % 86_400) / 3600)
    }
}
