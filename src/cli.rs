use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (defaults to ./subweave.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Folder a step runs over
#[derive(clap::Args, Debug, Clone)]
pub struct StepArgs {
    /// Folder containing the media files (searched recursively)
    pub folder: PathBuf,

    /// Regenerate outputs that already exist instead of skipping them
    #[arg(long)]
    pub overwrite: bool,
}

/// Language pair overrides
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LanguageArgs {
    /// Source language name or code, or "auto"
    #[arg(short, long)]
    pub source: Option<String>,

    /// Target language name or code
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rename media files with FileBot
    Rename {
        #[command(flatten)]
        step: StepArgs,
    },

    /// Extract subtitle tracks from media files
    Extract {
        #[command(flatten)]
        step: StepArgs,
    },

    /// Clean extracted subtitle files
    Clean {
        #[command(flatten)]
        step: StepArgs,
    },

    /// Translate cleaned subtitle files
    Translate {
        #[command(flatten)]
        step: StepArgs,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Embed translated subtitles into their media files
    Embed {
        #[command(flatten)]
        step: StepArgs,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Run rename, extract, clean, translate and embed in sequence
    RunAll {
        #[command(flatten)]
        step: StepArgs,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Check that the configured external tools can be found
    Check,

    /// List supported languages
    Languages,

    /// Translate a single line of text to try the translation settings
    TranslateText {
        /// Text to translate
        text: String,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Delete cleaned intermediate subtitle files
    Purge {
        /// Folder to clean up (searched recursively)
        folder: PathBuf,
    },

    /// Manage the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "subweave.toml")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached translations
    List,

    /// Show cache statistics and size
    Info,

    /// Clear all cached translations
    Clear,
}
