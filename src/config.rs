use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SubweaveError};
use crate::language;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub languages: LanguageConfig,
    pub media: MediaConfig,
    pub rename: RenameConfig,
    pub extract: ExtractConfig,
    pub clean: CleanConfig,
    pub translate: TranslateConfig,
    pub pipeline: PipelineConfig,
}

/// Installation paths of the external tools. Bare names are looked up on PATH.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub filebot_path: String,
    pub mkvmerge_path: String,
    pub mkvextract_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Source language name or code, or "auto"
    pub source: String,
    /// Target language name or code
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Container extensions treated as media files
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    pub enabled: bool,
    /// FileBot naming format expression
    pub format: String,
    /// FileBot conflict action (skip, override, auto, index, fail)
    pub conflict: String,
    pub non_strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Track languages to extract; empty extracts every subtitle track
    pub languages: Vec<String>,
    /// Only extract SubRip text tracks
    pub text_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub strip_curly: bool,
    pub strip_square: bool,
    pub strip_parentheses: bool,
    pub strip_speaker_labels: bool,
    pub strip_music_cues: bool,
    pub remove_uppercase_sdh: bool,
    pub remove_watermarks: bool,
    pub remove_formatting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Translation endpoints, used round-robin
    pub endpoints: Vec<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries per request for quota, 5xx and timeout responses
    pub max_retries: u32,
    /// Linear backoff unit between retries
    pub retry_backoff_ms: u64,
    /// Extra passes over cues left untranslated
    pub retry_passes: u32,
    /// Upper bound on attempts per cue across all passes
    pub max_failures_per_line: u32,
    pub throttle: Throttle,
    pub user_agent: String,
    /// Optional "#RRGGBB" color applied to translated text
    pub color: Option<String>,
    pub style: SubtitleStyle,
    pub cache_enabled: bool,
    pub cache_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Throttle {
    /// No delay between requests
    None,
    /// Fixed 50 ms delay
    Mild,
    /// Fixed 150 ms delay
    Moderate,
    /// Delay grows with the observed error ratio
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleStyle {
    Srt,
    Ass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub on_existing: ExistingPolicy,
}

/// What a step does when its output artifact already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    Skip,
    Overwrite,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            filebot_path: "filebot".to_string(),
            mkvmerge_path: "mkvmerge".to_string(),
            mkvextract_path: "mkvextract".to_string(),
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "auto".to_string(),
            target: "ru".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mkv".to_string()],
        }
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: "{n} ({y})/{n} ({y}){' - '+s00e00}".to_string(),
            conflict: "skip".to_string(),
            non_strict: true,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            text_only: true,
        }
    }
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            strip_curly: true,
            strip_square: true,
            strip_parentheses: true,
            strip_speaker_labels: true,
            strip_music_cues: true,
            remove_uppercase_sdh: true,
            remove_watermarks: true,
            remove_formatting: true,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://translate.googleapis.com/translate_a/single".to_string(),
                "https://clients5.google.com/translate_a/t".to_string(),
                "https://translate.google.com/translate_a/single".to_string(),
            ],
            timeout_secs: 15,
            max_retries: 3,
            retry_backoff_ms: 500,
            retry_passes: 3,
            max_failures_per_line: 3,
            throttle: Throttle::Adaptive,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.131 Safari/537.36".to_string(),
            color: None,
            style: SubtitleStyle::Srt,
            cache_enabled: true,
            cache_dir: ".subweave/cache/translations".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_existing: ExistingPolicy::Skip,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubweaveError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubweaveError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubweaveError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubweaveError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that would only fail halfway through a run
    pub fn validate(&self) -> Result<()> {
        if !language::is_auto(&self.languages.source) {
            language::resolve(&self.languages.source)?;
        }
        if language::is_auto(&self.languages.target) {
            return Err(SubweaveError::Config(
                "Target language cannot be 'auto'".to_string(),
            ));
        }
        language::resolve(&self.languages.target)?;

        if self.media.extensions.is_empty() {
            return Err(SubweaveError::Config(
                "media.extensions must list at least one container extension".to_string(),
            ));
        }
        if self.translate.endpoints.is_empty() {
            return Err(SubweaveError::Config(
                "translate.endpoints must not be empty".to_string(),
            ));
        }
        if self.translate.max_failures_per_line == 0 {
            return Err(SubweaveError::Config(
                "translate.max_failures_per_line must be at least 1".to_string(),
            ));
        }
        if let Some(color) = &self.translate.color {
            let valid = color.len() == 7
                && color.starts_with('#')
                && color[1..].chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return Err(SubweaveError::Config(format!(
                    "translate.color must look like #RRGGBB, got '{}'",
                    color
                )));
            }
        }
        Ok(())
    }
}
