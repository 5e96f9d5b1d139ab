use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Tool, ToolCommand, ToolRunner};
use crate::config::ToolsConfig;
use crate::error::{Result, SubweaveError};

#[derive(Debug, Deserialize)]
struct Identification {
    #[serde(default)]
    tracks: Vec<IdentifiedTrack>,
}

#[derive(Debug, Deserialize)]
struct IdentifiedTrack {
    id: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: TrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct TrackProperties {
    codec_id: Option<String>,
    language: Option<String>,
    language_ietf: Option<String>,
    track_name: Option<String>,
}

/// A subtitle track as reported by `mkvmerge -J`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub id: u64,
    pub codec: String,
    pub codec_id: String,
    pub language: Option<String>,
    pub language_ietf: Option<String>,
    pub track_name: Option<String>,
}

impl SubtitleTrack {
    /// SubRip text that can be extracted straight to `.srt`
    pub fn is_text(&self) -> bool {
        self.codec.eq_ignore_ascii_case("SubRip/SRT") || self.codec_id.eq_ignore_ascii_case("S_TEXT/UTF8")
    }

    /// Language used in artifact names: legacy code, then IETF tag, then "und"
    pub fn language_tag(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.language_ietf.as_deref().filter(|l| !l.is_empty()))
            .unwrap_or("und")
    }

    /// Whether the track is wanted; an empty list selects everything
    pub fn matches_language(&self, wanted: &[String]) -> bool {
        if wanted.is_empty() {
            return true;
        }
        wanted.iter().any(|w| {
            [self.language.as_deref(), self.language_ietf.as_deref()]
                .into_iter()
                .flatten()
                .any(|l| l.eq_ignore_ascii_case(w.trim()))
        })
    }
}

/// One subtitle file to add during a mux
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxSubtitle {
    pub path: PathBuf,
    /// ISO 639-2 code written into the track header
    pub language: String,
    pub track_name: String,
}

/// Parse the JSON identification document, keeping subtitle tracks only
pub fn parse_identification(json: &str) -> Result<Vec<SubtitleTrack>> {
    let identification: Identification = serde_json::from_str(json)?;
    Ok(identification
        .tracks
        .into_iter()
        .filter(|t| t.kind == "subtitles")
        .map(|t| SubtitleTrack {
            id: t.id,
            codec: t.codec,
            codec_id: t.properties.codec_id.unwrap_or_default(),
            language: t.properties.language,
            language_ietf: t.properties.language_ietf,
            track_name: t.properties.track_name,
        })
        .collect())
}

/// MKVToolNix front end: `mkvmerge` for identification and muxing,
/// `mkvextract` for pulling tracks out
pub struct MkvToolNix {
    runner: Arc<dyn ToolRunner>,
    tools: ToolsConfig,
}

impl MkvToolNix {
    pub fn new(runner: Arc<dyn ToolRunner>, tools: ToolsConfig) -> Self {
        Self { runner, tools }
    }

    fn program(&self, tool: Tool) -> Result<PathBuf> {
        self.runner.locate(tool, tool.configured_path(&self.tools))
    }

    /// List the subtitle tracks of a container
    pub async fn identify(&self, media: &Path) -> Result<Vec<SubtitleTrack>> {
        let command = ToolCommand::new(Tool::MkvMerge, self.program(Tool::MkvMerge)?, "Identify tracks")
            .arg("-J")
            .path_arg(media);

        let output = self.runner.run(&command).await?;
        if !output.success_with_warnings() {
            return Err(output.into_error(Tool::MkvMerge));
        }

        let tracks = parse_identification(&output.stdout).map_err(|e| {
            SubweaveError::ToolFailed {
                tool: Tool::MkvMerge.name().to_string(),
                code: "0".to_string(),
                stderr: format!("unreadable identification output: {}", e),
            }
        })?;
        debug!("{} has {} subtitle track(s)", media.display(), tracks.len());
        Ok(tracks)
    }

    /// Extract one track to `target`. Succeeds only if the file appeared.
    pub async fn extract_track(&self, media: &Path, track_id: u64, target: &Path) -> Result<()> {
        let command = ToolCommand::new(
            Tool::MkvExtract,
            self.program(Tool::MkvExtract)?,
            format!("Extract track {}", track_id),
        )
        .path_arg(media)
        .arg("tracks")
        .arg(format!("{}:{}", track_id, target.display()));

        let output = self.runner.run(&command).await?;
        if !output.success_with_warnings() {
            return Err(output.into_error(Tool::MkvExtract));
        }
        if !target.exists() {
            return Err(SubweaveError::ToolFailed {
                tool: Tool::MkvExtract.name().to_string(),
                code: output.code.map(|c| c.to_string()).unwrap_or_default(),
                stderr: format!("{} was not created", target.display()),
            });
        }

        info!("Extracted track {} -> {}", track_id, target.display());
        Ok(())
    }

    /// Build the mux command that copies `media` and appends `subtitles`
    pub fn mux_command(
        &self,
        media: &Path,
        subtitles: &[MuxSubtitle],
        output: &Path,
    ) -> Result<ToolCommand> {
        let mut command = ToolCommand::new(Tool::MkvMerge, self.program(Tool::MkvMerge)?, "Mux subtitles")
            .arg("-o")
            .path_arg(output)
            .path_arg(media);

        for subtitle in subtitles {
            command = command
                .arg("--language")
                .arg(format!("0:{}", subtitle.language))
                .arg("--track-name")
                .arg(format!("0:{}", subtitle.track_name))
                .path_arg(&subtitle.path);
        }

        if let Some(dir) = media.parent().filter(|d| !d.as_os_str().is_empty()) {
            command = command.current_dir(dir);
        }
        Ok(command)
    }

    /// Mux into a temporary file next to `media`, then move it to `destination`.
    /// On failure the temporary file is removed and nothing else changes.
    pub async fn mux(
        &self,
        media: &Path,
        subtitles: &[MuxSubtitle],
        destination: &Path,
    ) -> Result<PathBuf> {
        let dir = media
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".subweave-mux-")
            .suffix(".mkv")
            .tempfile_in(dir)?;

        let command = self.mux_command(media, subtitles, temp.path())?;
        let output = self.runner.run(&command).await?;
        if !output.success_with_warnings() {
            return Err(output.into_error(Tool::MkvMerge));
        }

        temp.persist(destination).map_err(|e| SubweaveError::Io(e.error))?;
        info!(
            "Muxed {} subtitle track(s) into {}",
            subtitles.len(),
            destination.display()
        );
        Ok(destination.to_path_buf())
    }
}

/// Whether a container already carries a subtitle track with this language and name
pub fn has_subtitle_track(tracks: &[SubtitleTrack], language: &str, track_name: &str) -> bool {
    tracks.iter().any(|t| {
        t.language.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(language))
            && t.track_name.as_deref() == Some(track_name)
    })
}
