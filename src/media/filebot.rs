use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Tool, ToolCommand, ToolRunner};
use crate::config::{RenameConfig, ToolsConfig};
use crate::error::{Result, SubweaveError};

static MOVE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:MOVE|RENAME)\].*? to \[(.*?)\]").expect("filebot pattern is valid")
});

/// Renames media files to the library naming scheme through FileBot
pub struct FileBot {
    runner: Arc<dyn ToolRunner>,
    tools: ToolsConfig,
    config: RenameConfig,
}

impl FileBot {
    pub fn new(runner: Arc<dyn ToolRunner>, tools: ToolsConfig, config: RenameConfig) -> Self {
        Self {
            runner,
            tools,
            config,
        }
    }

    pub fn command(&self, file: &Path) -> Result<ToolCommand> {
        let program = self
            .runner
            .locate(Tool::FileBot, Tool::FileBot.configured_path(&self.tools))?;
        let dir = file
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut command = ToolCommand::new(Tool::FileBot, program, "Rename")
            .arg("-rename")
            .path_arg(file)
            .arg("--output")
            .path_arg(dir)
            .arg("--format")
            .arg(self.config.format.clone());
        if self.config.non_strict {
            command = command.arg("-non-strict");
        }
        Ok(command
            .arg("--conflict")
            .arg(self.config.conflict.clone())
            .current_dir(dir))
    }

    /// Rename one file and return where it ended up
    pub async fn rename(&self, file: &Path) -> Result<PathBuf> {
        let command = self.command(file)?;
        let output = self.runner.run(&command).await?;

        // FileBot exits non-zero on partial matches while still processing the file
        if !output.success() && !output.stdout.contains("Processed") {
            return Err(output.into_error(Tool::FileBot));
        }

        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        if let Some(destination) = parse_destination(&output.stdout, dir) {
            if destination.exists() {
                info!("Renamed {} -> {}", file.display(), destination.display());
                return Ok(destination);
            }
            warn!(
                "FileBot reported {} but it does not exist",
                destination.display()
            );
        }

        if file.exists() {
            debug!("FileBot left {} in place", file.display());
            return Ok(file.to_path_buf());
        }

        Err(SubweaveError::ToolFailed {
            tool: Tool::FileBot.name().to_string(),
            code: output.code.map(|c| c.to_string()).unwrap_or_default(),
            stderr: format!(
                "could not determine where {} was moved:\n{}",
                file.display(),
                output.stdout.trim()
            ),
        })
    }
}

/// Destination from the first `[MOVE]`/`[RENAME] ... to [path]` line.
/// Relative destinations are resolved against `dir`.
pub fn parse_destination(stdout: &str, dir: &Path) -> Option<PathBuf> {
    let captured = MOVE_LINE.captures(stdout)?.get(1)?.as_str();
    let path = PathBuf::from(captured);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(dir.join(path))
    }
}
