// External media tooling
//
// - commands: tool identities and the command/output types
// - filebot: library-aware renaming
// - mkvtoolnix: track listing, extraction and muxing

pub mod commands;
pub mod filebot;
pub mod mkvtoolnix;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

pub use commands::*;
pub use filebot::FileBot;
pub use mkvtoolnix::{MkvToolNix, MuxSubtitle, SubtitleTrack};

use crate::error::{Result, SubweaveError};

/// Seam between the pipeline and the processes it launches
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Resolve the configured location of a tool to an executable path
    fn locate(&self, tool: Tool, configured: &str) -> Result<PathBuf>;

    /// Run a command to completion and capture its output
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;
}

/// Runs tools as real child processes
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    fn locate(&self, tool: Tool, configured: &str) -> Result<PathBuf> {
        let not_found = || SubweaveError::ToolNotFound {
            tool: tool.name().to_string(),
            path: configured.to_string(),
        };

        let candidate = Path::new(configured);
        if configured.trim().is_empty() {
            return Err(not_found());
        }
        // Bare names are looked up on PATH, anything else must exist as given
        if candidate.components().count() > 1 || candidate.is_absolute() {
            if candidate.is_file() {
                Ok(candidate.to_path_buf())
            } else {
                Err(not_found())
            }
        } else {
            which::which(configured).map_err(|_| not_found())
        }
    }

    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        debug!("Executing {}: {}", command.description, command.display());

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SubweaveError::ToolNotFound {
                    tool: command.tool.name().to_string(),
                    path: command.program.display().to_string(),
                }
            } else {
                SubweaveError::Io(e)
            }
        })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
