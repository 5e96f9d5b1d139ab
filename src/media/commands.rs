use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::error::SubweaveError;

/// External executables the pipeline drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    FileBot,
    MkvMerge,
    MkvExtract,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileBot => "filebot",
            Self::MkvMerge => "mkvmerge",
            Self::MkvExtract => "mkvextract",
        }
    }

    /// The path the user configured for this tool
    pub fn configured_path<'a>(&self, tools: &'a ToolsConfig) -> &'a str {
        match self {
            Self::FileBot => &tools.filebot_path,
            Self::MkvMerge => &tools.mkvmerge_path,
            Self::MkvExtract => &tools.mkvextract_path,
        }
    }
}

/// A fully resolved invocation of an external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub description: String,
}

impl ToolCommand {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(tool: Tool, program: P, description: S) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Run from the given directory instead of the current one
    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Human-readable command line for logs
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("\"{}\"", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// MKVToolNix exits with 1 when it finished but printed warnings
    pub fn success_with_warnings(&self) -> bool {
        matches!(self.code, Some(0) | Some(1))
    }

    pub fn into_error(self, tool: Tool) -> SubweaveError {
        let mut stderr = self.stderr.trim().to_string();
        if stderr.is_empty() {
            // mkvmerge reports its errors on stdout
            stderr = self.stdout.trim().to_string();
        }
        SubweaveError::ToolFailed {
            tool: tool.name().to_string(),
            code: self
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let cmd = ToolCommand::new(Tool::MkvExtract, "/usr/bin/mkvextract", "Extract track")
            .path_arg("/media/My Movie.mkv")
            .arg("tracks")
            .args(["2:/media/My Movie.eng.srt"]);
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(
            cmd.display(),
            "/usr/bin/mkvextract \"/media/My Movie.mkv\" tracks \"2:/media/My Movie.eng.srt\""
        );
    }

    #[test]
    fn test_configured_paths() {
        let tools = ToolsConfig::default();
        assert_eq!(Tool::MkvMerge.configured_path(&tools), "mkvmerge");
        assert_eq!(Tool::FileBot.name(), "filebot");
    }

    #[test]
    fn test_failure_falls_back_to_stdout() {
        let output = ToolOutput {
            code: Some(2),
            stdout: "Error: The file could not be opened".to_string(),
            stderr: String::new(),
        };
        assert!(!output.success_with_warnings());
        match output.into_error(Tool::MkvMerge) {
            SubweaveError::ToolFailed { tool, code, stderr } => {
                assert_eq!(tool, "mkvmerge");
                assert_eq!(code, "2");
                assert!(stderr.contains("could not be opened"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
