use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Config;
use crate::media::Tool;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Rename,
    Extract,
    Clean,
    Translate,
    Embed,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Rename,
        Step::Extract,
        Step::Clean,
        Step::Translate,
        Step::Embed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Extract => "extract",
            Self::Clean => "clean",
            Self::Translate => "translate",
            Self::Embed => "embed",
        }
    }

    /// External tools this step launches under the given configuration
    pub fn required_tools(&self, config: &Config) -> Vec<Tool> {
        match self {
            Self::Rename if config.rename.enabled => vec![Tool::FileBot],
            Self::Rename => Vec::new(),
            Self::Extract => vec![Tool::MkvMerge, Tool::MkvExtract],
            Self::Clean | Self::Translate => Vec::new(),
            Self::Embed => vec![Tool::MkvMerge],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub detail: String,
}

/// What one step did to each file it looked at
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    pub succeeded: Vec<PathBuf>,
    pub skipped: Vec<FileOutcome>,
    pub failed: Vec<FileOutcome>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepReport {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn succeed<P: Into<PathBuf>>(&mut self, path: P) {
        self.succeeded.push(path.into());
    }

    pub fn skip<P: Into<PathBuf>, S: Into<String>>(&mut self, path: P, reason: S) {
        self.skipped.push(FileOutcome {
            path: path.into(),
            detail: reason.into(),
        });
    }

    pub fn fail<P: Into<PathBuf>, S: Into<String>>(&mut self, path: P, error: S) {
        self.failed.push(FileOutcome {
            path: path.into(),
            detail: error.into(),
        });
    }

    pub fn warn<S: Into<String>>(&mut self, warning: S) {
        self.warnings.push(warning.into());
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Human-readable summary with paths shown relative to `root`
    pub fn render(&self, root: &Path) -> String {
        let mut out = format!(
            "{}: {} succeeded, {} skipped, {} failed",
            self.step,
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        );
        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            out.push_str(&format!(" ({:.1}s)", elapsed.num_milliseconds() as f64 / 1000.0));
        }
        for failure in &self.failed {
            out.push_str(&format!("\n  FAILED  {}: {}", relative(&failure.path, root), failure.detail));
        }
        for skipped in &self.skipped {
            out.push_str(&format!("\n  skipped {}: {}", relative(&skipped.path, root), skipped.detail));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\n  warning {}", warning));
        }
        out
    }
}

/// Reports of every step executed by one invocation
#[derive(Debug, Clone)]
pub struct RunReport {
    pub id: Uuid,
    pub folder: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn new<P: Into<PathBuf>>(folder: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            folder: folder.into(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, report: StepReport) {
        self.steps.push(report);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.step == step)
    }

    pub fn failure_count(&self) -> usize {
        self.steps.iter().map(|r| r.failed.len()).sum()
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Run {} on {} (started {})",
            self.id,
            self.folder.display(),
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for step in &self.steps {
            out.push('\n');
            out.push_str(&step.render(&self.folder));
        }
        out
    }
}

fn relative(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
