use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::clean::Cleaner;
use crate::config::{Config, ExistingPolicy};
use crate::error::{Result, SubweaveError};
use crate::language::{self, Language};
use crate::media::mkvtoolnix::has_subtitle_track;
use crate::media::{FileBot, MkvToolNix, MuxSubtitle, SystemRunner, ToolRunner};
use crate::report::{RunReport, Step, StepReport};
use crate::subtitle::naming::{self, ArtifactKind, SubtitleArtifact};
use crate::translate::{self, SubtitleTranslator, TranslationService};

/// Runs pipeline steps over a folder. Every step reads what the previous
/// one left on disk, so steps can be run one at a time or all together.
pub struct Workflow {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    translator: Arc<dyn TranslationService>,
    show_progress: bool,
}

impl Workflow {
    /// Workflow backed by real processes and the configured translation service
    pub fn new(config: Config) -> Result<Self> {
        let translator = translate::build_service(&config.translate)?;
        Self::with_parts(config, Arc::new(SystemRunner::new()), translator)
    }

    pub fn with_parts(
        config: Config,
        runner: Arc<dyn ToolRunner>,
        translator: Arc<dyn TranslationService>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runner,
            translator,
            show_progress: false,
        })
    }

    /// Draw a progress bar per step
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Check that every tool the given steps launch can be found
    pub fn preflight(&self, steps: &[Step]) -> Result<()> {
        for step in steps {
            for tool in step.required_tools(&self.config) {
                let path = self
                    .runner
                    .locate(tool, tool.configured_path(&self.config.tools))?;
                debug!("{} step: {} at {}", step, tool.name(), path.display());
            }
        }
        Ok(())
    }

    /// Run a single step. Errors only for problems that stop the whole step.
    pub async fn run_step<P: AsRef<Path>>(&self, step: Step, folder: P) -> Result<StepReport> {
        let folder = folder.as_ref();
        ensure_folder(folder)?;
        self.preflight(&[step])?;
        self.execute(step, folder).await
    }

    /// Rename, extract, clean, translate and embed in order. Tools are
    /// checked before anything on disk changes.
    pub async fn run_all<P: AsRef<Path>>(&self, folder: P) -> Result<RunReport> {
        let folder = folder.as_ref();
        // Check every tool up front so a missing one changes nothing
        ensure_folder(folder)?;
        self.preflight(&Step::ALL)?;

        let mut run = RunReport::new(folder);
        info!("Run {} started on {}", run.id, folder.display());
        for step in Step::ALL {
            let report = self.execute(step, folder).await?;
            run.push(report);
        }
        let run = run.finish();
        info!(
            "Run {} finished with {} failure(s)",
            run.id,
            run.failure_count()
        );
        Ok(run)
    }

    async fn execute(&self, step: Step, folder: &Path) -> Result<StepReport> {
        info!("Step {} on {}", step, folder.display());
        let report = match step {
            Step::Rename => self.rename(folder).await?,
            Step::Extract => self.extract(folder).await?,
            Step::Clean => self.clean(folder).await?,
            Step::Translate => self.translate(folder).await?,
            Step::Embed => self.embed(folder).await?,
        };
        let report = report.finish();
        info!(
            "Step {} done: {} succeeded, {} skipped, {} failed",
            step,
            report.succeeded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn overwrite(&self) -> bool {
        self.config.pipeline.on_existing == ExistingPolicy::Overwrite
    }

    fn progress(&self, step: Step, len: usize) -> ProgressBar {
        if !self.show_progress || len == 0 {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:>9} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_prefix(step.name());
        pb
    }

    async fn rename(&self, folder: &Path) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Rename);
        if !self.config.rename.enabled {
            report.warn("renaming is disabled in the configuration");
            return Ok(report);
        }

        let filebot = FileBot::new(
            self.runner.clone(),
            self.config.tools.clone(),
            self.config.rename.clone(),
        );
        let media = find_media(folder, &self.config.media.extensions);
        let pb = self.progress(Step::Rename, media.len());

        for file in media {
            pb.set_message(file_label(&file));
            match filebot.rename(&file).await {
                Ok(new_path) => report.succeed(new_path),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Rename failed for {}: {}", file.display(), e);
                    report.fail(&file, e.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn extract(&self, folder: &Path) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Extract);
        let mkv = MkvToolNix::new(self.runner.clone(), self.config.tools.clone());
        let media = find_media(folder, &self.config.media.extensions);
        let pb = self.progress(Step::Extract, media.len());

        for file in media {
            pb.set_message(file_label(&file));
            self.extract_file(&mkv, &file, &mut report).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn extract_file(&self, mkv: &MkvToolNix, file: &Path, report: &mut StepReport) -> Result<()> {
        // List subtitle tracks
        let tracks = match mkv.identify(file).await {
            Ok(tracks) => tracks,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Could not list tracks of {}: {}", file.display(), e);
                report.fail(file, e.to_string());
                return Ok(());
            }
        };
        if tracks.is_empty() {
            report.skip(file, "no subtitle tracks");
            return Ok(());
        }

        // Keep tracks matching the language list and, by default, text codecs only
        let wanted = &self.config.extract.languages;
        let (selected, excluded): (Vec<_>, Vec<_>) = tracks.into_iter().partition(|t| {
            t.matches_language(wanted) && (!self.config.extract.text_only || t.is_text())
        });
        for track in &excluded {
            info!(
                "Skipping track {} of {} ({}, {})",
                track.id,
                file.display(),
                track.codec,
                track.language_tag()
            );
            report.skip(
                file,
                format!("track {} ({}, {}) not selected", track.id, track.codec, track.language_tag()),
            );
        }

        // Repeated languages get the track id in their tag
        let mut per_language: HashMap<String, usize> = HashMap::new();
        for track in &selected {
            *per_language.entry(track.language_tag().to_lowercase()).or_default() += 1;
        }

        for track in &selected {
            let duplicated = per_language
                .get(&track.language_tag().to_lowercase())
                .is_some_and(|n| *n > 1);
            let tag = naming::track_tag(track.language_tag(), track.id, duplicated);
            let target = naming::extracted_path(file, &tag);

            if target.exists() && !self.overwrite() {
                report.skip(&target, "already extracted");
                continue;
            }
            match mkv.extract_track(file, track.id, &target).await {
                Ok(()) => report.succeed(&target),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Extracting track {} of {} failed: {}", track.id, file.display(), e);
                    report.fail(file, format!("track {}: {}", track.id, e));
                }
            }
        }
        Ok(())
    }

    async fn clean(&self, folder: &Path) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Clean);
        let cleaner = Cleaner::new(self.config.clean.clone());
        let artifacts = find_artifacts(folder, ArtifactKind::Extracted);
        let pb = self.progress(Step::Clean, artifacts.len());

        for artifact in artifacts {
            pb.set_message(file_label(&artifact.path));
            let output = artifact.cleaned_path();
            if output.exists() && !self.overwrite() {
                report.skip(&artifact.path, "already cleaned");
                pb.inc(1);
                continue;
            }

            match cleaner.clean_file(&artifact.path, &output).await {
                Ok(summary) => {
                    if summary.cues_after == 0 {
                        report.warn(format!("{} has no cues left after cleaning", output.display()));
                    }
                    report.succeed(output);
                }
                Err(e) => {
                    warn!("Cleaning {} failed: {}", artifact.path.display(), e);
                    report.fail(&artifact.path, e.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn translate(&self, folder: &Path) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Translate);
        let source = language::source_code(&self.config.languages.source)?;
        let target = language::resolve(&self.config.languages.target)?;
        let translator = SubtitleTranslator::new(self.translator.clone(), self.config.translate.clone());

        let artifacts = find_artifacts(folder, ArtifactKind::Cleaned);
        let pb = self.progress(Step::Translate, artifacts.len());

        for artifact in artifacts {
            pb.set_message(file_label(&artifact.path));
            // Tracks already in the target language, e.g. one embedded by an earlier run
            let in_target = artifact
                .language_tag()
                .is_some_and(|tag| language::same_language(tag, target.code));
            if in_target {
                report.skip(&artifact.path, format!("already in {}", target.name));
                pb.inc(1);
                continue;
            }

            let output = artifact.translated_path(target.code);
            if output.exists() && !self.overwrite() {
                report.skip(&artifact.path, format!("already translated to {}", target.name));
                pb.inc(1);
                continue;
            }

            match translator
                .translate_file(&artifact.path, &output, &source, target.code)
                .await
            {
                Ok(outcome) if outcome.attempted == 0 => {
                    report.skip(&artifact.path, "no text left after cleaning");
                }
                Ok(outcome) => {
                    if outcome.untranslated > 0 {
                        report.warn(format!(
                            "{}: {} of {} cue(s) left untranslated",
                            output.display(),
                            outcome.untranslated,
                            outcome.attempted
                        ));
                    }
                    report.succeed(output);
                }
                Err(e) => {
                    warn!("Translating {} failed: {}", artifact.path.display(), e);
                    report.fail(&artifact.path, e.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn embed(&self, folder: &Path) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Embed);
        let target = language::resolve(&self.config.languages.target)?;
        let mkv = MkvToolNix::new(self.runner.clone(), self.config.tools.clone());
        let extensions = &self.config.media.extensions;

        // Group translations by the media file they belong to
        let mut groups: BTreeMap<PathBuf, Vec<SubtitleArtifact>> = BTreeMap::new();
        for artifact in find_artifacts(folder, ArtifactKind::Translated) {
            let matches_target = artifact
                .target_language()
                .is_some_and(|t| language::same_language(t, target.code));
            if !matches_target {
                debug!("Ignoring {} (other target language)", artifact.path.display());
                continue;
            }
            // mkvmerge rejects an empty SRT and would fail the whole container
            let is_empty = tokio::fs::metadata(&artifact.path)
                .await
                .map(|m| m.len() == 0)
                .unwrap_or(true);
            if is_empty {
                report.skip(&artifact.path, "empty subtitle file");
                continue;
            }
            match artifact.find_media(extensions) {
                Some(media) => groups.entry(media).or_default().push(artifact),
                None => report.skip(&artifact.path, "no matching media file"),
            }
        }

        let pb = self.progress(Step::Embed, groups.len());
        for (media, artifacts) in groups {
            pb.set_message(file_label(&media));
            self.embed_file(&mkv, &media, &artifacts, target, &mut report).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(report)
    }

    async fn embed_file(
        &self,
        mkv: &MkvToolNix,
        media: &Path,
        artifacts: &[SubtitleArtifact],
        target: &Language,
        report: &mut StepReport,
    ) -> Result<()> {
        // Skip containers that already carry the track
        if !self.overwrite() {
            match mkv.identify(media).await {
                Ok(tracks) if has_subtitle_track(&tracks, target.iso639_2, target.name) => {
                    report.skip(media, format!("already has a {} subtitle track", target.name));
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.fail(media, e.to_string());
                    return Ok(());
                }
            }
        }

        let subtitles: Vec<MuxSubtitle> = artifacts
            .iter()
            .map(|a| MuxSubtitle {
                path: a.path.clone(),
                language: target.iso639_2.to_string(),
                track_name: target.name.to_string(),
            })
            .collect();
        // Mux into a temp file next to the media, then replace
        let destination = mux_destination(media);

        match mkv.mux(media, &subtitles, &destination).await {
            Ok(path) => report.succeed(path),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Embedding into {} failed: {}", media.display(), e);
                report.fail(media, e.to_string());
            }
        }
        Ok(())
    }

    /// Delete cleaned intermediates under `folder`
    pub async fn purge<P: AsRef<Path>>(&self, folder: P) -> Result<Vec<PathBuf>> {
        let folder = folder.as_ref();
        ensure_folder(folder)?;
        let mut removed = Vec::new();
        for artifact in find_artifacts(folder, ArtifactKind::Cleaned) {
            tokio::fs::remove_file(&artifact.path).await?;
            info!("Removed {}", artifact.path.display());
            removed.push(artifact.path);
        }
        Ok(removed)
    }
}

/// Matroska sources are replaced in place; other containers gain a `.mkv` sibling
pub fn mux_destination(media: &Path) -> PathBuf {
    let is_matroska = media
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mkv"));
    if is_matroska {
        media.to_path_buf()
    } else {
        media.with_extension("mkv")
    }
}

fn ensure_folder(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        Ok(())
    } else {
        Err(SubweaveError::FileNotFound(folder.display().to_string()))
    }
}

/// Files under `folder`, skipping hidden entries such as mux temp files
fn walk(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_str().is_some_and(|n| n.starts_with('.'))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

pub fn find_media(folder: &Path, extensions: &[String]) -> Vec<PathBuf> {
    walk(folder)
        .into_iter()
        .filter(|p| naming::is_media(p, extensions))
        .collect()
}

pub fn find_artifacts(folder: &Path, kind: ArtifactKind) -> Vec<SubtitleArtifact> {
    walk(folder)
        .into_iter()
        .filter_map(SubtitleArtifact::from_path)
        .filter(|a| a.kind == kind)
        .collect()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
