use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::TranslationService;
use crate::config::{SubtitleStyle, TranslateConfig};
use crate::error::{Result, SubweaveError};
use crate::subtitle::{self, SubtitleDocument};

/// Result of translating one document
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub document: SubtitleDocument,
    /// Cues with text that needed translating
    pub attempted: usize,
    pub translated: usize,
    pub untranslated: usize,
    pub last_error: Option<String>,
}

/// Translates subtitle documents cue by cue, keeping the timing untouched
pub struct SubtitleTranslator {
    service: Arc<dyn TranslationService>,
    config: TranslateConfig,
}

impl SubtitleTranslator {
    pub fn new(service: Arc<dyn TranslationService>, config: TranslateConfig) -> Self {
        Self { service, config }
    }

    /// Translate every non-empty cue. Cues that keep failing retain their
    /// original text and are counted as untranslated.
    pub async fn translate_document(
        &self,
        document: &SubtitleDocument,
        source: &str,
        target: &str,
    ) -> TranslationOutcome {
        let mut output = document.clone();
        let pending_all: Vec<usize> = document
            .cues
            .iter()
            .enumerate()
            .filter(|(_, cue)| !cue.text.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        let attempted = pending_all.len();
        let mut attempts = vec![0u32; document.len()];
        let mut pending = pending_all;
        let mut last_error = None;
        let max_attempts = self.config.max_failures_per_line.max(1);

        for pass in 0..=self.config.retry_passes {
            if pending.is_empty() {
                break;
            }
            if pass > 0 {
                info!("Retry pass {}: {} untranslated cue(s)", pass, pending.len());
            }

            let mut still_pending = Vec::new();
            for i in pending {
                if attempts[i] >= max_attempts {
                    still_pending.push(i);
                    continue;
                }
                attempts[i] += 1;

                let original = &document.cues[i].text;
                match self.service.translate(original, source, target).await {
                    Ok(translated) => {
                        output.cues[i].text = self.style(translated.trim());
                    }
                    Err(e) => {
                        debug!("Cue {} not translated: {}", document.cues[i].index, e);
                        last_error = Some(e.to_string());
                        still_pending.push(i);
                    }
                }
            }
            pending = still_pending;
        }

        TranslationOutcome {
            document: output,
            attempted,
            translated: attempted - pending.len(),
            untranslated: pending.len(),
            last_error,
        }
    }

    /// Translate `input` into `output`. Nothing is written when the input has
    /// no text left (`attempted == 0`) or when not a single cue could be
    /// translated.
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        source: &str,
        target: &str,
    ) -> Result<TranslationOutcome> {
        let input = input.as_ref();
        let output = output.as_ref();

        let (document, _) = subtitle::read_srt(input).await?;
        info!(
            "Translating {} ({} cues) {} -> {} via {}",
            input.display(),
            document.len(),
            source,
            target,
            self.service.name()
        );

        let outcome = self.translate_document(&document, source, target).await;
        if outcome.attempted == 0 {
            debug!("{} has no text to translate", input.display());
            return Ok(outcome);
        }
        if outcome.translated == 0 && outcome.translated == 0 {
            return Err(SubweaveError::Translation(format!(
                "no cue of {} could be translated: {}",
                input.display(),
                outcome.last_error.as_deref().unwrap_or("unknown error")
            )));
        }
        if outcome.untranslated > 0 {
            warn!(
                "{}: {} of {} cue(s) left untranslated",
                input.display(),
                outcome.untranslated,
                outcome.attempted
            );
        }

        subtitle::write_srt(&outcome.document, output).await?;
        Ok(outcome)
    }

    fn style(&self, text: &str) -> String {
        match self.config.color.as_deref() {
            Some(color) if !color.eq_ignore_ascii_case("#FFFFFF") => {
                apply_color(text, color, self.config.style)
            }
            _ => text.to_string(),
        }
    }
}

/// Wrap text in a color override; `color` is `#RRGGBB`
pub fn apply_color(text: &str, color: &str, style: SubtitleStyle) -> String {
    match style {
        SubtitleStyle::Srt => format!("<font color=\"{}\">{}</font>", color, text),
        SubtitleStyle::Ass => {
            let hex = color.trim_start_matches('#');
            if hex.len() != 6 {
                return text.to_string();
            }
            // ASS colors are blue-green-red
            let bgr = format!("{}{}{}", &hex[4..6], &hex[2..4], &hex[0..2]);
            format!("{{\\c&H{}&}}{}{{\\c&HFFFFFF&}}", bgr.to_uppercase(), text)
        }
    }
}
