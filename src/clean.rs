use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::config::CleanConfig;
use crate::error::{Result, SubweaveError};
use crate::subtitle::{self, SubtitleDocument, TextEncoding};

static FORMATTING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?\s*(i|b|u|s|font)(\s[^>]*)?>").expect("formatting pattern is valid")
});
static CURLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("curly pattern is valid"));
static SQUARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("square pattern is valid"));
static PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("parentheses pattern is valid"));
static SPEAKER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<dash>-\s*)?(?:[A-Z][A-Z0-9 .'\-]{0,30}:(?:\s+|$))+")
        .expect("speaker pattern is valid")
});
static WATERMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(https?://|www\.|\.(com|org|net|tv)\b|subtitles?\s+by|synced?\s+(and\s+corrected\s+)?by|sync\s*&\s*corrections|opensubtitles|subscene|addic7ed|podnapisi|yify)",
    )
    .expect("watermark pattern is valid")
});

/// Outcome of cleaning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub cues_before: usize,
    pub cues_after: usize,
    pub encoding: TextEncoding,
}

/// Local subtitle cleaner. Removes hearing-impaired annotations, markup and
/// release watermarks, then normalizes layout. Running it on its own output
/// changes nothing.
pub struct Cleaner {
    config: CleanConfig,
}

impl Cleaner {
    pub fn new(config: CleanConfig) -> Self {
        Self { config }
    }

    /// Clean the text of a single cue. `None` means nothing is left of it.
    pub fn clean_text(&self, text: &str) -> Option<String> {
        let mut text = text.replace('\0', "").replace('\u{feff}', "");

        // Stripping one kind of markup can expose another, as in "<{\an8}i>"
        loop {
            let next = self.strip_markup(&text);
            if next == text {
                break;
            }
            text = next;
        }

        let lines: Vec<String> = text
            .lines()
            .filter_map(|line| self.clean_line(line))
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn strip_markup(&self, text: &str) -> String {
        let mut text = text.to_string();
        if self.config.remove_formatting {
            text = FORMATTING_TAG.replace_all(&text, "").into_owned();
        }
        if self.config.strip_curly {
            text = CURLY.replace_all(&text, "").into_owned();
        }
        if self.config.strip_square {
            text = SQUARE.replace_all(&text, "").into_owned();
        }
        if self.config.strip_parentheses {
            text = PARENS.replace_all(&text, "").into_owned();
        }
        text
    }

    fn clean_line(&self, line: &str) -> Option<String> {
        let mut line = line.trim().to_string();

        if self.config.strip_music_cues && (line.contains('♪') || line.contains('♫')) {
            return None;
        }
        if self.config.remove_watermarks && WATERMARK.is_match(&line) {
            return None;
        }
        if self.config.strip_speaker_labels {
            line = SPEAKER_LABEL.replace(&line, "$dash").into_owned();
        }

        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");

        if self.config.remove_uppercase_sdh && is_uppercase_sdh(&line) {
            return None;
        }
        if line.chars().all(|c| c == '-' || c.is_whitespace()) {
            return None;
        }
        Some(line)
    }

    /// Clean every cue, drop the empty ones and renumber from 1
    pub fn clean_document(&self, document: &SubtitleDocument) -> SubtitleDocument {
        let mut cues = Vec::with_capacity(document.len());
        for cue in &document.cues {
            match self.clean_text(&cue.text) {
                Some(text) => {
                    let mut cleaned = cue.clone();
                    cleaned.text = text;
                    cues.push(cleaned);
                }
                None => debug!("Dropping cue {} after cleaning", cue.index),
            }
        }

        let mut cleaned = SubtitleDocument::new(cues);
        cleaned.renumber();
        cleaned
    }

    /// Clean `input` into `output`. Both may be the same path.
    pub async fn clean_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<CleanSummary> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.exists() {
            return Err(SubweaveError::FileNotFound(input.display().to_string()));
        }
        if tokio::fs::metadata(input).await?.len() == 0 {
            return Err(SubweaveError::Subtitle(format!(
                "{}: subtitle file is empty",
                input.display()
            )));
        }

        let (document, encoding) = subtitle::read_srt(input).await?;
        let cleaned = self.clean_document(&document);
        subtitle::write_srt(&cleaned, output).await?;

        info!(
            "Cleaned {} ({}): {} -> {} cues",
            input.display(),
            encoding.label(),
            document.len(),
            cleaned.len()
        );

        Ok(CleanSummary {
            cues_before: document.len(),
            cues_after: cleaned.len(),
            encoding,
        })
    }
}

/// Captions like "DOOR SLAMS" or "LAUGHING": every cased letter is uppercase
/// and there are at least four letters
fn is_uppercase_sdh(line: &str) -> bool {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::SubtitleCue;

    fn cleaner() -> Cleaner {
        Cleaner::new(CleanConfig::default())
    }

    #[test]
    fn test_strips_annotations_and_markup() {
        let c = cleaner();
        assert_eq!(c.clean_text("<i>Hello</i> [door creaks] there").as_deref(), Some("Hello there"));
        assert_eq!(c.clean_text("{\\an8}Top line").as_deref(), Some("Top line"));
        assert_eq!(c.clean_text("(sighs) Fine.").as_deref(), Some("Fine."));
        assert_eq!(c.clean_text("<font color=\"#ffffff\">Hi</font>").as_deref(), Some("Hi"));
    }

    #[test]
    fn test_speaker_labels_keep_dialogue_dash() {
        let c = cleaner();
        assert_eq!(c.clean_text("JOHN: Where are you?").as_deref(), Some("Where are you?"));
        assert_eq!(
            c.clean_text("- MARY: Here.\n- DR. SMITH: Over here.").as_deref(),
            Some("- Here.\n- Over here.")
        );
        // Clock times are not labels
        assert_eq!(c.clean_text("Meet me at 10:30").as_deref(), Some("Meet me at 10:30"));
    }

    #[test]
    fn test_drops_music_sdh_and_watermarks() {
        let c = cleaner();
        assert_eq!(c.clean_text("♪ La la la ♪"), None);
        assert_eq!(c.clean_text("DOOR SLAMS"), None);
        assert_eq!(c.clean_text("OK").as_deref(), Some("OK"));
        assert_eq!(c.clean_text("Subtitles by SomeGroup"), None);
        assert_eq!(c.clean_text("Visit www.example.org\nReal line").as_deref(), Some("Real line"));
        assert_eq!(c.clean_text("[MUSIC PLAYING]\n-"), None);
    }

    #[test]
    fn test_options_can_be_disabled() {
        let config = CleanConfig {
            strip_square: false,
            remove_uppercase_sdh: false,
            ..CleanConfig::default()
        };
        let c = Cleaner::new(config);
        assert_eq!(c.clean_text("[LAUGHS]").as_deref(), Some("[LAUGHS]"));
    }

    #[test]
    fn test_document_renumbers_and_drops_empty_cues() {
        let doc = SubtitleDocument::new(vec![
            SubtitleCue::new(1, 0, 1_000, "[THUNDER]"),
            SubtitleCue::new(2, 1_000, 2_000, "  Hello   world  "),
            SubtitleCue::new(3, 2_000, 3_000, "♪ music ♪"),
            SubtitleCue::new(4, 3_000, 4_000, "Bye"),
        ]);
        let cleaned = cleaner().clean_document(&doc);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.cues[0].index, 1);
        assert_eq!(cleaned.cues[0].text, "Hello world");
        assert_eq!(cleaned.cues[0].start_ms, 1_000);
        assert_eq!(cleaned.cues[1].index, 2);
    }

    #[test]
    fn test_cleaning_twice_is_identical() {
        let doc = SubtitleDocument::new(vec![
            SubtitleCue::new(1, 0, 1_000, "JOHN: MARY: <<i>i>hi</i>"),
            SubtitleCue::new(2, 1_000, 2_000, "((nested) text) stays?"),
            SubtitleCue::new(3, 2_000, 3_000, "- [a] -\n-- Fine"),
            SubtitleCue::new(4, 3_000, 4_000, "<{\\an8}i>Hello"),
            SubtitleCue::new(5, 4_000, 5_000, "[<i>]Bye<(x)/i>"),
        ]);
        let c = cleaner();
        let once = c.clean_document(&doc);
        let twice = c.clean_document(&once);
        assert_eq!(once.to_srt_string(), twice.to_srt_string());
        assert_eq!(once.cues[3].text, "Hello");
        assert_eq!(once.cues[4].text, "Bye");
    }

    #[tokio::test]
    async fn test_clean_file_converts_encoding_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.eng.srt");
        let output = dir.path().join("movie.eng.cleaned.srt");
        // Windows-1252 with CRLF line endings
        std::fs::write(
            &input,
            b"1\r\n00:00:01,000 --> 00:00:02,000\r\n<i>Caf\xE9</i> [NOISE]\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\n(LAUGHS)\r\n\r\n",
        )
        .unwrap();

        let summary = cleaner().clean_file(&input, &output).await.unwrap();
        assert_eq!(summary.encoding, TextEncoding::Windows1252);
        assert_eq!(summary.cues_before, 2);
        assert_eq!(summary.cues_after, 1);

        let first = std::fs::read(&output).unwrap();
        assert_eq!(
            String::from_utf8(first.clone()).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nCafé\n\n"
        );

        // In place on the cleaned output
        cleaner().clean_file(&output, &output).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), first);
    }

    #[tokio::test]
    async fn test_clean_file_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.srt");
        std::fs::write(&input, b"").unwrap();
        assert!(cleaner().clean_file(&input, dir.path().join("out.srt")).await.is_err());
    }
}
