// Subtitle documents and the on-disk artifacts that carry them between steps
//
// - encoding: byte-level charset detection for files pulled out of containers
// - naming: the filename convention that links artifacts to their media file

pub mod encoding;
pub mod naming;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

pub use encoding::TextEncoding;
pub use naming::{ArtifactKind, SubtitleArtifact};

use crate::error::{Result, SubweaveError};

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})(.*)$",
    )
    .expect("timing pattern is valid")
});

/// A single timed cue of a SubRip file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Anything after the end timestamp on the timing line (e.g. position hints)
    pub settings: String,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(index: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            settings: String::new(),
            text: text.into(),
        }
    }

    pub fn timing_line(&self) -> String {
        format!(
            "{} --> {}{}",
            format_srt_time(self.start_ms),
            format_srt_time(self.end_ms),
            self.settings
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub cues: Vec<SubtitleCue>,
}

impl SubtitleDocument {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Parse SubRip text. Text before the first timing line is ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let mut cues: Vec<SubtitleCue> = Vec::new();
        let mut current: Option<(SubtitleCue, Vec<String>)> = None;
        let mut preamble: Option<&str> = None;

        for line in content.lines() {
            if let Some(caps) = TIMING_REGEX.captures(line) {
                let mut pending_index = preamble
                    .take()
                    .and_then(|l| l.trim_start_matches('\u{feff}').trim().parse::<usize>().ok());
                if let Some((cue, mut lines)) = current.take() {
                    // The number just above a timing line is the next cue's index
                    trim_trailing_blank(&mut lines);
                    if let Some(last) = lines.last() {
                        if let Ok(n) = last.trim().parse::<usize>() {
                            pending_index = Some(n);
                            lines.pop();
                            trim_trailing_blank(&mut lines);
                        }
                    }
                    cues.push(finish_cue(cue, lines));
                }

                let index = pending_index.unwrap_or(cues.len() + 1);
                let start_ms = timestamp_from_captures(&caps, 1);
                let end_ms = timestamp_from_captures(&caps, 5);
                let settings = caps.get(9).map(|m| m.as_str().trim_end()).unwrap_or("");

                let mut cue = SubtitleCue::new(index, start_ms, end_ms, String::new());
                cue.settings = settings.to_string();
                current = Some((cue, Vec::new()));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(line.trim_end().to_string());
            } else if !line.trim().is_empty() {
                preamble = Some(line);
            }
        }

        if let Some((cue, mut lines)) = current.take() {
            trim_trailing_blank(&mut lines);
            cues.push(finish_cue(cue, lines));
        }

        if cues.is_empty() && !content.trim().trim_start_matches('\u{feff}').is_empty() {
            return Err(SubweaveError::Subtitle(
                "no SubRip timing lines found".to_string(),
            ));
        }

        debug!("Parsed {} subtitle cues", cues.len());
        Ok(Self { cues })
    }

    /// Render as SubRip with LF line endings
    pub fn to_srt_string(&self) -> String {
        let mut srt_content = String::new();

        for cue in &self.cues {
            srt_content.push_str(&format!(
                "{}\n{}\n{}\n\n",
                cue.index,
                cue.timing_line(),
                cue.text
            ));
        }

        srt_content
    }

    /// Number cues sequentially from 1
    pub fn renumber(&mut self) {
        for (i, cue) in self.cues.iter_mut().enumerate() {
            cue.index = i + 1;
        }
    }
}

fn trim_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

fn finish_cue(mut cue: SubtitleCue, mut lines: Vec<String>) -> SubtitleCue {
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    cue.text = lines.join("\n");
    cue
}

fn timestamp_from_captures(caps: &regex::Captures, start_idx: usize) -> u64 {
    let field = |i: usize| caps.get(start_idx + i).map(|m| m.as_str()).unwrap_or("0");
    let hours: u64 = field(0).parse().unwrap_or(0);
    let minutes: u64 = field(1).parse().unwrap_or(0);
    let seconds: u64 = field(2).parse().unwrap_or(0);

    // "5" and "50" after the comma are fractions, not milliseconds
    let fraction = field(3);
    let millis: u64 = format!("{:0<3}", fraction).parse().unwrap_or(0);

    (hours * 3600 + minutes * 60 + seconds) * 1000 + millis
}

/// Format milliseconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(total_milliseconds: u64) -> String {
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Read and decode a subtitle file of any supported encoding
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<(SubtitleDocument, TextEncoding)> {
    let path = path.as_ref();
    let bytes = fs::read(path).await?;
    let (content, encoding) = encoding::decode(&bytes)?;
    debug!("Decoded {} as {:?}", path.display(), encoding);

    let document = SubtitleDocument::parse(&content).map_err(|e| match e {
        SubweaveError::Subtitle(msg) => {
            SubweaveError::Subtitle(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    Ok((document, encoding))
}

/// Write a subtitle document as UTF-8 SubRip
pub async fn write_srt<P: AsRef<Path>>(document: &SubtitleDocument, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing SRT file: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(output_path, document.to_srt_string()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:01,000 --> 00:00:03,500\r\nHello there.\r\n\r\n2\r\n00:00:04,000 --> 00:00:06,000 X1:100 X2:200\r\nTwo lines\r\nof text\r\n\r\n";

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(65_123), "00:01:05,123");
        assert_eq!(format_srt_time(3_661_500), "01:01:01,500");
    }

    #[test]
    fn test_parse_crlf_and_settings() {
        let doc = SubtitleDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.cues[0].start_ms, 1_000);
        assert_eq!(doc.cues[0].end_ms, 3_500);
        assert_eq!(doc.cues[0].text, "Hello there.");
        assert_eq!(doc.cues[1].text, "Two lines\nof text");
        assert_eq!(doc.cues[1].settings, " X1:100 X2:200");
    }

    #[test]
    fn test_render_preserves_timing() {
        let doc = SubtitleDocument::parse(SAMPLE).unwrap();
        let rendered = doc.to_srt_string();
        assert!(rendered.starts_with("1\n00:00:01,000 --> 00:00:03,500\nHello there.\n\n"));
        assert!(rendered.contains("00:00:04,000 --> 00:00:06,000 X1:100 X2:200\n"));

        let reparsed = SubtitleDocument::parse(&rendered).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_parse_short_fraction_and_missing_index() {
        let doc = SubtitleDocument::parse("00:00:01.5 --> 00:00:02.25\nNo index here\n").unwrap();
        assert_eq!(doc.cues[0].index, 1);
        assert_eq!(doc.cues[0].start_ms, 1_500);
        assert_eq!(doc.cues[0].end_ms, 2_250);
    }

    #[test]
    fn test_numeric_text_line_is_kept() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\n42\n\n2\n00:00:03,000 --> 00:00:04,000\nNext\n";
        let doc = SubtitleDocument::parse(content).unwrap();
        assert_eq!(doc.cues[0].text, "42");
        assert_eq!(doc.cues[1].index, 2);
    }

    #[test]
    fn test_parse_rejects_non_srt_and_accepts_empty() {
        assert!(SubtitleDocument::parse("this is not a subtitle").is_err());
        assert!(SubtitleDocument::parse("").unwrap().is_empty());
        assert!(SubtitleDocument::parse("\n\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("movie.eng.srt");
        let doc = SubtitleDocument::parse(SAMPLE).unwrap();

        write_srt(&doc, &path).await.unwrap();
        let (read_back, encoding) = read_srt(&path).await.unwrap();
        assert_eq!(read_back, doc);
        assert_eq!(encoding, TextEncoding::Utf8);
    }
}
