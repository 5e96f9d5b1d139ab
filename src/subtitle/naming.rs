use std::path::{Path, PathBuf};

const CLEANED_MARKER: &str = "cleaned";
const TRANSLATED_MARKER: &str = "translated";

/// Processing stage a subtitle file on disk belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Extracted,
    Cleaned,
    Translated,
}

/// A subtitle file classified by its name.
///
/// `base` is the file name without the stage markers and the `.srt`
/// extension, e.g. `movie.eng` for `movie.eng.fr.translated.srt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub base: String,
    target: Option<String>,
}

impl SubtitleArtifact {
    /// Classify a path. Returns `None` for anything that is not a `.srt` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if !ext.eq_ignore_ascii_case("srt") || stem.is_empty() {
            return None;
        }

        let (kind, base, target) = match stem.rsplit_once('.') {
            Some((rest, marker)) if marker.eq_ignore_ascii_case(CLEANED_MARKER) && !rest.is_empty() => {
                (ArtifactKind::Cleaned, rest.to_string(), None)
            }
            Some((rest, marker)) if marker.eq_ignore_ascii_case(TRANSLATED_MARKER) => {
                match rest.rsplit_once('.') {
                    Some((base, target)) if !base.is_empty() && !target.is_empty() => (
                        ArtifactKind::Translated,
                        base.to_string(),
                        Some(target.to_string()),
                    ),
                    _ => (ArtifactKind::Extracted, stem.to_string(), None),
                }
            }
            _ => (ArtifactKind::Extracted, stem.to_string(), None),
        };

        Some(Self {
            path: path.to_path_buf(),
            kind,
            base,
            target,
        })
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.dir()
            .join(format!("{}.{}.srt", self.base, CLEANED_MARKER))
    }

    pub fn translated_path(&self, target_code: &str) -> PathBuf {
        self.dir().join(format!(
            "{}.{}.{}.srt",
            self.base, target_code, TRANSLATED_MARKER
        ))
    }

    /// Target language code of a translated artifact
    pub fn target_language(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Language tag the track was extracted under, e.g. `eng` for both
    /// `movie.eng` and `movie.eng-3`
    pub fn language_tag(&self) -> Option<&str> {
        let (_, tag) = self.base.rsplit_once('.')?;
        let tag = match tag.rsplit_once('-') {
            Some((language, id)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => language,
            _ => tag,
        };
        Some(tag).filter(|t| !t.is_empty())
    }

    /// Locate the media file this artifact was derived from
    pub fn find_media(&self, extensions: &[String]) -> Option<PathBuf> {
        find_media_for(self.dir(), &self.base, extensions)
    }
}

/// Output path for an extracted track: `<media-stem>.<tag>.srt`
pub fn extracted_path(media: &Path, tag: &str) -> PathBuf {
    let stem = media
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    media.with_file_name(format!("{}.{}.srt", stem, tag))
}

/// Language tag for an extracted track. Disambiguated by track id when the
/// same language is selected more than once from one file.
pub fn track_tag(language: &str, track_id: u64, duplicated: bool) -> String {
    let language = if language.trim().is_empty() {
        "und"
    } else {
        language.trim()
    };
    if duplicated {
        format!("{}-{}", language, track_id)
    } else {
        language.to_string()
    }
}

pub fn is_media(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

/// Longest dot-prefix of `base` that names an existing media file in `dir`
pub fn find_media_for(dir: &Path, base: &str, extensions: &[String]) -> Option<PathBuf> {
    let mut prefix = base;
    loop {
        for ext in extensions {
            let candidate = dir.join(format!("{}.{}", prefix, ext.trim_start_matches('.')));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        match prefix.rsplit_once('.') {
            Some((shorter, _)) if !shorter.is_empty() => prefix = shorter,
            _ => return None,
        }
    }
}
