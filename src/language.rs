//! Language table shared by the translator and the embedder.
//!
//! Each entry carries the display name used for track names, the code the
//! translation service expects, and the ISO 639-2 code written into Matroska
//! track headers.

use crate::error::{Result, SubweaveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
    pub iso639_2: &'static str,
}

const fn lang(name: &'static str, code: &'static str, iso639_2: &'static str) -> Language {
    Language { name, code, iso639_2 }
}

pub static LANGUAGES: &[Language] = &[
    lang("Afrikaans", "af", "afr"),
    lang("Albanian", "sq", "alb"),
    lang("Amharic", "am", "amh"),
    lang("Arabic", "ar", "ara"),
    lang("Armenian", "hy", "hye"),
    lang("Azerbaijani", "az", "aze"),
    lang("Basque", "eu", "eus"),
    lang("Belarusian", "be", "bel"),
    lang("Bengali", "bn", "ben"),
    lang("Bosnian", "bs", "bos"),
    lang("Bulgarian", "bg", "bul"),
    lang("Catalan", "ca", "cat"),
    lang("Cebuano", "ceb", "ceb"),
    lang("Chinese (Simplified)", "zh-CN", "chi"),
    lang("Chinese (Traditional)", "zh-TW", "chi"),
    lang("Corsican", "co", "cos"),
    lang("Croatian", "hr", "hrv"),
    lang("Czech", "cs", "ces"),
    lang("Danish", "da", "dan"),
    lang("Dutch", "nl", "dut"),
    lang("English", "en", "eng"),
    lang("Esperanto", "eo", "epo"),
    lang("Estonian", "et", "est"),
    lang("Finnish", "fi", "fin"),
    lang("French", "fr", "fre"),
    lang("Frisian", "fy", "fry"),
    lang("Galician", "gl", "glg"),
    lang("Georgian", "ka", "kat"),
    lang("German", "de", "ger"),
    lang("Greek", "el", "ell"),
    lang("Gujarati", "gu", "guj"),
    lang("Haitian Creole", "ht", "hat"),
    lang("Hausa", "ha", "hau"),
    lang("Hawaiian", "haw", "haw"),
    lang("Hebrew", "iw", "heb"),
    lang("Hindi", "hi", "hin"),
    lang("Hmong", "hmn", "hmn"),
    lang("Hungarian", "hu", "hun"),
    lang("Icelandic", "is", "isl"),
    lang("Igbo", "ig", "ibo"),
    lang("Indonesian", "id", "ind"),
    lang("Irish", "ga", "gle"),
    lang("Italian", "it", "ita"),
    lang("Japanese", "ja", "jpn"),
    lang("Javanese", "jw", "jav"),
    lang("Kannada", "kn", "kan"),
    lang("Kazakh", "kk", "kaz"),
    lang("Khmer", "km", "khm"),
    lang("Kinyarwanda", "rw", "kin"),
    lang("Korean", "ko", "kor"),
    lang("Kurdish", "ku", "kur"),
    lang("Kyrgyz", "ky", "kir"),
    lang("Lao", "lo", "lao"),
    lang("Latin", "la", "lat"),
    lang("Latvian", "lv", "lav"),
    lang("Lithuanian", "lt", "lit"),
    lang("Luxembourgish", "lb", "ltz"),
    lang("Macedonian", "mk", "mkd"),
    lang("Malagasy", "mg", "mlg"),
    lang("Malay", "ms", "msa"),
    lang("Malayalam", "ml", "mal"),
    lang("Maltese", "mt", "mlt"),
    lang("Maori", "mi", "mao"),
    lang("Marathi", "mr", "mar"),
    lang("Mongolian", "mn", "mon"),
    lang("Myanmar (Burmese)", "my", "mya"),
    lang("Nepali", "ne", "nep"),
    lang("Norwegian", "no", "nor"),
    lang("Nyanja (Chichewa)", "ny", "nya"),
    lang("Odia (Oriya)", "or", "ori"),
    lang("Pashto", "ps", "pus"),
    lang("Persian", "fa", "fas"),
    lang("Polish", "pl", "pol"),
    lang("Portuguese", "pt", "por"),
    lang("Punjabi", "pa", "pan"),
    lang("Romanian", "ro", "rum"),
    lang("Russian", "ru", "rus"),
    lang("Samoan", "sm", "smo"),
    lang("Scots Gaelic", "gd", "gla"),
    lang("Serbian", "sr", "srp"),
    lang("Sesotho", "st", "sot"),
    lang("Shona", "sn", "sna"),
    lang("Sindhi", "sd", "snd"),
    lang("Sinhala (Sinhalese)", "si", "sin"),
    lang("Slovak", "sk", "slk"),
    lang("Slovenian", "sl", "slv"),
    lang("Somali", "so", "som"),
    lang("Spanish", "es", "spa"),
    lang("Sundanese", "su", "sun"),
    lang("Swahili", "sw", "swa"),
    lang("Swedish", "sv", "swe"),
    lang("Tagalog (Filipino)", "tl", "tgl"),
    lang("Tajik", "tg", "tgk"),
    lang("Tamil", "ta", "tam"),
    lang("Tatar", "tt", "tat"),
    lang("Telugu", "te", "tel"),
    lang("Thai", "th", "tha"),
    lang("Turkish", "tr", "tur"),
    lang("Turkmen", "tk", "tuk"),
    lang("Ukrainian", "uk", "ukr"),
    lang("Urdu", "ur", "urd"),
    lang("Uyghur", "ug", "uig"),
    lang("Uzbek", "uz", "uzb"),
    lang("Vietnamese", "vi", "vie"),
    lang("Welsh", "cy", "cym"),
    lang("Xhosa", "xh", "xho"),
    lang("Yiddish", "yi", "yid"),
    lang("Yoruba", "yo", "yor"),
    lang("Zulu", "zu", "zul"),
];

// Alternate codes that name a table entry (ISO 639-1 modern forms, 639-2/T vs /B)
static ALIASES: &[(&str, &str)] = &[
    ("he", "iw"),
    ("jv", "jw"),
    ("zh", "zh-CN"),
    ("zh-hans", "zh-CN"),
    ("zh-hant", "zh-TW"),
    ("zho", "zh-CN"),
    ("fil", "tl"),
    ("fra", "fr"),
    ("deu", "de"),
    ("nld", "nl"),
    ("ron", "ro"),
    ("cze", "cs"),
    ("sqi", "sq"),
    ("per", "fa"),
    ("arm", "hy"),
    ("baq", "eu"),
    ("geo", "ka"),
    ("may", "ms"),
    ("bur", "my"),
    ("ice", "is"),
    ("mac", "mk"),
    ("wel", "cy"),
    ("slo", "sk"),
    ("mri", "mi"),
    ("gre", "el"),
    ("nb", "no"),
    ("nob", "no"),
];

/// True for the source-language placeholder that lets the service detect it
pub fn is_auto(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("auto")
}

/// Look a language up by display name, service code, ISO 639-2 code or alias
pub fn resolve(value: &str) -> Result<&'static Language> {
    let needle = value.trim();
    if needle.is_empty() {
        return Err(SubweaveError::UnknownLanguage(value.to_string()));
    }

    let direct = LANGUAGES.iter().find(|l| {
        l.name.eq_ignore_ascii_case(needle)
            || l.code.eq_ignore_ascii_case(needle)
            || l.iso639_2.eq_ignore_ascii_case(needle)
    });
    if let Some(found) = direct {
        return Ok(found);
    }

    if let Some((_, code)) = ALIASES.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(needle)) {
        if let Some(found) = LANGUAGES.iter().find(|l| l.code == *code) {
            return Ok(found);
        }
    }

    // Region-tagged IETF forms such as "en-US" or "pt-BR"
    if let Some((primary, _)) = needle.split_once(|c| c == '-' || c == '_') {
        if !primary.is_empty() {
            return resolve(primary);
        }
    }

    Err(SubweaveError::UnknownLanguage(value.to_string()))
}

/// Service code for a source language, passing "auto" through
pub fn source_code(value: &str) -> Result<String> {
    if is_auto(value) {
        Ok("auto".to_string())
    } else {
        Ok(resolve(value)?.code.to_string())
    }
}

/// Whether two language tags refer to the same language
pub fn same_language(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (resolve(a), resolve(b)) {
        // Chinese variants share an ISO 639-2 code, so compare service codes
        (Ok(x), Ok(y)) => x.code == y.code,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_code_and_iso() {
        assert_eq!(resolve("French").unwrap().code, "fr");
        assert_eq!(resolve("fr").unwrap().iso639_2, "fre");
        assert_eq!(resolve("FRE").unwrap().name, "French");
        assert_eq!(resolve("fra").unwrap().name, "French");
        assert_eq!(resolve("german").unwrap().iso639_2, "ger");
    }

    #[test]
    fn test_resolve_aliases_and_regions() {
        assert_eq!(resolve("he").unwrap().code, "iw");
        assert_eq!(resolve("en-US").unwrap().code, "en");
        assert_eq!(resolve("zh-TW").unwrap().name, "Chinese (Traditional)");
        assert_eq!(resolve("zh").unwrap().code, "zh-CN");
    }

    #[test]
    fn test_unknown_language() {
        assert!(matches!(resolve("Klingon"), Err(SubweaveError::UnknownLanguage(_))));
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_source_code_passes_auto() {
        assert_eq!(source_code("Auto").unwrap(), "auto");
        assert_eq!(source_code("English").unwrap(), "en");
    }

    #[test]
    fn test_same_language() {
        assert!(same_language("eng", "en"));
        assert!(same_language("fre", "fra"));
        assert!(!same_language("eng", "fre"));
        assert!(!same_language("und", "eng"));
        assert!(!same_language("zh-TW", "zh-CN"));
        assert!(same_language("zh", "zh-CN"));
    }
}
