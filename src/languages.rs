//! The fixed language triple the service supports, plus the mappings between
//! request codes, Tesseract language packs, scripts and model locale tags.

/// A language the service can OCR and translate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Nepali,
    Sinhala,
    English,
}

impl Language {
    /// Priority order used when building OCR candidate lists.
    pub const ALL: [Language; 3] = [Language::English, Language::Nepali, Language::Sinhala];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "ne" => Some(Language::Nepali),
            "si" => Some(Language::Sinhala),
            "en" => Some(Language::English),
            _ => None,
        }
    }

    /// Short ISO 639-1 code used in requests and Whisper output.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Nepali => "ne",
            Language::Sinhala => "si",
            Language::English => "en",
        }
    }

    /// Tesseract language pack name.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Language::Nepali => "nep",
            Language::Sinhala => "sin",
            Language::English => "eng",
        }
    }

    pub fn from_tesseract_code(code: &str) -> Option<Self> {
        match code.trim() {
            "nep" => Some(Language::Nepali),
            "sin" => Some(Language::Sinhala),
            "eng" => Some(Language::English),
            _ => None,
        }
    }

    /// Writing system name as reported by Tesseract OSD.
    pub fn script(&self) -> &'static str {
        match self {
            Language::Nepali => "Devanagari",
            Language::Sinhala => "Sinhala",
            Language::English => "Latin",
        }
    }

    pub fn from_script(script: &str) -> Option<Self> {
        match script.trim() {
            "Devanagari" => Some(Language::Nepali),
            "Sinhala" => Some(Language::Sinhala),
            "Latin" => Some(Language::English),
            _ => None,
        }
    }

    /// Full locale tag understood by multilingual seq-to-seq models.
    pub fn locale_tag(&self) -> &'static str {
        match self {
            Language::Nepali => "npi_Deva",
            Language::Sinhala => "sin_Sinh",
            Language::English => "eng_Latn",
        }
    }
}

/// Builds the prioritized, duplicate-free language list the OCR sweep walks:
/// the forced language first, then English, then the remaining supported
/// languages in fixed order. Insertion order of first occurrence is the
/// priority order.
pub fn candidate_languages(forced: Language) -> Vec<Language> {
    let mut candidates = vec![forced];
    for lang in Language::ALL {
        if !candidates.contains(&lang) {
            candidates.push(lang);
        }
    }
    candidates
}
