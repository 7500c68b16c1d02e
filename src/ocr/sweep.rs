//! The OCR fallback sweep: a fixed trial order over candidate languages and
//! page-segmentation modes, stopping at the first non-empty result and
//! degrading through an unpreprocessed pass and language-less passes. Engine
//! failures inside the sweep are never fatal; the worst case is bounded by
//! (languages x 4) + (languages x 2) + 2 + 1 attempts.

use std::path::Path;
use tracing::debug;

use crate::languages::{Language, candidate_languages};
use crate::ocr::engine::OcrEngine;

/// PSM priority for the main pass: uniform block, fully automatic,
/// single line, sparse text.
const PSM_FULL: [u32; 4] = [6, 3, 7, 11];
/// Shortened priority for the degraded passes.
const PSM_QUICK: [u32; 2] = [6, 3];

pub(crate) struct SweepOutcome {
    pub(crate) text: String,
    pub(crate) language: Language,
    pub(crate) script: String,
}

/// One engine call folded into an explicit success value. Whitespace-only
/// output counts as failure; engine errors are logged and count as failure.
fn attempt(
    engine: &dyn OcrEngine,
    image: &Path,
    language: Option<Language>,
    psm: Option<u32>,
) -> Option<String> {
    match engine.recognize(image, language, psm) {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(err) => {
            debug!(
                "ocr attempt failed (lang={:?}, psm={:?}): {}",
                language.map(|lang| lang.tesseract_code()),
                psm,
                err
            );
            None
        }
    }
}

/// Runs the full fallback sweep. `forced` and `script` are the resolved
/// starting point (hint or script detection); they are overwritten by the
/// language of the first successful attempt and survive unchanged when every
/// attempt fails.
pub(crate) fn run(
    engine: &dyn OcrEngine,
    preprocessed: &Path,
    original: &Path,
    forced: Language,
    script: String,
) -> SweepOutcome {
    let candidates = candidate_languages(forced);

    for &lang in &candidates {
        for &psm in &PSM_FULL {
            if let Some(text) = attempt(engine, preprocessed, Some(lang), Some(psm)) {
                return success(text, lang);
            }
        }
    }

    // Preprocessing occasionally destroys low-contrast scans; retry on the
    // untouched image with the two most productive modes only.
    for &lang in &candidates {
        for &psm in &PSM_QUICK {
            if let Some(text) = attempt(engine, original, Some(lang), Some(psm)) {
                return success(text, lang);
            }
        }
    }

    for &psm in &PSM_QUICK {
        if let Some(text) = attempt(engine, preprocessed, None, Some(psm)) {
            return success(text, Language::English);
        }
    }

    if let Some(text) = attempt(engine, preprocessed, None, None) {
        return success(text, Language::English);
    }

    SweepOutcome {
        text: String::new(),
        language: forced,
        script,
    }
}

fn success(text: String, language: Language) -> SweepOutcome {
    SweepOutcome {
        text,
        language,
        script: language.script().to_string(),
    }
}
