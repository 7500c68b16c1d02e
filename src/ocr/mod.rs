//! Image text extraction: decode, preprocess, detect script, then run the
//! language/PSM fallback sweep against the OCR engine.

pub mod engine;
mod preprocess;
mod sweep;

use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::languages::Language;
use engine::OcrEngine;

pub struct OcrExtraction {
    pub script: String,
    pub language: Language,
    pub text: String,
}

/// Decodes and normalizes a request payload. Failure here means the client
/// sent something that is not an image.
pub fn decode_image(image_bytes: &[u8]) -> Result<DynamicImage> {
    preprocess::decode(image_bytes)
}

/// Extracts the best-effort text from a decoded image. `hint` forces the
/// first OCR language; without it the engine's script estimate decides.
/// Only temp-file I/O can fail here; every engine failure degrades to
/// empty text.
pub fn extract_text(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    hint: Option<Language>,
) -> Result<OcrExtraction> {
    let processed = preprocess::preprocess(image);

    let original_file = write_temp_png(image)?;
    let processed_file = write_temp_png(&processed)?;

    let (forced, script) = match hint {
        Some(lang) => (lang, lang.script().to_string()),
        None => {
            let script = match engine.detect_script(original_file.path()) {
                Ok(script) => script,
                Err(err) => {
                    debug!("script detection failed: {}", err);
                    "Latin".to_string()
                }
            };
            let forced = Language::from_script(&script).unwrap_or(Language::English);
            (forced, script)
        }
    };
    debug!("ocr sweep starting (forced={}, script={})", forced.tesseract_code(), script);

    let outcome = sweep::run(
        engine,
        processed_file.path(),
        original_file.path(),
        forced,
        script,
    );

    Ok(OcrExtraction {
        script: outcome.script,
        language: outcome.language,
        text: outcome.text,
    })
}

fn write_temp_png(image: &DynamicImage) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("bhasha-ocr-")
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for OCR")?;
    image
        .write_to(&mut file, image::ImageFormat::Png)
        .with_context(|| "failed to write temp image for OCR")?;
    file.flush().ok();
    Ok(file)
}
