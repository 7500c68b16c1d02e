//! bhasha: a thin HTTP service exposing text translation, OCR-plus-translation
//! and speech-to-text for the Nepali / Sinhala / English triple. Translation
//! runs a local quantized seq-to-seq model, OCR shells out to Tesseract with a
//! fixed language/PSM fallback sweep, speech goes through Whisper.

pub mod download;
pub mod languages;
pub mod logging;
pub mod ocr;
pub mod server;
pub mod settings;
pub mod speech;
pub mod translate;
