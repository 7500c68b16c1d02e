//! Translation boundary. The service only needs one operation from the
//! underlying model: source text in, English text out. Everything about the
//! model itself stays behind [`TranslationModel`].

pub mod madlad;

use anyhow::Result;

use crate::languages::Language;

/// A loaded translation model. Implementations are shared read-only across
/// requests; the target language is fixed to English.
pub trait TranslationModel: Send + Sync {
    fn translate(&self, text: &str, source: Language) -> Result<String>;
}
