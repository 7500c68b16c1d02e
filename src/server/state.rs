use std::sync::Arc;

use crate::ocr::engine::OcrEngine;
use crate::speech::SpeechModel;
use crate::translate::TranslationModel;

/// Everything the handlers need, built once at startup and immutable after.
/// A `None` handle means the dependency failed to load and the corresponding
/// endpoints answer 503.
pub struct AppState {
    pub translator: Option<Arc<dyn TranslationModel>>,
    pub speech: Option<Arc<dyn SpeechModel>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
}
