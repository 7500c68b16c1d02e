use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct TranslateRequest {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) source_lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) translated_text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcrRequest {
    #[serde(default)]
    pub(crate) image_base64: String,
    #[serde(default = "default_ocr_source_lang")]
    pub(crate) source_lang: Option<String>,
}

fn default_ocr_source_lang() -> Option<String> {
    Some("ne".to_string())
}

#[derive(Debug, Serialize)]
pub(crate) struct OcrResponse {
    pub(crate) detected_script: String,
    pub(crate) detected_language: String,
    pub(crate) extracted_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) translated_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SpeechRequest {
    pub(crate) audio_base64: Option<String>,
    pub(crate) target_lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeechToTextResponse {
    pub(crate) transcript: String,
    pub(crate) detected_language: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeechTranslateResponse {
    pub(crate) transcript: String,
    pub(crate) detected_language: String,
    pub(crate) translated_text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
