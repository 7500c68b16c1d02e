use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::warn;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::languages::Language;
use crate::ocr;

use super::error::ApiError;
use super::models::{
    OcrRequest, OcrResponse, SpeechRequest, SpeechToTextResponse, SpeechTranslateResponse,
    TranslateRequest, TranslateResponse,
};
use super::state::AppState;

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/translate-text", post(translate_text))
        .route("/ocr-translate", post(ocr_translate))
        .route("/speech-to-text", post(speech_to_text))
        .route("/speech-translate", post(speech_translate))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

pub async fn run_server(state: Arc<AppState>, addr: String) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| "failed to bind server address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn translate_text(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Some(translator) = state.translator.clone() else {
        return Err(ApiError::unavailable("translation model not loaded"));
    };
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("text is empty"));
    }
    let source = payload
        .source_lang
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or(Language::Nepali);

    let translated = tokio::task::spawn_blocking(move || translator.translate(&text, source))
        .await
        .map_err(|err| ApiError::internal(format!("server task failed: {}", err)))?
        .map_err(|err| ApiError::internal(format!("translation error: {}", err)))?;

    Ok(Json(TranslateResponse {
        translated_text: translated,
    }))
}

async fn ocr_translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OcrRequest>,
) -> Result<Json<OcrResponse>, ApiError> {
    let Some(engine) = state.ocr.clone() else {
        return Err(ApiError::unavailable(
            "tesseract not installed; OCR is unavailable",
        ));
    };

    let raw = payload.image_base64.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("image_base64 is required"));
    }
    let bytes = BASE64
        .decode(strip_data_url(raw))
        .map_err(|err| ApiError::bad_request(format!("invalid image data: {}", err)))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("decoded image is empty"));
    }

    let hint = payload
        .source_lang
        .as_deref()
        .and_then(Language::from_code);
    let translator = state.translator.clone();

    let response = tokio::task::spawn_blocking(move || -> Result<OcrResponse, ApiError> {
        // A payload that fails to decode is the client's fault; anything
        // failing past that point (temp-file I/O) is ours.
        let image = ocr::decode_image(&bytes)
            .map_err(|err| ApiError::bad_request(format!("invalid image data: {}", err)))?;
        let extraction = ocr::extract_text(engine.as_ref(), &image, hint)
            .map_err(|err| ApiError::internal(format!("ocr failed: {}", err)))?;

        // Translation here is best-effort enrichment; a failing model must
        // not cost the caller the extracted text.
        let translated_text = match &translator {
            Some(translator) if !extraction.text.is_empty() => {
                match translator.translate(&extraction.text, extraction.language) {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!("translation after OCR failed: {}", err);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(OcrResponse {
            detected_script: extraction.script,
            detected_language: extraction.language.tesseract_code().to_string(),
            extracted_text: extraction.text,
            translated_text,
        })
    })
    .await
    .map_err(|err| ApiError::internal(format!("server task failed: {}", err)))??;

    Ok(Json(response))
}

async fn speech_to_text(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Json<SpeechToTextResponse>, ApiError> {
    let (audio, _target_lang) = read_audio_input(req).await?;
    let Some(speech) = state.speech.clone() else {
        return Err(ApiError::unavailable("speech model not loaded"));
    };

    let transcription = tokio::task::spawn_blocking(move || speech.transcribe(&audio))
        .await
        .map_err(|err| ApiError::internal(format!("server task failed: {}", err)))?
        .map_err(|err| ApiError::internal(format!("transcription error: {}", err)))?;

    Ok(Json(SpeechToTextResponse {
        transcript: transcription.text.trim().to_string(),
        detected_language: transcription.language.unwrap_or_default(),
    }))
}

async fn speech_translate(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Json<SpeechTranslateResponse>, ApiError> {
    let (audio, _target_lang) = read_audio_input(req).await?;
    let Some(speech) = state.speech.clone() else {
        return Err(ApiError::unavailable("speech model not loaded"));
    };
    let Some(translator) = state.translator.clone() else {
        return Err(ApiError::unavailable("translation model not loaded"));
    };

    let response = tokio::task::spawn_blocking(move || -> anyhow::Result<SpeechTranslateResponse> {
        let transcription = speech.transcribe(&audio)?;
        let transcript = transcription.text.trim().to_string();
        // Whisper can detect languages the translation model was never
        // asked to support; clamp to the service's default source.
        let detected = transcription
            .language
            .as_deref()
            .and_then(Language::from_code)
            .unwrap_or(Language::Nepali);
        let translated = translator.translate(&transcript, detected)?;
        Ok(SpeechTranslateResponse {
            transcript,
            detected_language: detected.code().to_string(),
            translated_text: translated,
        })
    })
    .await
    .map_err(|err| ApiError::internal(format!("server task failed: {}", err)))?
    .map_err(|err| ApiError::internal(format!("speech translation error: {}", err)))?;

    Ok(Json(response))
}

/// Pulls audio bytes out of either accepted request shape: a multipart
/// `file` upload, or JSON with `audio_base64`. Returns the optional
/// `target_lang` alongside (JSON form only).
async fn read_audio_input(req: Request) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid multipart body: {}", err)))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid multipart body: {}", err)))?
        {
            if field.name() == Some("file") {
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read uploaded file: {}", err))
                })?;
                if bytes.is_empty() {
                    break;
                }
                return Ok((bytes.to_vec(), None));
            }
        }
        return Err(ApiError::bad_request("send 'file' or 'audio_base64'"));
    }

    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|err| ApiError::bad_request(format!("failed to read request body: {}", err)))?;
    let payload: SpeechRequest = if bytes.is_empty() {
        SpeechRequest::default()
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::bad_request(format!("invalid request body: {}", err)))?
    };

    let Some(encoded) = payload
        .audio_base64
        .filter(|value| !value.trim().is_empty())
    else {
        return Err(ApiError::bad_request("send 'file' or 'audio_base64'"));
    };
    let audio = BASE64
        .decode(strip_data_url(encoded.trim()))
        .map_err(|err| ApiError::bad_request(format!("invalid base64 audio: {}", err)))?;
    let target_lang = payload.target_lang.or_else(|| Some("en".to_string()));
    Ok((audio, target_lang))
}

/// Strips an optional `data:...;base64,` prefix so data URLs and plain
/// base64 payloads behave the same.
fn strip_data_url(raw: &str) -> &str {
    if raw.starts_with("data:") {
        raw.split_once(',').map(|(_, rest)| rest).unwrap_or(raw)
    } else {
        raw
    }
}
