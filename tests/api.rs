use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bhasha::languages::Language;
use bhasha::ocr::engine::OcrEngine;
use bhasha::server::{AppState, router};
use bhasha::speech::{SpeechModel, Transcription};
use bhasha::translate::TranslationModel;

struct FakeTranslator;

impl TranslationModel for FakeTranslator {
    fn translate(&self, text: &str, _source: Language) -> Result<String> {
        Ok(format!("translated: {}", text))
    }
}

struct FailingTranslator;

impl TranslationModel for FailingTranslator {
    fn translate(&self, _text: &str, _source: Language) -> Result<String> {
        Err(anyhow!("generation blew up"))
    }
}

/// OCR engine whose every attempt yields the same canned text.
struct CannedOcr(&'static str);

impl OcrEngine for CannedOcr {
    fn recognize(
        &self,
        _image: &Path,
        _language: Option<Language>,
        _psm: Option<u32>,
    ) -> Result<String> {
        Ok(self.0.to_string())
    }

    fn detect_script(&self, _image: &Path) -> Result<String> {
        Ok("Latin".to_string())
    }
}

struct FakeSpeech {
    text: &'static str,
    language: Option<&'static str>,
}

impl SpeechModel for FakeSpeech {
    fn transcribe(&self, _audio: &[u8]) -> Result<Transcription> {
        Ok(Transcription {
            text: self.text.to_string(),
            language: self.language.map(|value| value.to_string()),
        })
    }
}

fn empty_state() -> Arc<AppState> {
    Arc::new(AppState {
        translator: None,
        speech: None,
        ocr: None,
    })
}

fn full_state() -> Arc<AppState> {
    Arc::new(AppState {
        translator: Some(Arc::new(FakeTranslator)),
        speech: Some(Arc::new(FakeSpeech {
            text: " नमस्ते ",
            language: Some("ne"),
        })),
        ocr: Some(Arc::new(CannedOcr("hello"))),
    })
}

async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn white_png_base64() -> String {
    let pixels = image::RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    BASE64.encode(bytes)
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router(empty_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn translate_text_without_model_returns_503() {
    let (status, body) = post_json(
        router(empty_state()),
        "/translate-text",
        serde_json::json!({ "text": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not loaded"));
}

#[tokio::test]
async fn translate_text_rejects_blank_text() {
    let (status, _) = post_json(
        router(full_state()),
        "/translate-text",
        serde_json::json!({ "text": "   \n " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn translate_text_returns_translation() {
    let (status, body) = post_json(
        router(full_state()),
        "/translate-text",
        serde_json::json!({ "text": "नमस्ते", "source_lang": "ne" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["translated_text"], "translated: नमस्ते");
}

#[tokio::test]
async fn translate_text_generation_error_returns_500() {
    let state = Arc::new(AppState {
        translator: Some(Arc::new(FailingTranslator)),
        speech: None,
        ocr: None,
    });
    let (status, body) = post_json(
        router(state),
        "/translate-text",
        serde_json::json!({ "text": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("translation error"));
}

#[tokio::test]
async fn ocr_translate_without_engine_returns_503() {
    let (status, _) = post_json(
        router(empty_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": white_png_base64() }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn ocr_translate_requires_image_payload() {
    let (status, _) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ocr_translate_rejects_invalid_base64() {
    let (status, _) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": "not!!base64" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ocr_translate_rejects_undecodable_image() {
    let (status, _) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": BASE64.encode("not an image") }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_image_degrades_to_empty_text_without_translation() {
    let state = Arc::new(AppState {
        translator: Some(Arc::new(FakeTranslator)),
        speech: None,
        ocr: Some(Arc::new(CannedOcr(""))),
    });
    let (status, body) = post_json(
        router(state),
        "/ocr-translate",
        serde_json::json!({ "image_base64": white_png_base64() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // source_lang defaults to "ne", so the sweep starts (and, finding
    // nothing, ends) on Nepali.
    assert_eq!(body["detected_script"], "Devanagari");
    assert_eq!(body["detected_language"], "nep");
    assert_eq!(body["extracted_text"], "");
    assert!(body.get("translated_text").is_none());
}

#[tokio::test]
async fn ocr_translate_extracts_and_translates() {
    let (status, body) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": white_png_base64(), "source_lang": "si" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detected_language"], "sin");
    assert_eq!(body["detected_script"], "Sinhala");
    assert_eq!(body["extracted_text"], "hello");
    assert_eq!(body["translated_text"], "translated: hello");
}

#[tokio::test]
async fn data_url_prefix_matches_plain_payload() {
    let plain = white_png_base64();
    let prefixed = format!("data:image/png;base64,{}", plain);

    let (status_a, body_a) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": plain }),
    )
    .await;
    let (status_b, body_b) = post_json(
        router(full_state()),
        "/ocr-translate",
        serde_json::json!({ "image_base64": prefixed }),
    )
    .await;

    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_a, status_b);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn speech_to_text_requires_some_input() {
    let (status, body) = post_json(
        router(full_state()),
        "/speech-to-text",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("audio_base64"));
}

#[tokio::test]
async fn speech_to_text_without_model_returns_503() {
    let (status, _) = post_json(
        router(empty_state()),
        "/speech-to-text",
        serde_json::json!({ "audio_base64": BASE64.encode([0u8; 16]) }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn speech_to_text_returns_transcript() {
    let (status, body) = post_json(
        router(full_state()),
        "/speech-to-text",
        serde_json::json!({ "audio_base64": BASE64.encode([0u8; 16]) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcript"], "नमस्ते");
    assert_eq!(body["detected_language"], "ne");
}

#[tokio::test]
async fn speech_to_text_accepts_multipart_upload() {
    let boundary = "bhasha-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; \
             filename=\"audio.wav\"\r\ncontent-type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[1u8; 32]);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/speech-to-text")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = router(full_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn speech_translate_translates_the_transcript() {
    let (status, body) = post_json(
        router(full_state()),
        "/speech-translate",
        serde_json::json!({ "audio_base64": BASE64.encode([0u8; 16]), "target_lang": "en" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcript"], "नमस्ते");
    assert_eq!(body["detected_language"], "ne");
    assert_eq!(body["translated_text"], "translated: नमस्ते");
}

#[tokio::test]
async fn speech_translate_without_translator_returns_503() {
    let state = Arc::new(AppState {
        translator: None,
        speech: Some(Arc::new(FakeSpeech {
            text: "hello",
            language: Some("en"),
        })),
        ocr: None,
    });
    let (status, _) = post_json(
        router(state),
        "/speech-translate",
        serde_json::json!({ "audio_base64": BASE64.encode([0u8; 16]) }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn speech_translate_clamps_unsupported_detected_language() {
    let state = Arc::new(AppState {
        translator: Some(Arc::new(FakeTranslator)),
        speech: Some(Arc::new(FakeSpeech {
            text: "bonjour",
            language: Some("fr"),
        })),
        ocr: None,
    });
    let (status, body) = post_json(
        router(state),
        "/speech-translate",
        serde_json::json!({ "audio_base64": BASE64.encode([0u8; 16]) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detected_language"], "ne");
}
