//! Speech-to-text: ffmpeg decodes whatever the client uploaded into 16 kHz
//! mono WAV, whisper transcribes it and reports the language it detected.

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;
use tracing::info;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, get_lang_str,
};

use crate::download;

/// A transcription plus the ISO 639-1 code whisper detected, when it did.
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
}

/// A loaded speech-recognition model, shared read-only across requests.
pub trait SpeechModel: Send + Sync {
    fn transcribe(&self, audio: &[u8]) -> Result<Transcription>;
}

pub struct WhisperSpeech {
    context: WhisperContext,
}

impl WhisperSpeech {
    /// Downloads the ggml checkpoint if needed and loads it once.
    pub async fn load(model: Option<&str>) -> Result<Self> {
        ensure_command("ffmpeg", "speech transcription requires ffmpeg")?;
        let name = normalize_model_name(model.unwrap_or("small"))
            .ok_or_else(|| anyhow!("unknown whisper model: {}", model.unwrap_or_default()))?;
        let path = ensure_whisper_model(&name).await?;
        let model_path = path.to_string_lossy();
        let context = WhisperContext::new_with_params(
            model_path.as_ref(),
            WhisperContextParameters::default(),
        )
        .with_context(|| "failed to load whisper model")?;
        info!("whisper model loaded: {}", name);
        Ok(Self { context })
    }
}

impl SpeechModel for WhisperSpeech {
    fn transcribe(&self, audio: &[u8]) -> Result<Transcription> {
        let dir = tempdir().with_context(|| "failed to create temp dir for audio")?;
        let input_path = dir.path().join("input.bin");
        fs::write(&input_path, audio).with_context(|| "failed to write audio input")?;

        // ffmpeg sniffs the container from content, so the extension does
        // not matter. Whisper wants 16 kHz mono.
        let wav_path = dir.path().join("input.wav");
        run_ffmpeg(&[
            "-y",
            "-i",
            input_path.to_string_lossy().as_ref(),
            "-ar",
            "16000",
            "-ac",
            "1",
            wav_path.to_string_lossy().as_ref(),
        ])
        .with_context(|| "failed to decode audio with ffmpeg")?;

        let samples = read_wav_mono_f32(&wav_path)?;

        let mut state = self
            .context
            .create_state()
            .with_context(|| "failed to init whisper state")?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(num_cpus::get() as i32);
        params.set_translate(false);
        params.set_detect_language(true);

        state
            .full(params, &samples[..])
            .with_context(|| "whisper transcription failed")?;

        let language = state
            .full_lang_id_from_state()
            .ok()
            .and_then(|id| get_lang_str(id))
            .map(|value: &str| value.to_string());
        let num_segments = state
            .full_n_segments()
            .with_context(|| "failed to read segments")?;
        let mut parts = Vec::new();
        for idx in 0..num_segments {
            let text = state
                .full_get_segment_text(idx)
                .with_context(|| "failed to read segment text")?;
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }

        Ok(Transcription {
            text: parts.join(" "),
            language,
        })
    }
}

const WHISPER_MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

async fn ensure_whisper_model(model: &str) -> Result<PathBuf> {
    let file = format!("ggml-{}.bin", model);
    let dest = download::cache_path("whisper", &file);
    let url = format!("{}/{}", WHISPER_MODEL_BASE_URL, file);
    download::ensure_file(&url, &dest).await?;
    Ok(dest)
}

fn normalize_model_name(input: &str) -> Option<String> {
    let raw = input.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.strip_prefix("ggml-").unwrap_or(raw.as_str());
    let trimmed = trimmed.strip_suffix(".bin").unwrap_or(trimmed);

    let allowed = [
        "tiny",
        "base",
        "small",
        "medium",
        "large",
        "large-v2",
        "large-v3",
        "tiny.en",
        "base.en",
        "small.en",
        "medium.en",
    ];
    if allowed.contains(&trimmed) {
        return Some(trimmed.to_string());
    }
    None
}

fn run_ffmpeg(args: &[&str]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .with_context(|| "failed to run ffmpeg")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("ffmpeg failed: {}", stderr.trim()));
    }
    Ok(())
}

fn read_wav_mono_f32(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open wav: {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(anyhow!("wav has no channels"));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap_or(0.0)).collect(),
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max = (1i64 << (bits - 1)) as f32;
            if bits <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.unwrap_or(0) as f32 / max)
                    .collect()
            } else {
                reader
                    .samples::<i32>()
                    .map(|s| s.unwrap_or(0) as f32 / max)
                    .collect()
            }
        }
    };

    if channels == 1 {
        return Ok(samples);
    }

    let mut mono = Vec::with_capacity(samples.len() / channels);
    for chunk in samples.chunks(channels) {
        let sum: f32 = chunk.iter().sum();
        mono.push(sum / channels as f32);
    }
    Ok(mono)
}

fn ensure_command(cmd: &str, message: &str) -> Result<()> {
    if command_exists(cmd) {
        Ok(())
    } else {
        Err(anyhow!("{}", message))
    }
}

fn command_exists(cmd: &str) -> bool {
    let path = Path::new(cmd);
    if path.components().count() > 1 {
        return is_executable(path);
    }
    let path_var = match env::var_os("PATH") {
        Some(value) => value,
        None => return false,
    };
    env::split_paths(&path_var).any(|dir| is_executable(&dir.join(cmd)))
}

fn is_executable(path: &Path) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(value) => value,
        Err(_) => return false,
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
