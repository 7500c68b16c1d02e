//! MADLAD-400 translation engine: a quantized T5 checkpoint run locally
//! through candle. The output language is selected with the model's `<2xx>`
//! prefix token; decoding is greedy and bounded.

use anyhow::{Context, Result, anyhow};
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_t5 as t5;
use std::path::PathBuf;
use std::sync::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::download;
use crate::languages::Language;
use crate::settings::Settings;
use crate::translate::TranslationModel;

const DEFAULT_MODEL_REPO: &str = "jbochi/madlad400-3b-mt";
const WEIGHTS_FILE: &str = "model-q4k.gguf";
const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Target language token for MADLAD prompts; the service always translates
/// into English.
const TARGET_PREFIX: &str = "<2en>";

const MAX_OUTPUT_TOKENS: usize = 128;
const SAMPLE_SEED: u64 = 299792458;

pub struct MadladModel {
    tokenizer: Tokenizer,
    device: Device,
    // candle's decoder mutates its KV cache, so generation needs exclusive
    // access to the model even though requests only read the handle.
    inner: Mutex<ModelState>,
}

struct ModelState {
    model: t5::T5ForConditionalGeneration,
    config: t5::Config,
}

impl MadladModel {
    /// Downloads missing model files into the cache and loads the checkpoint.
    pub async fn load(settings: &Settings) -> Result<Self> {
        let repo = settings
            .translation_model
            .as_deref()
            .unwrap_or(DEFAULT_MODEL_REPO);
        let weights = ensure_model_file(repo, WEIGHTS_FILE).await?;
        let config_path = ensure_model_file(repo, CONFIG_FILE).await?;
        let tokenizer_path = ensure_model_file(repo, TOKENIZER_FILE).await?;

        let device = Device::Cpu;
        let config_content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read model config: {}", config_path.display()))?;
        let config: t5::Config = serde_json::from_str(&config_content)
            .with_context(|| "failed to parse translation model config")?;
        let vb = t5::VarBuilder::from_gguf(&weights, &device)
            .with_context(|| "failed to load translation model weights")?;
        let model = t5::T5ForConditionalGeneration::load(vb, &config)
            .with_context(|| "failed to build translation model")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|err| anyhow!("failed to load tokenizer: {}", err))?;

        info!("translation model loaded: {}", repo);
        Ok(Self {
            tokenizer,
            device,
            inner: Mutex::new(ModelState { model, config }),
        })
    }
}

impl TranslationModel for MadladModel {
    fn translate(&self, text: &str, source: Language) -> Result<String> {
        debug!("translating {} -> eng_Latn", source.locale_tag());
        let prompt = format!("{} {}", TARGET_PREFIX, text);
        let tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|err| anyhow!("failed to tokenize input: {}", err))?
            .get_ids()
            .to_vec();

        let mut state = self
            .inner
            .lock()
            .map_err(|_| anyhow!("translation model lock poisoned"))?;
        let ModelState { model, config } = &mut *state;
        model.clear_kv_cache();

        let input_token_ids = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input_token_ids)?;

        let decoder_start = config.decoder_start_token_id.unwrap_or(config.pad_token_id);
        let mut output_token_ids = vec![decoder_start as u32];
        let mut logits_processor = LogitsProcessor::new(SAMPLE_SEED, None, None);

        for index in 0.. {
            if output_token_ids.len() > MAX_OUTPUT_TOKENS {
                break;
            }
            let decoder_token_ids = if index == 0 || !config.use_cache {
                Tensor::new(output_token_ids.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last_token = *output_token_ids
                    .last()
                    .ok_or_else(|| anyhow!("empty decoder sequence"))?;
                Tensor::new(&[last_token], &self.device)?.unsqueeze(0)?
            };
            let logits = model
                .decode(&decoder_token_ids, &encoder_output)?
                .squeeze(0)?;
            let next_token_id = logits_processor.sample(&logits)?;
            if next_token_id as usize == config.eos_token_id {
                break;
            }
            output_token_ids.push(next_token_id);
        }

        let translated = self
            .tokenizer
            .decode(&output_token_ids[1..], true)
            .map_err(|err| anyhow!("failed to decode output tokens: {}", err))?;
        Ok(translated.trim().to_string())
    }
}

async fn ensure_model_file(repo: &str, file: &str) -> Result<PathBuf> {
    let dest = download::cache_path("madlad", file);
    let url = format!("https://huggingface.co/{}/resolve/main/{}", repo, file);
    download::ensure_file(&url, &dest).await?;
    Ok(dest)
}
