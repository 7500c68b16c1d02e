use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use bhasha::ocr::engine::{OcrEngine, TesseractEngine};
use bhasha::server::AppState;
use bhasha::speech::{SpeechModel, WhisperSpeech};
use bhasha::translate::TranslationModel;
use bhasha::translate::madlad::MadladModel;
use bhasha::{logging, server, settings};

#[derive(Parser, Debug)]
#[command(
    name = "bhasha",
    version,
    about = "Translation, OCR and speech-to-text HTTP service"
)]
struct Cli {
    /// Address to listen on (default: 127.0.0.1:8787)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Tesseract binary to use (overrides settings)
    #[arg(long = "tesseract")]
    tesseract: Option<String>,

    /// Whisper model name (tiny/base/small/medium/large...)
    #[arg(long = "whisper-model")]
    whisper_model: Option<String>,

    /// Translation model repository (Hugging Face id)
    #[arg(long = "translation-model")]
    translation_model: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

const DEFAULT_ADDR: &str = "127.0.0.1:8787";

/// An explicit command-line address wins over settings; the default only
/// applies when neither is given.
fn resolve_addr(cli: Option<String>, settings: Option<String>) -> String {
    cli.or(settings)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
    if let Some(command) = cli.tesseract {
        settings.tesseract_command = Some(command);
    }
    if let Some(model) = cli.whisper_model {
        settings.whisper_model = Some(model);
    }
    if let Some(model) = cli.translation_model {
        settings.translation_model = Some(model);
    }
    let addr = resolve_addr(cli.addr, settings.server_addr.clone());

    // Every dependency loads once here; a failure leaves the matching
    // endpoints answering 503 instead of taking the whole service down.
    let engine = TesseractEngine::new(settings.tesseract_command.clone());
    let ocr: Option<Arc<dyn OcrEngine>> = match engine.check() {
        Ok(version) => {
            info!("{}", version);
            Some(Arc::new(engine))
        }
        Err(err) => {
            warn!("tesseract not available, OCR disabled: {}", err);
            None
        }
    };

    let translator: Option<Arc<dyn TranslationModel>> = match MadladModel::load(&settings).await {
        Ok(model) => Some(Arc::new(model)),
        Err(err) => {
            warn!("failed to load translation model: {}", err);
            None
        }
    };

    let speech: Option<Arc<dyn SpeechModel>> =
        match WhisperSpeech::load(settings.whisper_model.as_deref()).await {
            Ok(model) => Some(Arc::new(model)),
            Err(err) => {
                warn!("failed to load whisper model: {}", err);
                None
            }
        };

    let state = Arc::new(AppState {
        translator,
        speech,
        ocr,
    });

    info!("listening on {}", addr);
    server::run_server(state, addr).await
}
