use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server_addr: Option<String>,
    pub tesseract_command: Option<String>,
    pub translation_model: Option<String>,
    pub whisper_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    ocr: Option<OcrSettings>,
    translation: Option<TranslationSettings>,
    whisper: Option<WhisperSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    tesseract: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WhisperSettings {
    model: Option<String>,
}

/// Loads `settings.toml` then `settings.local.toml` from the working
/// directory, then an optional extra file; later files win per key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, file: SettingsFile) {
        if let Some(server) = file.server {
            if let Some(addr) = server.addr {
                self.server_addr = Some(addr);
            }
        }
        if let Some(ocr) = file.ocr {
            if let Some(command) = ocr.tesseract {
                self.tesseract_command = Some(command);
            }
        }
        if let Some(translation) = file.translation {
            if let Some(model) = translation.model {
                self.translation_model = Some(model);
            }
        }
        if let Some(whisper) = file.whisper {
            if let Some(model) = whisper.model {
                self.whisper_model = Some(model);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_per_key() {
        let mut settings = Settings::default();
        let first: SettingsFile = toml::from_str(
            r#"
            [server]
            addr = "0.0.0.0:9000"

            [whisper]
            model = "base"
            "#,
        )
        .unwrap();
        let second: SettingsFile = toml::from_str(
            r#"
            [whisper]
            model = "small"
            "#,
        )
        .unwrap();
        settings.merge(first);
        settings.merge(second);
        assert_eq!(settings.server_addr.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(settings.whisper_model.as_deref(), Some("small"));
        assert!(settings.tesseract_command.is_none());
    }

    #[test]
    fn missing_extra_settings_file_is_an_error() {
        let err = load_settings(Some(Path::new("definitely-missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("definitely-missing.toml"));
    }

    #[test]
    fn empty_file_parses() {
        let parsed: SettingsFile = toml::from_str("").unwrap();
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert!(settings.server_addr.is_none());
    }
}
