use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;

use crate::languages::Language;

/// Boundary to the external OCR binary. Every sweep attempt is one
/// `recognize` call; failures are plain `Err` values the sweep can skip.
pub trait OcrEngine: Send + Sync {
    /// Runs one OCR pass. `language` of `None` lets the engine pick its
    /// default; `psm` of `None` leaves the page-segmentation mode unset.
    fn recognize(&self, image: &Path, language: Option<Language>, psm: Option<u32>)
    -> Result<String>;

    /// Asks the engine for a script/orientation estimate of the image.
    fn detect_script(&self, image: &Path) -> Result<String>;
}

/// Tesseract invoked as a subprocess.
pub struct TesseractEngine {
    command: String,
}

impl TesseractEngine {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or_else(|| "tesseract".to_string()),
        }
    }

    /// Availability probe run once at startup; returns the version line.
    pub fn check(&self) -> Result<String> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract --version failed: {}", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &Path,
        language: Option<Language>,
        psm: Option<u32>,
    ) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(image).arg("stdout");
        if let Some(lang) = language {
            cmd.arg("-l").arg(lang.tesseract_code());
        }
        cmd.arg("--oem").arg("3");
        if let Some(psm) = psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        let output = cmd
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn detect_script(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("--psm")
            .arg("0")
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract osd failed: {}", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim() == "Script" {
                    return Ok(value.trim().to_string());
                }
            }
        }
        Err(anyhow!("no script line in OSD output"))
    }
}
