//! OCR through the `tesseract` command-line program.

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{GrayImage, ImageFormat};
use tracing::debug;

use super::error::OcrError;
use super::{OcrConfig, OcrEngine, OcrLanguage};
use crate::utils::config::AppConfig;

/// Runs `tesseract stdin stdout` once per region, passing a PNG on stdin.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    tessdata_dir: Option<String>,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            tessdata_dir: None,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: impl Into<String>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let engine = Self::new(config.tesseract_command.as_ref());
        match &config.tessdata_dir {
            Some(dir) => engine.with_tessdata_dir(dir.as_ref()),
            None => engine,
        }
    }

    fn arguments(&self, language: OcrLanguage, config: &OcrConfig) -> Vec<String> {
        let mut args = vec!["stdin".to_string(), "stdout".to_string()];
        if let Some(dir) = &self.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.clone());
        }
        args.push("-l".to_string());
        args.push(language.as_str().to_string());
        args.extend(config.to_args());
        args
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        region: &GrayImage,
        language: OcrLanguage,
        config: &OcrConfig,
    ) -> Result<String, OcrError> {
        let mut png = Vec::new();
        region.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let args = self.arguments(language, config);
        debug!("Running {} {}", self.command, args.join(" "));

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OcrError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // The engine may exit before reading all of stdin; reap it before
        // reporting the failed write.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;
        written?;
        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_order() {
        let engine = TesseractEngine::new("tesseract").with_tessdata_dir("/data");
        let args = engine.arguments(OcrLanguage::ChineseEnglish, &OcrConfig::psm(11));
        assert_eq!(
            args,
            vec![
                "stdin",
                "stdout",
                "--tessdata-dir",
                "/data",
                "-l",
                "chi_sim+eng",
                "--psm",
                "11"
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary");
        let region = GrayImage::new(4, 4);
        let result = engine.recognize(&region, OcrLanguage::English, &OcrConfig::default());
        assert!(matches!(result, Err(OcrError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_exiting_early_reports_write_error() {
        // `true` never reads stdin, so a region larger than the pipe buffer
        // cannot be written in full.
        let mut seed = 12345u32;
        let region = GrayImage::from_fn(600, 600, |_, _| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            image::Luma([(seed >> 16) as u8])
        });

        let result = TesseractEngine::new("true").recognize(
            &region,
            OcrLanguage::English,
            &OcrConfig::default(),
        );

        assert!(matches!(result, Err(OcrError::Io { .. })), "{result:?}");
    }
}
