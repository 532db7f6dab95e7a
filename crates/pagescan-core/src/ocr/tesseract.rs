//! Tesseract recognition engine (CLI wrapper).

use std::env;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, trace};

use super::Recognizer;
use crate::error::OcrError;
use crate::models::config::{EngineConfig, LanguageSet, Profile};

/// Install locations checked before `PATH`.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

#[cfg(windows)]
const BINARY_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "tesseract";

/// Recognizer that pipes each page through the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    tessdata: Option<PathBuf>,
}

impl TesseractRecognizer {
    /// Use an explicit binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            tessdata: None,
        }
    }

    /// Locate the binary according to `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, OcrError> {
        let binary = locate_tesseract(config.binary_path.as_deref()).ok_or_else(|| {
            OcrError::EngineNotFound(match &config.binary_path {
                Some(path) => format!("{} does not exist", path.display()),
                None => "tesseract is not installed or not on PATH".to_string(),
            })
        })?;

        debug!("Using tesseract at {}", binary.display());
        Ok(Self {
            binary,
            tessdata: config.tessdata_path.clone(),
        })
    }

    /// Set `TESSDATA_PREFIX` for engine invocations.
    pub fn with_tessdata(mut self, tessdata: impl Into<PathBuf>) -> Self {
        self.tessdata = Some(tessdata.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, languages: &LanguageSet, profile: Profile) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(languages.to_string())
            .args(profile.engine_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(tessdata) = &self.tessdata {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }
        cmd
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(
        &self,
        bitmap: &DynamicImage,
        languages: &LanguageSet,
        profile: Profile,
    ) -> Result<String, OcrError> {
        let start = Instant::now();

        let mut png = Vec::new();
        bitmap
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OcrError::Encode(e.to_string()))?;

        trace!(
            "Running {} -l {} ({}), {} byte PNG",
            self.binary.display(),
            languages,
            profile,
            png.len()
        );

        let mut child = self
            .command(languages, profile)
            .spawn()
            .map_err(|e| OcrError::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        // Stdin is dropped at the end of this block so the engine sees EOF
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };

        // Always reap the child; an engine that quits early breaks the pipe
        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(OcrError::Engine {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if let Err(e) = sent {
            return Err(OcrError::Spawn(format!("failed to send bitmap: {}", e)));
        }

        let text = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\x0c', '\n'])
            .to_string();

        debug!(
            "Recognized {} chars in {}ms",
            text.chars().count(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Find a usable tesseract binary.
///
/// An explicitly configured path wins; it is returned only if it exists.
/// Otherwise well-known install locations are checked, then `PATH`.
pub fn locate_tesseract(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.is_file().then(|| path.to_path_buf());
    }

    if let Some(found) = WELL_KNOWN_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
    {
        return Some(found);
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(BINARY_NAME))
            .find(|candidate| candidate.is_file())
    })
}

/// Version reported by `tesseract --version`.
pub fn tesseract_version(binary: &Path) -> Result<String, OcrError> {
    let output = Command::new(binary)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::Spawn(format!("{}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(OcrError::Engine {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // Older builds print the banner on stderr
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

fn parse_version(banner: &str) -> Option<String> {
    banner
        .lines()
        .find(|line| line.trim_start().starts_with("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}
