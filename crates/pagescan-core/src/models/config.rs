//! Configuration structures for the extraction pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on concurrent recognition workers.
///
/// The recognition engine is the bottleneck, not the CPU: more workers than
/// this slow a run down instead of speeding it up.
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 200;

/// Quality/speed trade-off applied uniformly to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Grayscale bitmap, single-pass engine configuration.
    #[default]
    Fast,
    /// Full color bitmap, default engine configuration.
    Accurate,
}

impl Profile {
    /// Whether the rasterized page is reduced to a single channel.
    pub fn wants_grayscale(self) -> bool {
        matches!(self, Profile::Fast)
    }

    /// Engine arguments selected by this profile.
    pub fn engine_args(self) -> &'static [&'static str] {
        match self {
            Profile::Fast => &["--oem", "1", "--psm", "3", "-c", "tessedit_do_invert=0"],
            Profile::Accurate => &["--oem", "1", "--psm", "3"],
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Fast => write!(f, "fast"),
            Profile::Accurate => write!(f, "accurate"),
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Profile::Fast),
            "accurate" => Ok(Profile::Accurate),
            other => Err(ConfigError::UnknownVariant {
                kind: "profile",
                value: other.to_string(),
            }),
        }
    }
}

/// How pages are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Bounded worker pool; completion order is arbitrary.
    #[default]
    Concurrent,
    /// One page at a time, in index order.
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Concurrent => write!(f, "concurrent"),
            ExecutionMode::Sequential => write!(f, "sequential"),
        }
    }
}

/// Named presets combining resolution and profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// 200 DPI, fast profile.
    #[default]
    Speed,
    /// 250 DPI, fast profile.
    Balanced,
    /// 300 DPI, accurate profile.
    Accuracy,
}

impl Preset {
    pub fn dpi(self) -> u32 {
        match self {
            Preset::Speed => 200,
            Preset::Balanced => 250,
            Preset::Accuracy => 300,
        }
    }

    pub fn profile(self) -> Profile {
        match self {
            Preset::Speed | Preset::Balanced => Profile::Fast,
            Preset::Accuracy => Profile::Accurate,
        }
    }

    /// Overwrite the resolution and profile of `config`.
    pub fn apply(self, config: &mut ExtractionConfig) {
        config.dpi = self.dpi();
        config.profile = self.profile();
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speed" => Ok(Preset::Speed),
            "balanced" => Ok(Preset::Balanced),
            "accuracy" => Ok(Preset::Accuracy),
            other => Err(ConfigError::UnknownVariant {
                kind: "preset",
                value: other.to_string(),
            }),
        }
    }
}

/// Ordered, non-empty set of recognition language codes.
///
/// Written the way the engine expects it, e.g. `rus+eng`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageSet(Vec<String>);

impl LanguageSet {
    /// Build a set from individual codes, keeping first-seen order.
    pub fn new<I, S>(codes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut langs: Vec<String> = Vec::new();
        for code in codes {
            let code = code.into().trim().to_string();
            if code.is_empty() {
                continue;
            }
            if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidLanguage(code));
            }
            if !langs.contains(&code) {
                langs.push(code);
            }
        }

        if langs.is_empty() {
            return Err(ConfigError::EmptyLanguages);
        }
        Ok(Self(langs))
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self(vec!["rus".to_string(), "eng".to_string()])
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("+"))
    }
}

impl FromStr for LanguageSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(['+', ',']))
    }
}

impl TryFrom<String> for LanguageSet {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageSet> for String {
    fn from(langs: LanguageSet) -> Self {
        langs.to_string()
    }
}

/// Parameters shared by every page task of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Rendering resolution in dots per inch.
    pub dpi: u32,

    /// Recognition languages.
    pub languages: LanguageSet,

    /// Quality profile.
    pub profile: Profile,

    /// Concurrent or sequential scheduling.
    pub mode: ExecutionMode,

    /// Worker pool ceiling for concurrent runs.
    pub max_workers: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            languages: LanguageSet::default(),
            profile: Profile::default(),
            mode: ExecutionMode::default(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl ExtractionConfig {
    /// Start from a preset.
    pub fn from_preset(preset: Preset) -> Self {
        let mut config = Self::default();
        preset.apply(&mut config);
        config
    }

    pub fn with_languages(mut self, languages: LanguageSet) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Check the values a run relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dpi == 0 {
            return Err(ConfigError::InvalidDpi);
        }
        if self.languages.is_empty() {
            return Err(ConfigError::EmptyLanguages);
        }
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        Ok(())
    }
}

/// Recognition engine location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit path to the `tesseract` binary.
    pub binary_path: Option<PathBuf>,

    /// Value for `TESSDATA_PREFIX`.
    pub tessdata_path: Option<PathBuf>,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Name prefix of per-page archive entries.
    pub archive_entry_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_entry_prefix: "page".to_string(),
        }
    }
}

/// Main configuration for pagescan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagescanConfig {
    pub extraction: ExtractionConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
}

impl PagescanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
