//! Settings document structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory name used under the platform configuration root.
pub const APP_DIR_NAME: &str = "TrueHDRConverter";

/// File name of the native settings document.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Highest accepted start counter.
pub const MAX_START_COUNTER: u32 = 999_999;

/// Widest fixed zero-fill accepted for the shot counter.
pub const MAX_ZERO_FILL_DIGITS: u32 = 9;

/// Highest encoder quality value.
pub const MAX_QUALITY: u32 = 100;

/// Error type for settings operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading or writing the settings file
    Io(io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// JSON parsing or serialization error
    Json(serde_json::Error),
    /// TOML serialization error
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access settings file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse settings: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to process JSON settings: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize settings: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// How the shot counter is padded with leading zeros
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZeroFillMode {
    /// Width is the number of digits of the last shot number
    #[default]
    #[serde(alias = "Auto")]
    Auto,
    /// Width is `zero_fill_digits`
    #[serde(alias = "Manual")]
    Manual,
}

/// Per-codec enable switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodecToggles {
    #[serde(default = "default_true")]
    pub jpeg: bool,
    #[serde(default = "default_true")]
    pub jpegxl: bool,
    #[serde(default = "default_true")]
    pub heic: bool,
    #[serde(default = "default_true")]
    pub avif: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CodecToggles {
    fn default() -> Self {
        Self {
            jpeg: true,
            jpegxl: true,
            heic: true,
            avif: true,
        }
    }
}

/// Per-codec quality values (0-100)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodecQualities {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg: u32,
    #[serde(default = "default_high_quality")]
    pub jpegxl: u32,
    #[serde(default = "default_high_quality")]
    pub heic: u32,
    #[serde(default = "default_high_quality")]
    pub avif: u32,
}

fn default_jpeg_quality() -> u32 {
    95
}

fn default_high_quality() -> u32 {
    99
}

impl Default for CodecQualities {
    fn default() -> Self {
        Self {
            jpeg: default_jpeg_quality(),
            jpegxl: default_high_quality(),
            heic: default_high_quality(),
            avif: default_high_quality(),
        }
    }
}

/// The settings document.
///
/// A flat key-value document. Every key is optional; missing keys take the
/// built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Give staged files new names; when false they keep their original stems
    pub rename_enabled: bool,
    /// Text placed before the shot number in every output name
    pub prefix: String,
    /// Whether shot numbers appear in output names at all
    pub counter_enabled: bool,
    /// Number given to the first shot
    pub start_counter: u32,
    /// Whether shot numbers are padded with leading zeros
    pub zero_fill_enabled: bool,
    pub zero_fill_mode: ZeroFillMode,
    /// Fixed padding width used in manual mode (1-9)
    pub zero_fill_digits: u32,
    /// Encode SDR shots
    pub sdr_enabled: bool,
    /// Encode HDR shots
    pub hdr_enabled: bool,
    /// Encoder processes allowed to run at once (0 = auto-derive)
    pub max_concurrent_jobs: u32,
    /// Directory processed by the previous run
    pub last_input_dir: Option<PathBuf>,
    pub codec_enabled: CodecToggles,
    pub codec_quality: CodecQualities,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rename_enabled: true,
            prefix: "Image_".to_string(),
            counter_enabled: true,
            start_counter: 1,
            zero_fill_enabled: true,
            zero_fill_mode: ZeroFillMode::Auto,
            zero_fill_digits: 1,
            sdr_enabled: true,
            hdr_enabled: true,
            max_concurrent_jobs: 0,
            last_input_dir: None,
            codec_enabled: CodecToggles::default(),
            codec_quality: CodecQualities::default(),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

impl Settings {
    /// Default settings location: `<config dir>/TrueHDRConverter/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Parse settings from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Parse settings from a JSON string
    pub fn parse_json(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from a file and sanitize them
    ///
    /// Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut settings = if is_json(path) {
            Self::parse_json(&content)?
        } else {
            Self::parse_toml(&content)?
        };
        for warning in settings.sanitize() {
            tracing::warn!("{}: {}", path.display(), warning);
        }
        Ok(settings)
    }

    /// Clamp out-of-range values back into their accepted ranges
    ///
    /// Returns one message per adjusted field.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.prefix.is_empty() {
            self.prefix = Settings::default().prefix;
            warnings.push(format!("prefix empty; using default {:?}", self.prefix));
        }

        if self.start_counter > MAX_START_COUNTER {
            warnings.push(format!(
                "start_counter {} out of range; clamping to 0-{}",
                self.start_counter, MAX_START_COUNTER
            ));
            self.start_counter = MAX_START_COUNTER;
        }

        if !(1..=MAX_ZERO_FILL_DIGITS).contains(&self.zero_fill_digits) {
            let clamped = self.zero_fill_digits.clamp(1, MAX_ZERO_FILL_DIGITS);
            warnings.push(format!(
                "zero_fill_digits {} out of range; clamping to {}",
                self.zero_fill_digits, clamped
            ));
            self.zero_fill_digits = clamped;
        }

        let qualities = [
            ("jpeg", &mut self.codec_quality.jpeg),
            ("jpegxl", &mut self.codec_quality.jpegxl),
            ("heic", &mut self.codec_quality.heic),
            ("avif", &mut self.codec_quality.avif),
        ];
        for (name, value) in qualities {
            if *value > MAX_QUALITY {
                warnings.push(format!(
                    "{}_quality {} out of range; clamping to 0-{}",
                    name, value, MAX_QUALITY
                ));
                *value = MAX_QUALITY;
            }
        }

        warnings
    }

    /// Apply environment variable overrides to the settings
    ///
    /// Overrides the following values if environment variables are set:
    /// - TRUEHDR_PREFIX -> prefix
    /// - TRUEHDR_START_COUNTER -> start_counter
    /// - TRUEHDR_ZERO_FILL_DIGITS -> zero_fill_digits (also selects manual mode)
    /// - TRUEHDR_MAX_CONCURRENT_JOBS -> max_concurrent_jobs
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("TRUEHDR_PREFIX") {
            if !val.is_empty() {
                self.prefix = val;
            }
        }

        if let Ok(val) = env::var("TRUEHDR_START_COUNTER") {
            if let Ok(start) = val.parse::<u32>() {
                self.start_counter = start;
            }
        }

        if let Ok(val) = env::var("TRUEHDR_ZERO_FILL_DIGITS") {
            if let Ok(digits) = val.parse::<u32>() {
                self.zero_fill_enabled = true;
                self.zero_fill_mode = ZeroFillMode::Manual;
                self.zero_fill_digits = digits;
            }
        }

        if let Ok(val) = env::var("TRUEHDR_MAX_CONCURRENT_JOBS") {
            if let Ok(jobs) = val.parse::<u32>() {
                self.max_concurrent_jobs = jobs;
            }
        }
    }

    /// Load settings from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut settings = Self::load_from_file(path)?;
        settings.apply_env_overrides();
        settings.sanitize();
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the document is absent or malformed
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}; using defaults", path.display());
                Self::defaults_with_env()
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load settings from {}: {}; using defaults",
                    path.display(),
                    e
                );
                Self::defaults_with_env()
            }
        }
    }

    fn defaults_with_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings.sanitize();
        settings
    }

    /// Write the settings document, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };
        fs::write(path, content)?;
        Ok(())
    }
}
