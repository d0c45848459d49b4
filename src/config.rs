use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Defaults shipped with the binary; checked by `build.rs`.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Markdown read when no input is configured.
pub const INPUT_FILE: &str = "submission-file.md";
/// PDF written when no output is configured.
pub const OUTPUT_FILE: &str = "submission-file.pdf";
/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "md2pdf.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub files: FilesConfig,
    pub page: PageConfig,
    pub fonts: FontsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Where to keep the intermediate HTML document, if anywhere.
    pub html: Option<PathBuf>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(INPUT_FILE),
            output: PathBuf::from(OUTPUT_FILE),
            html: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub paper: String,
    pub numbers: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            paper: "a4".to_string(),
            numbers: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontsConfig {
    pub system: bool,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self { system: true }
    }
}

impl Config {
    /// The defaults from `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Self::compiled_default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file, using defaults");
                return Self::compiled_default();
            }
        };
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                Self::compiled_default()
            }
        }
    }
}
