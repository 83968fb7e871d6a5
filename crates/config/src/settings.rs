// Application settings
// Loaded from ~/.config/bitacora/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Overrides the configuration directory (tests, portable installs).
pub const CONFIG_DIR_ENV: &str = "BITACORA_CONFIG_DIR";

/// Extraction engine provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// Extraction disabled; only offline `ingest` works
    None,
    /// Google Gemini generateContent API
    #[default]
    Gemini,
    /// OpenAI chat completions API
    #[serde(rename = "openai")]
    OpenAI,
}

impl AIProvider {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::Gemini => "gemini",
            AIProvider::OpenAI => "openai",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(AIProvider::None),
            "gemini" | "google" => Some(AIProvider::Gemini),
            "openai" => Some(AIProvider::OpenAI),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Gemini => "gemini-2.5-flash",
            AIProvider::OpenAI => "gpt-4o",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            AIProvider::OpenAI => "https://api.openai.com/v1",
        }
    }
}

/// Extraction engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    pub provider: AIProvider,

    /// Model identifier; empty = provider default
    pub model: String,

    /// API base URL; None = provider default
    pub endpoint: Option<String>,

    /// Upper bound on one extraction call
    pub timeout_secs: u64,

    pub temperature: f32,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::Gemini,
            model: String::new(),
            endpoint: None,
            timeout_secs: 120,
            temperature: 0.1,
        }
    }
}

impl AISettings {
    /// Get the effective model (user-specified or provider default)
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}

/// Which extraction schema descriptor to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Built-in preset: "named", "short_codes" or "positional"
    pub preset: String,
    /// Custom TOML descriptor; takes precedence over `preset`
    pub path: Option<PathBuf>,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self { preset: "named".to_string(), path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub sheet_name: String,
    /// Dated file names are `<file_prefix>_<YYYY-MM-DD>.xlsx`
    pub file_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { sheet_name: "Bitacora".to_string(), file_prefix: "Bitacora".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ai: AISettings,
    pub schema: SchemaSettings,
    pub export: ExportSettings,
}

const DEFAULT_FILE: &str = r#"{
    // Extraction engine
    // Provider options: "gemini", "openai", "none"
    // API keys are stored in system keychain or environment, not in this file
    "ai": {
        "provider": "gemini",
        "model": "",
        "endpoint": null,
        "timeout_secs": 120,
        "temperature": 0.1
    },

    // Column schema used for the prompt and for mapping responses
    // Presets: "named", "short_codes", "positional"; "path" points at a TOML descriptor
    "schema": {
        "preset": "named",
        "path": null
    },

    // Spreadsheet export
    "export": {
        "sheet_name": "Bitacora",
        "file_prefix": "Bitacora"
    }
}
"#;

impl Settings {
    /// `$BITACORA_CONFIG_DIR`, else the platform config dir + `bitacora`
    pub fn config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bitacora")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Default location of the editing session file
    pub fn default_session_path() -> PathBuf {
        Self::config_dir().join("session.json")
    }

    /// Load settings from disk, falling back to defaults. Writes a commented
    /// default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. Never fails: problems are logged and
    /// defaults are used.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "error parsing settings, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "error reading settings, using defaults");
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(error = %e, "error creating config directory");
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            warn!(error = %e, "error writing default settings.json");
        }
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed = Settings::parse(DEFAULT_FILE).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed = Settings::parse(
            r#"{
    // only the provider
    "ai": { "provider": "openai" }
}"#,
        )
        .unwrap();
        assert_eq!(parsed.ai.provider, AIProvider::OpenAI);
        assert_eq!(parsed.ai.timeout_secs, 120);
        assert_eq!(parsed.ai.effective_model(), "gpt-4o");
        assert_eq!(parsed.export.sheet_name, "Bitacora");
    }

    #[test]
    fn test_effective_model_and_endpoint() {
        let mut ai = AISettings::default();
        assert_eq!(ai.effective_model(), "gemini-2.5-flash");
        assert!(ai.effective_endpoint().starts_with("https://generativelanguage"));

        ai.model = "gemini-2.5-pro".into();
        ai.endpoint = Some("http://127.0.0.1:9999".into());
        assert_eq!(ai.effective_model(), "gemini-2.5-pro");
        assert_eq!(ai.effective_endpoint(), "http://127.0.0.1:9999");

        ai.endpoint = Some(String::new());
        assert!(ai.effective_endpoint().starts_with("https://"));
    }

    #[test]
    fn test_load_from_bad_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.schema.preset = "short_codes".into();
        settings.export.file_prefix = "Caldera2".into();
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(AIProvider::from_name("Gemini"), Some(AIProvider::Gemini));
        assert_eq!(AIProvider::from_name("openai"), Some(AIProvider::OpenAI));
        assert_eq!(AIProvider::from_name("anthropic"), None);
        assert!(!AIProvider::None.is_enabled());
    }
}
