// Extraction engine configuration and secrets management
//
// API keys are looked up in:
// 1. System keychain (preferred)
// 2. BITACORA_<PROVIDER>_KEY
// 3. The provider's conventional variable (GOOGLE_API_KEY, OPENAI_API_KEY)
//
// Keys are NEVER stored in settings.json and never logged.

use std::env;

use serde::Serialize;

use crate::settings::{AIProvider, AISettings, Settings};

/// Service name for keychain storage
const KEYCHAIN_SERVICE: &str = "bitacora";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Keychain,
    Environment,
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

#[derive(Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
    /// Environment variable the key came from
    pub env_var: Option<String>,
}

impl std::fmt::Debug for KeyLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLookup")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("env_var", &self.env_var)
            .finish()
    }
}

/// Environment variable names checked for a provider, in order
pub fn env_var_names(provider: &str) -> Vec<String> {
    let mut names = vec![format!("BITACORA_{}_KEY", provider.to_uppercase())];
    match provider.to_lowercase().as_str() {
        "gemini" => {
            names.push("GOOGLE_API_KEY".to_string());
            names.push("GEMINI_API_KEY".to_string());
        }
        "openai" => names.push("OPENAI_API_KEY".to_string()),
        _ => {}
    }
    names
}

fn keychain_account(provider: &str) -> String {
    format!("ai/{}", provider.to_lowercase())
}

/// Get an API key for the specified provider
pub fn get_api_key(provider: &str) -> KeyLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup { key: Some(key), source: KeySource::Keychain, env_var: None };
            }
        }
    }

    for name in env_var_names(provider) {
        if let Ok(key) = env::var(&name) {
            if !key.trim().is_empty() {
                return KeyLookup { key: Some(key), source: KeySource::Environment, env_var: Some(name) };
            }
        }
    }

    KeyLookup { key: None, source: KeySource::None, env_var: None }
}

/// Store an API key in the system keychain
#[cfg(feature = "keychain")]
pub fn set_api_key(provider: &str, key: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider))
        .map_err(|e| format!("Failed to create keychain entry: {}", e))?;

    entry
        .set_password(key)
        .map_err(|e| format!("Failed to store key in keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn set_api_key(_provider: &str, _key: &str) -> Result<(), String> {
    Err("Keychain support not enabled. Set BITACORA_<PROVIDER>_KEY environment variable instead.".to_string())
}

/// Delete an API key from the system keychain
#[cfg(feature = "keychain")]
pub fn delete_api_key(provider: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider))
        .map_err(|e| format!("Failed to access keychain entry: {}", e))?;

    entry
        .delete_credential()
        .map_err(|e| format!("Failed to delete key from keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn delete_api_key(_provider: &str) -> Result<(), String> {
    Err("Keychain support not enabled.".to_string())
}

pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "test").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AIConfigStatus {
    /// provider = none
    Disabled,
    Ready,
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// The effective engine configuration, resolved from settings, flags and
/// the key store.
#[derive(Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub key_source: KeySource,
    pub status: AIConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

impl std::fmt::Debug for ResolvedAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAIConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("key_source", &self.key_source)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl ResolvedAIConfig {
    pub fn from_settings(settings: &AISettings) -> Self {
        Self::resolve(settings, get_api_key)
    }

    /// Resolution with an injectable key lookup
    pub fn resolve(settings: &AISettings, lookup: impl Fn(&str) -> KeyLookup) -> Self {
        let provider = settings.provider;
        let mut config = Self {
            provider,
            model: settings.effective_model().to_string(),
            endpoint: settings.effective_endpoint().trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs.max(1),
            temperature: settings.temperature,
            api_key: None,
            key_source: KeySource::None,
            status: AIConfigStatus::Disabled,
            blocking_reason: None,
        };

        if !provider.is_enabled() {
            config.blocking_reason = Some("Extraction provider is set to \"none\"".to_string());
            return config;
        }

        let found = lookup(provider.name());
        match found.key {
            Some(key) => {
                config.api_key = Some(key);
                config.key_source = found.source;
                config.status = AIConfigStatus::Ready;
            }
            None => {
                config.status = AIConfigStatus::MissingKey;
                config.blocking_reason = Some(format!(
                    "No API key found. Set via keychain or {}",
                    env_var_names(provider.name()).join(" / ")
                ));
            }
        }
        config
    }

    /// Load settings and resolve in one call
    pub fn load() -> Self {
        Self::from_settings(&Settings::load().ai)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

// ============================================================================
// Diagnostics (for `bitacora ai doctor`)
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AIDiagnostics {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub status: AIConfigStatus,
    pub key_present: bool,
    pub key_source: KeySource,
    pub keychain_available: bool,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
}

impl AIDiagnostics {
    pub fn from_resolved(config: &ResolvedAIConfig) -> Self {
        Self {
            provider: config.provider.name().to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            status: config.status,
            key_present: config.api_key.is_some(),
            key_source: config.key_source,
            keychain_available: keychain_available(),
            timeout_secs: config.timeout_secs,
            blocking_reason: config.blocking_reason.clone(),
        }
    }
}

impl std::fmt::Display for AIDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Extraction engine")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Provider:          {}", self.provider)?;
        writeln!(f, "Status:            {}", self.status.as_str())?;
        writeln!(f, "Model:             {}", self.model)?;
        writeln!(f, "Endpoint:          {}", self.endpoint)?;
        writeln!(f, "Timeout:           {}s", self.timeout_secs)?;
        writeln!(f, "Key present:       {}", if self.key_present { "yes" } else { "no" })?;
        writeln!(f, "Key source:        {}", self.key_source.as_str())?;
        writeln!(f, "Keychain available:{}", if self.keychain_available { "yes" } else { "no" })?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f, "Blocked:           {}", reason)?;
        }
        Ok(())
    }
}
