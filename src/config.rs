use crate::provider::google::{GenerationSettings, DEFAULT_MODEL};
use crate::provider::stub::StubScript;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables checked for the Gemini key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    pub static_dir: PathBuf,
    /// Directory searched for template overrides.
    pub templates_dir: PathBuf,
    /// SQLite file; defaults to the state directory.
    pub database: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("static"),
            templates_dir: PathBuf::from("templates"),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Whose portfolio this is; used in pages and the assistant persona.
    pub owner: String,
    pub title: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            owner: "Dhruvit".to_string(),
            title: None,
        }
    }
}

impl SiteConfig {
    pub fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("{} Portfolio", self.owner))
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// "google" or "stub".
    pub provider: String,
    pub model: String,
    pub context_path: PathBuf,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    /// Used only when neither key variable is set.
    pub api_key: Option<String>,
    pub stub: StubScript,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let defaults = GenerationSettings::default();
        Self {
            provider: "google".to_string(),
            model: DEFAULT_MODEL.to_string(),
            context_path: PathBuf::from("data/context.txt"),
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            max_retries: defaults.max_retries,
            api_key: None,
            stub: StubScript::default(),
        }
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("context_path", &self.context_path)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("stub", &self.stub)
            .finish()
    }
}

impl ChatConfig {
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            max_retries: self.max_retries,
        }
    }

    /// First non-empty key from the environment, then the config file.
    pub fn resolve_api_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        API_KEY_VARS
            .into_iter()
            .find_map(|name| env(name).filter(|v| !v.trim().is_empty()))
            .or_else(|| self.api_key.clone().filter(|v| !v.trim().is_empty()))
    }
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }

    /// An explicitly named file must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>, default_path: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_optional(path)?
                .with_context(|| format!("config file not found: {}", path.display())),
            None => Ok(Self::load_optional(default_path)?.unwrap_or_default()),
        }
    }
}
