use crate::strings::DEFAULT_SYSTEM_INSTRUCTION;
use crate::theme::ThemeName;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Takes precedence over `api_key_env` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default)]
    pub theme: ThemeName,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            system_instruction: default_system_instruction(),
            theme: ThemeName::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the platform config directory, or defaults
    /// when there is none.
    pub fn load() -> Result<Self> {
        if let Some(proj_dirs) = ProjectDirs::from("uz", "legalai", "legalai") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
