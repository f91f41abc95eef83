//! Configuration discovery and loading.
//!
//! Settings come from a `.tangent.toml` found by walking up from CWD,
//! overlaid with CLI flags and environment variables. The merged result is
//! an immutable [`Config`] built once at startup.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Merged, effective configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_tool_depth: usize,
    pub log_enabled: bool,
}

impl Config {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        env::var(&self.api_key_env)
            .with_context(|| format!("API key environment variable {} not set", self.api_key_env))
    }
}

/// Contents of `.tangent.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_tool_depth")]
    pub max_tool_depth: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_tool_depth: default_max_tool_depth(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_tool_depth() -> usize {
    8
}

/// Discover `.tangent.toml` by walking up from CWD. Falls back to defaults
/// when no file exists anywhere up the tree.
pub fn discover() -> Result<FileConfig> {
    let cwd = env::current_dir()?;
    discover_from(&cwd)
}

fn discover_from(start: &Path) -> Result<FileConfig> {
    let mut current = start;
    loop {
        let config_path = current.join(".tangent.toml");
        if config_path.is_file() {
            return load_file(&config_path);
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(FileConfig::default()),
        }
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// Write a default `.tangent.toml` in the current directory. Idempotent;
/// an existing file is left alone.
pub fn init() -> Result<PathBuf> {
    let cwd = env::current_dir()?;
    init_in_dir(&cwd)
}

fn init_in_dir(dir: &Path) -> Result<PathBuf> {
    let config_path = dir.join(".tangent.toml");
    if config_path.exists() {
        bail!(".tangent.toml already exists at {}", config_path.display());
    }
    let default_config = r#"# base_url = "https://api.openai.com/v1"
# model = "gpt-4o-mini"
# api_key_env = "OPENAI_API_KEY"
# temperature = 0.7
# max_tokens = 4096
# max_tool_depth = 8
"#;
    fs::write(&config_path, default_config).context("writing .tangent.toml")?;
    Ok(config_path)
}
