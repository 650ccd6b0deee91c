use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::Display;

pub const DEFAULT_WELCOME: &str = "Hi! Ask me anything about FARS accident data.";

pub const DEFAULT_SIMULATED_ANSWER: &str = "Based on the provided reports, one relevant incident is ST_CASE 12345. \
This was a fatal accident in the rain involving a 17-year-old driver in a 2018 Honda Civic. \
The report indicates the injury severity for the driver was fatal.";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript and composer presentation
    pub ui: UiConfig,

    /// How questions reach the answer service
    pub answer: AnswerConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub welcome_text: String,
    pub placeholder: String,
    pub indicator_text: String,
    pub footer: String,
    /// Draft the input control starts with
    pub initial_draft: Option<String>,
    pub theme: ThemeConfig,
}

/// Colors as `#rrggbb` hex strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub accent_color: String,
    pub header_color: String,
    pub user_color: String,
    pub bot_color: String,
    pub error_color: String,
    pub muted_color: String,
}

/// Which answer service implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// Canned answer after a fixed delay
    Simulated,
    /// JSON over HTTP to a running backend
    Http,
}

/// Answer service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    pub backend: BackendKind,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub simulated_delay_ms: u64,
    pub simulated_answer: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            title: "FARS Conversational Query".to_string(),
            welcome_text: DEFAULT_WELCOME.to_string(),
            placeholder: "Type your query...".to_string(),
            indicator_text: "Analyzing data".to_string(),
            footer: "Supported by the Fatality Analysis Reporting System (FARS)".to_string(),
            initial_draft: None,
            theme: ThemeConfig::default(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig {
            accent_color: "#CF5A00".to_string(),
            header_color: "#630031".to_string(),
            user_color: "#CF5A00".to_string(),
            bot_color: "#B3567F".to_string(),
            error_color: "#E04B4B".to_string(),
            muted_color: "#999999".to_string(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        AnswerConfig {
            backend: BackendKind::Simulated,
            endpoint: "http://127.0.0.1:5001/api/chat".to_string(),
            timeout_secs: 30,
            max_retries: 1,
            retry_backoff_ms: 500,
            simulated_delay_ms: 1500,
            simulated_answer: DEFAULT_SIMULATED_ANSWER.to_string(),
        }
    }
}

impl AnswerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

/// `~/.fars-chat`, falling back to the working directory
pub fn app_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fars-chat")
}

pub fn default_config_path() -> PathBuf {
    app_home().join("config.toml")
}

impl Config {
    /// Load configuration from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .context("Failed to write config file")?;
        Ok(())
    }
}
