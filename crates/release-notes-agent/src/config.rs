use std::path::PathBuf;

use anyhow::{Context, Result};
use rig::providers::openai;
use tracing::debug;

pub const REPO_ENV_VAR: &str = "RELNOTES_REPO_PATH";
pub const REFERENCE_ENV_VAR: &str = "RELNOTES_REFERENCE_PATH";
pub const MODEL_ENV_VAR: &str = "RELNOTES_MODEL";

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_MAX_TURNS: usize = 8;
const DEFAULT_TEMPERATURE: f64 = 0.3;
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Configuration errors surfaced before any git or model work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo_path: Option<PathBuf>,
    pub reference_path: Option<PathBuf>,
    pub model: Option<String>,
}

/// Top-level configuration for one drafting run.
#[derive(Debug, Clone)]
pub struct NotesConfig {
    pub endpoint: Endpoint,
    /// Repository whose history is diffed.
    pub repo_path: PathBuf,
    /// Published release notes used as the style exemplar.
    pub reference_path: PathBuf,
    /// Replaces the built-in instruction text when set.
    pub instructions_path: Option<PathBuf>,
    /// Retries for transient upstream errors.
    pub max_retries: u32,
    /// Tool-calling turn budget in agentic mode.
    pub max_turns: usize,
    /// Cap on the full-diff section of the report. 0 = unlimited.
    pub max_diff_chars: usize,
    /// Cap on the style exemplar. 0 = unlimited.
    pub max_reference_chars: usize,
    pub temperature: f64,
    /// Wall-clock budget for the model call. 0 = no limit.
    pub timeout_secs: u64,
}

/// Load `.env` from the working directory or its parents. Variables already
/// set in the environment win.
pub fn load_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(_) => debug!("No .env file found"),
    }
}

/// Settings for diff-only runs, which need no model or reference document.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    pub repo_path: PathBuf,
    /// Cap on the full-diff section of the report. 0 = unlimited.
    pub max_diff_chars: usize,
}

impl DiffConfig {
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), overrides)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            repo_path: repo_path(&lookup, overrides)?,
            max_diff_chars: max_diff_chars(&lookup),
        })
    }
}

/// Variable value, with blank values treated as unset.
fn non_blank(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn repo_path(
    lookup: &impl Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<PathBuf, ConfigError> {
    match &overrides.repo_path {
        Some(p) => Ok(p.clone()),
        None => non_blank(lookup, REPO_ENV_VAR)
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingVar(REPO_ENV_VAR)),
    }
}

fn max_diff_chars(lookup: &impl Fn(&str) -> Option<String>) -> usize {
    non_blank(lookup, "RELNOTES_MAX_DIFF_CHARS")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

impl NotesConfig {
    /// Read the process environment.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), overrides)
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| non_blank(&lookup, name);

        let repo_path = repo_path(&lookup, overrides)?;
        let reference_path = match &overrides.reference_path {
            Some(p) => p.clone(),
            None => var(REFERENCE_ENV_VAR)
                .map(PathBuf::from)
                .ok_or(ConfigError::MissingVar(REFERENCE_ENV_VAR))?,
        };

        let endpoint = Endpoint {
            url: var("RELNOTES_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            api_key: var("RELNOTES_API_KEY")
                .or_else(|| var("OPENAI_API_KEY"))
                .unwrap_or_else(|| "not-needed".into()),
            model: overrides
                .model
                .clone()
                .or_else(|| var(MODEL_ENV_VAR))
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
        };

        Ok(Self {
            endpoint,
            repo_path,
            reference_path,
            instructions_path: var("RELNOTES_INSTRUCTIONS_PATH").map(PathBuf::from),
            max_retries: var("RELNOTES_MAX_RETRIES")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
            max_turns: var("RELNOTES_MAX_TURNS")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_TURNS),
            max_diff_chars: max_diff_chars(&lookup),
            max_reference_chars: var("RELNOTES_MAX_REFERENCE_CHARS")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0),
            temperature: var("RELNOTES_TEMPERATURE")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|t| (0.0..=2.0).contains(t))
                .unwrap_or(DEFAULT_TEMPERATURE),
            timeout_secs: var("RELNOTES_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Build the rig client for the configured endpoint.
pub fn build_client(endpoint: &Endpoint) -> Result<openai::CompletionsClient> {
    openai::CompletionsClient::builder()
        .api_key(&endpoint.api_key)
        .base_url(&endpoint.url)
        .build()
        .with_context(|| format!("Failed to build completions client for {}", endpoint.url))
}

/// Check if an inference endpoint is reachable (GET `<url>/models`).
pub async fn check_endpoint(url: &str, api_key: Option<&str>) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    let mut req = reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5));
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }
    match req.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
