use std::path::PathBuf;

use anyhow::{Result, anyhow};

/// Runtime configuration, read once from the environment at startup.
///
/// `.env` is loaded by `main` (via dotenvy) before this is constructed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    /// Run Chrome without a window. Off by default so a watching human can
    /// follow the agent, matching the original harness.
    pub headless: bool,
    /// Safety bound on decide/act cycles per run.
    pub max_cycles: u32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieve_top_k: usize,
    pub db_path: PathBuf,
    /// Where run artifacts and generated CSV reports land.
    pub reports_dir: PathBuf,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            headless: false,
            max_cycles: 25,
            chunk_size: 200,
            chunk_overlap: 20,
            retrieve_top_k: 4,
            db_path: PathBuf::from("test_results.db"),
            reports_dir: PathBuf::from("tmp"),
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY not set in environment"))?,
            openai_base_url: env_or("OPENAI_BASE_URL", &defaults.openai_base_url),
            headless: env_flag("AGENT_HEADLESS", defaults.headless),
            max_cycles: env_parsed("AGENT_MAX_CYCLES", defaults.max_cycles)?,
            chunk_size: env_parsed("AGENT_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: env_parsed("AGENT_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            retrieve_top_k: env_parsed("AGENT_RETRIEVE_TOP_K", defaults.retrieve_top_k)?,
            db_path: PathBuf::from(env_or("AGENT_DB_PATH", "test_results.db")),
            reports_dir: PathBuf::from(env_or("AGENT_REPORTS_DIR", "tmp")),
            bind_addr: env_or("AGENT_BIND_ADDR", &defaults.bind_addr),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow!("invalid value for {key}: {value}")),
        Err(_) => Ok(default),
    }
}
