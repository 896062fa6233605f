use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Client configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub query_stale: Duration,
    pub query_retry: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("APPLYTRACK_API_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let data_dir = match lookup("APPLYTRACK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(),
        };

        let downloads_dir = match lookup("APPLYTRACK_DOWNLOADS_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => data_dir.join("downloads"),
        };

        let query_stale_secs = match lookup("APPLYTRACK_QUERY_STALE_SECS") {
            Some(v) => v
                .parse::<u64>()
                .context("APPLYTRACK_QUERY_STALE_SECS must be a whole number of seconds")?,
            None => 30,
        };

        let query_retry = match lookup("APPLYTRACK_QUERY_RETRY") {
            Some(v) => v
                .parse::<u32>()
                .context("APPLYTRACK_QUERY_RETRY must be a non-negative integer")?,
            None => 1,
        };

        Ok(Config {
            api_base_url,
            data_dir,
            downloads_dir,
            query_stale: Duration::from_secs(query_stale_secs),
            query_retry,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory, or the working directory if there is no home
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "applytrack") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
