//! Client configuration: which GraphQL endpoint to talk to and how long to
//! wait for it.
//!
//! Resolution order, strongest first: CLI flag, `FLAMESIM_GRAPHQL_ENDPOINT`
//! environment variable, `~/.flamesim/config.yaml`, built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENDPOINT_ENV_VAR: &str = "FLAMESIM_GRAPHQL_ENDPOINT";

fn default_endpoint() -> String {
    "http://localhost:8080/graphql".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `~/.flamesim`, home for the config file and session logs.
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".flamesim"))
}

fn config_file() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("config.yaml"))
}

impl Config {
    /// Loads configuration with the CLI values taking precedence.
    pub fn load(cli_endpoint: Option<String>, cli_timeout_secs: Option<u64>) -> Result<Self> {
        let file_config = match config_file() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            _ => Config::default(),
        };
        let env_endpoint = std::env::var(ENDPOINT_ENV_VAR).ok();
        Ok(resolve(file_config, env_endpoint, cli_endpoint, cli_timeout_secs))
    }
}

/// Pure precedence logic, separated from env/file access for testing.
fn resolve(
    file_config: Config,
    env_endpoint: Option<String>,
    cli_endpoint: Option<String>,
    cli_timeout_secs: Option<u64>,
) -> Config {
    Config {
        endpoint: cli_endpoint
            .or(env_endpoint)
            .unwrap_or(file_config.endpoint),
        timeout_secs: cli_timeout_secs.unwrap_or(file_config.timeout_secs),
    }
}
