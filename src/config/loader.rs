use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::CeloshipConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["celoship.yaml", "config/celoship.yaml"];

pub const ENV_RPC_URL: &str = "CELOSHIP_RPC_URL";
pub const ENV_FUNDER_KEY: &str = "CELOSHIP_FUNDER_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// 按候选路径加载配置，找不到文件时使用默认值；最后叠加环境变量。
pub fn load_config(path: Option<PathBuf>) -> Result<CeloshipConfig, ConfigError> {
    let candidate_paths = match path {
        Some(p) => vec![p],
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    let mut config = None;
    for candidate in candidate_paths {
        if let Some(loaded) = try_load_file(&candidate)? {
            config = Some(loaded);
            break;
        }
    }

    let mut config = config.unwrap_or_default();
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

pub fn parse_config(path: &Path, contents: &str) -> Result<CeloshipConfig, ConfigError> {
    serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn try_load_file(path: &Path) -> Result<Option<CeloshipConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(path, &contents).map(Some)
}

/// 非空环境变量覆盖文件中的值。
pub fn apply_env_overrides<F>(config: &mut CeloshipConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    if let Some(url) = non_empty(ENV_RPC_URL) {
        config.global.rpc_url = url;
    }
    if let Some(key) = non_empty(ENV_FUNDER_KEY) {
        config.funder.private_key = key;
    }
    if let Some(key) = non_empty(ENV_GEMINI_API_KEY) {
        config.advisor.api_key = Some(key);
    }
}
