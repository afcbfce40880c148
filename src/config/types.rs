use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CeloshipConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub funder: FunderConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "super::default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "super::default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "super::default_explorer_url")]
    pub explorer_url: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingProfile {
    #[default]
    Lean,
    Verbose,
}

impl LoggingProfile {
    pub fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "super::default_logging_profile")]
    pub profile: LoggingProfile,
    #[serde(default = "super::default_timezone_offset_hours")]
    pub timezone_offset_hours: i8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "super::default_prometheus_listen")]
    pub listen: String,
}

/// 注资钱包；私钥可由 `CELOSHIP_FUNDER_KEY` 覆盖。
#[derive(Clone, Deserialize)]
pub struct FunderConfig {
    #[serde(default)]
    pub private_key: String,
    #[serde(default = "super::default_fund_amount")]
    pub amount: String,
}

impl fmt::Debug for FunderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.private_key.trim().is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("FunderConfig")
            .field("private_key", &key)
            .field("amount", &self.amount)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FleetMode {
    #[default]
    Generate,
    Import,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub mode: FleetMode,
    #[serde(default = "super::default_wallet_count")]
    pub count: usize,
    #[serde(default)]
    pub import_path: Option<PathBuf>,
    #[serde(default)]
    pub export_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwarmConfig {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default = "super::default_tx_per_wallet")]
    pub tx_per_wallet: u32,
    #[serde(default = "super::default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "super::default_confirmations")]
    pub confirmations: u64,
    #[serde(default = "super::default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "super::default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "super::default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    #[serde(default = "super::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Gemini 顾问；`api_key` 可由 `GEMINI_API_KEY` 覆盖。
#[derive(Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "super::default_advisor_model")]
    pub model: String,
    #[serde(default = "super::default_advisor_base_url")]
    pub base_url: String,
    #[serde(default = "super::default_advisor_timeout_ms")]
    pub timeout_ms: u64,
}

impl fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enable: bool,
}
