pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

use self::types as cfg;

pub(crate) fn default_rpc_url() -> String {
    "https://alfajores-forno.celo-testnet.org".to_string()
}

pub(crate) fn default_chain_id() -> u64 {
    44_787
}

pub(crate) fn default_explorer_url() -> String {
    "https://celo-alfajores.blockscout.com".to_string()
}

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_logging_profile() -> cfg::LoggingProfile {
    cfg::LoggingProfile::Lean
}

pub(crate) fn default_timezone_offset_hours() -> i8 {
    0
}

pub(crate) fn default_prometheus_listen() -> String {
    "0.0.0.0:9898".to_string()
}

pub(crate) fn default_fund_amount() -> String {
    "0.01".to_string()
}

pub(crate) fn default_wallet_count() -> usize {
    5
}

pub(crate) fn default_tx_per_wallet() -> u32 {
    5
}

pub(crate) fn default_gas_limit() -> u64 {
    100_000
}

pub(crate) fn default_confirmations() -> u64 {
    1
}

pub(crate) fn default_pacing_ms() -> u64 {
    500
}

pub(crate) fn default_settle_ms() -> u64 {
    5_000
}

pub(crate) fn default_confirm_timeout_ms() -> u64 {
    60_000
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    1_000
}

pub(crate) fn default_advisor_model() -> String {
    "gemini-2.5-flash".to_string()
}

pub(crate) fn default_advisor_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

pub(crate) fn default_advisor_timeout_ms() -> u64 {
    20_000
}

impl Default for cfg::CeloshipConfig {
    fn default() -> Self {
        Self {
            global: cfg::GlobalConfig::default(),
            funder: cfg::FunderConfig::default(),
            fleet: cfg::FleetConfig::default(),
            swarm: cfg::SwarmConfig::default(),
            advisor: cfg::AdvisorConfig::default(),
            dashboard: cfg::DashboardConfig::default(),
        }
    }
}

impl Default for cfg::GlobalConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            explorer_url: default_explorer_url(),
            logging: cfg::LoggingConfig::default(),
            prometheus: cfg::PrometheusConfig::default(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
            profile: default_logging_profile(),
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

impl Default for cfg::PrometheusConfig {
    fn default() -> Self {
        Self {
            enable: false,
            listen: default_prometheus_listen(),
        }
    }
}

impl Default for cfg::FunderConfig {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            amount: default_fund_amount(),
        }
    }
}

impl Default for cfg::FleetConfig {
    fn default() -> Self {
        Self {
            mode: cfg::FleetMode::default(),
            count: default_wallet_count(),
            import_path: None,
            export_path: None,
        }
    }
}

impl Default for cfg::SwarmConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            payload: String::new(),
            tx_per_wallet: default_tx_per_wallet(),
            gas_limit: default_gas_limit(),
            confirmations: default_confirmations(),
            pacing_ms: default_pacing_ms(),
            settle_ms: default_settle_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for cfg::AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_advisor_model(),
            base_url: default_advisor_base_url(),
            timeout_ms: default_advisor_timeout_ms(),
        }
    }
}
