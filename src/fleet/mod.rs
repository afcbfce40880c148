//! 钱包舰队编排：准备、注资、swarm、余额刷新、重置与导出。
//!
//! 所有状态集中在 [`FleetOrchestrator`] 中，展示层通过
//! [`FleetOrchestrator::subscribe`] 订阅 [`FleetEvent`]，不直接持有状态。

pub mod error;
pub mod events;
pub mod export;
pub mod journal;
pub mod orchestrator;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::FleetError;
pub use events::{EventBus, FleetEvent};
pub use export::export_csv;
pub use journal::{Journal, LogEntry, Severity};
pub use orchestrator::{FleetOrchestrator, FleetSettings, parse_payload};
pub use types::{
    FleetSource, FleetStats, FleetStatsSnapshot, FundReport, OperationOutcome, SwarmReport,
    WalletAccount, WalletStatus,
};
