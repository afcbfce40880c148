use std::fmt;

use alloy::primitives::Address;
use parking_lot::Mutex;
use serde::Serialize;

use crate::chain::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Idle,
    Funding,
    Sending,
    Error,
    Done,
}

impl WalletStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Funding => 1,
            Self::Sending => 2,
            Self::Error => 3,
            Self::Done => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Funding => "funding",
            Self::Sending => "sending",
            Self::Error => "error",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 舰队中的一个钱包。
#[derive(Clone)]
pub struct WalletAccount {
    pub account: Account,
    pub balance: String,
    pub tx_count: u64,
    pub status: WalletStatus,
}

impl WalletAccount {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            balance: "0".to_string(),
            tx_count: 0,
            status: WalletStatus::Idle,
        }
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// 单次 swarm 内状态只能前进；返回状态是否真的发生变化。
    pub fn advance_status(&mut self, next: WalletStatus) -> bool {
        if next.rank() < self.status.rank() || next == self.status {
            return false;
        }
        self.status = next;
        true
    }
}

impl fmt::Debug for WalletAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletAccount")
            .field("address", &self.address())
            .field("balance", &self.balance)
            .field("tx_count", &self.tx_count)
            .field("status", &self.status)
            .finish()
    }
}

/// 每个钱包一把锁，只有该钱包自己的任务写入。
pub(crate) type WalletSlot = Mutex<WalletAccount>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetStatsSnapshot {
    pub total_tx: u64,
    pub successful_tx: u64,
    pub failed_tx: u64,
}

/// 聚合计数；三个字段在同一把锁下更新，保证 total = success + failed。
#[derive(Debug, Default)]
pub struct FleetStats {
    inner: Mutex<FleetStatsSnapshot>,
}

impl FleetStats {
    pub fn reset(&self) -> FleetStatsSnapshot {
        let mut guard = self.inner.lock();
        *guard = FleetStatsSnapshot::default();
        *guard
    }

    pub fn record_success(&self) -> FleetStatsSnapshot {
        let mut guard = self.inner.lock();
        guard.total_tx += 1;
        guard.successful_tx += 1;
        *guard
    }

    pub fn record_failure(&self) -> FleetStatsSnapshot {
        let mut guard = self.inner.lock();
        guard.total_tx += 1;
        guard.failed_tx += 1;
        *guard
    }

    pub fn snapshot(&self) -> FleetStatsSnapshot {
        *self.inner.lock()
    }
}

/// 舰队来源：随机生成或导入私钥。
#[derive(Clone)]
pub enum FleetSource {
    Generate { count: usize },
    Import { keys: Vec<String> },
}

impl FleetSource {
    /// 按行拆分导入文本，保留原始行，空行在导入时跳过。
    pub fn from_key_lines(raw: &str) -> Self {
        Self::Import {
            keys: raw.lines().map(str::to_string).collect(),
        }
    }
}

impl fmt::Debug for FleetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate { count } => f.debug_struct("Generate").field("count", count).finish(),
            Self::Import { keys } => f
                .debug_struct("Import")
                .field("lines", &keys.len())
                .finish(),
        }
    }
}

/// 操作在另一个注资 / swarm 进行中时被忽略。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome<T> {
    Completed(T),
    Busy,
}

impl<T> OperationOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Busy => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundReport {
    pub attempted: usize,
    pub funded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwarmReport {
    pub stats: FleetStatsSnapshot,
    pub wallets: usize,
    pub abandoned: usize,
}
