use alloy::primitives::Address;
use parking_lot::Mutex;

use super::journal::LogEntry;
use super::types::{FleetStatsSnapshot, WalletStatus};
use crate::chain::{TxHandle, TxReference};

/// 编排器对外发布的事件，日志面板、控制台仪表盘与测试均可独立订阅。
#[derive(Debug, Clone)]
pub enum FleetEvent {
    Log(LogEntry),
    FleetPrepared {
        wallets: Vec<Address>,
    },
    WalletFunded {
        index: usize,
        address: Address,
        reference: TxReference,
    },
    FundingFailed {
        index: usize,
        address: Address,
        reason: String,
    },
    TransactionConfirmed {
        index: usize,
        nonce: u64,
        reference: TxReference,
    },
    TransactionFailed {
        index: usize,
        nonce: u64,
        hash: Option<TxHandle>,
        reason: String,
    },
    WalletStatusChanged {
        index: usize,
        status: WalletStatus,
    },
    BalanceUpdated {
        index: usize,
        balance: String,
    },
    StatsUpdated(FleetStatsSnapshot),
    FleetReset,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<flume::Sender<FleetEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> flume::Receiver<FleetEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// 投递给所有订阅者，顺带清理已断开的接收端。
    pub fn publish(&self, event: FleetEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
