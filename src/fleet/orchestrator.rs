use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use alloy::primitives::{Bytes, U256};
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::error::FleetError;
use super::events::{EventBus, FleetEvent};
use super::journal::{Journal, LogEntry};
use super::types::{
    FleetSource, FleetStats, FleetStatsSnapshot, FundReport, OperationOutcome, SwarmReport,
    WalletAccount, WalletSlot, WalletStatus,
};
use crate::chain::units::parse_native_amount;
use crate::chain::{Account, ChainClient, ChainError, ContractCall, TxHandle, TxReference};
use crate::monitoring::events;

/// 注资确认数固定为 1。
const FUNDING_CONFIRMATIONS: u64 = 1;

/// 编排器运行参数，由配置文件解析而来。
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub source: FleetSource,
    pub fund_amount: String,
    pub target: String,
    pub payload: String,
    pub tx_per_wallet: u32,
    pub gas_limit: u64,
    pub confirmations: u64,
    pub pacing: Duration,
    pub settle_delay: Duration,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            source: FleetSource::Generate { count: 5 },
            fund_amount: "0.01".to_string(),
            target: String::new(),
            payload: String::new(),
            tx_per_wallet: 5,
            gas_limit: 100_000,
            confirmations: 1,
            pacing: Duration::from_millis(500),
            settle_delay: Duration::from_secs(5),
        }
    }
}

type Fleet = Arc<Vec<WalletSlot>>;

/// 钱包舰队编排器：准备、注资、swarm、余额刷新与重置。
pub struct FleetOrchestrator<C: ChainClient> {
    client: Arc<C>,
    settings: FleetSettings,
    fleet: RwLock<Fleet>,
    stats: FleetStats,
    bus: Arc<EventBus>,
    journal: Journal,
    in_flight: AtomicBool,
}

/// 持有期间其它注资 / swarm / 重置均被拒绝。
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum WalletRun {
    Completed,
    Abandoned,
}

impl<C: ChainClient> FleetOrchestrator<C> {
    pub fn new(client: Arc<C>, settings: FleetSettings) -> Self {
        let bus = Arc::new(EventBus::default());
        Self {
            client,
            settings,
            fleet: RwLock::new(Arc::new(Vec::new())),
            stats: FleetStats::default(),
            journal: Journal::new(Arc::clone(&bus)),
            bus,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &FleetSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> flume::Receiver<FleetEvent> {
        self.bus.subscribe()
    }

    pub fn wallets(&self) -> Vec<WalletAccount> {
        self.current_fleet()
            .iter()
            .map(|slot| slot.lock().clone())
            .collect()
    }

    pub fn stats(&self) -> FleetStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.journal.entries()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn current_fleet(&self) -> Fleet {
        Arc::clone(&self.fleet.read())
    }

    fn try_begin(&self, operation: &'static str) -> Option<InFlightGuard<'_>> {
        match self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(InFlightGuard {
                flag: &self.in_flight,
            }),
            Err(_) => {
                warn!(
                    target: "fleet",
                    operation,
                    "已有注资或 swarm 正在进行，忽略本次请求"
                );
                None
            }
        }
    }

    /// 生成或导入钱包，整体替换当前舰队。
    pub fn prepare_fleet(
        &self,
        source: &FleetSource,
    ) -> Result<OperationOutcome<usize>, FleetError> {
        let Some(_guard) = self.try_begin("prepare") else {
            return Ok(OperationOutcome::Busy);
        };
        self.prepare_locked(source).map(OperationOutcome::Completed)
    }

    fn prepare_locked(&self, source: &FleetSource) -> Result<usize, FleetError> {
        let (mode, accounts, skipped) = match source {
            FleetSource::Generate { count } => {
                if *count == 0 {
                    self.journal.error("钱包数量必须大于 0", None);
                    return Err(FleetError::InvalidWalletCount);
                }
                let accounts: Vec<Account> = (0..*count)
                    .map(|_| self.client.create_random_account())
                    .collect();
                self.journal
                    .info(format!("已生成 {} 个新钱包", accounts.len()));
                ("generate", accounts, 0)
            }
            FleetSource::Import { keys } => {
                let mut accounts = Vec::new();
                let mut skipped = 0usize;
                for (line_no, line) in keys.iter().enumerate() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match self.client.account_from_key(trimmed) {
                        Ok(account) => accounts.push(account),
                        Err(err) => {
                            skipped += 1;
                            debug!(target: "fleet::prepare", line = line_no + 1, error = %err, "私钥解析失败");
                            self.journal
                                .warning(format!("第 {} 行私钥无效，已跳过", line_no + 1));
                        }
                    }
                }
                if accounts.is_empty() {
                    self.replace_fleet(Vec::new());
                    self.journal
                        .error("导入失败：没有任何有效私钥，舰队已清空", None);
                    return Err(FleetError::NoValidWallets);
                }
                self.journal.info(format!(
                    "已导入 {} 个钱包（跳过 {} 行无效私钥）",
                    accounts.len(),
                    skipped
                ));
                ("import", accounts, skipped)
            }
        };

        let size = accounts.len();
        self.replace_fleet(accounts);
        events::fleet_prepared(mode, size, skipped);
        Ok(size)
    }

    fn replace_fleet(&self, accounts: Vec<Account>) {
        let addresses = accounts.iter().map(Account::address).collect();
        let slots: Vec<WalletSlot> = accounts
            .into_iter()
            .map(|account| WalletSlot::new(WalletAccount::new(account)))
            .collect();
        *self.fleet.write() = Arc::new(slots);
        self.bus.publish(FleetEvent::FleetPrepared { wallets: addresses });
    }

    /// 按舰队顺序逐个注资；单个失败不影响其余钱包。
    pub async fn fund_fleet(
        &self,
        funder_key: &str,
    ) -> Result<OperationOutcome<FundReport>, FleetError> {
        let Some(_guard) = self.try_begin("fund") else {
            return Ok(OperationOutcome::Busy);
        };

        let funder = self.client.account_from_key(funder_key).map_err(|err| {
            self.journal.error(format!("注资私钥无效: {err}"), None);
            FleetError::InvalidFunderKey(err)
        })?;
        let amount = self.fund_amount_wei()?;

        if self.current_fleet().is_empty() {
            self.journal.info("尚未准备舰队，按当前配置自动准备");
            self.prepare_locked(&self.settings.source)?;
        }

        let fleet = self.current_fleet();
        self.journal.info(format!(
            "开始从 {} 为 {} 个钱包注资，每个 {}",
            funder.address(),
            fleet.len(),
            self.settings.fund_amount.trim()
        ));

        let mut funded = 0usize;
        for (index, slot) in fleet.iter().enumerate() {
            let address = slot.lock().address();
            let started = Instant::now();
            let outcome = self.transfer_and_confirm(&funder, address, amount).await;
            events::funding_result(index, &address, outcome.is_ok(), started.elapsed());

            match outcome {
                Ok(reference) => {
                    funded += 1;
                    self.set_status(index, slot, WalletStatus::Funding);
                    self.journal.success(
                        format!("钱包 #{index} 注资成功（区块 {}）", reference.block_number),
                        Some(reference.hash),
                    );
                    self.bus.publish(FleetEvent::WalletFunded {
                        index,
                        address,
                        reference,
                    });
                }
                Err(err) => {
                    self.journal
                        .error(format!("钱包 #{index} 注资失败: {err}"), None);
                    self.bus.publish(FleetEvent::FundingFailed {
                        index,
                        address,
                        reason: err.to_string(),
                    });
                }
            }
        }

        self.journal.info(format!(
            "注资完成 {funded}/{}，等待 {} ms 同步链上状态",
            fleet.len(),
            self.settings.settle_delay.as_millis()
        ));
        tokio::time::sleep(self.settings.settle_delay).await;
        self.refresh_fleet_balances(&fleet).await;

        Ok(OperationOutcome::Completed(FundReport {
            attempted: fleet.len(),
            funded,
        }))
    }

    fn fund_amount_wei(&self) -> Result<U256, FleetError> {
        let raw = self.settings.fund_amount.trim();
        parse_native_amount(raw).map_err(|err| {
            self.journal
                .error(format!("注资金额无效 {raw}: {err}"), None);
            FleetError::InvalidAmount {
                amount: raw.to_string(),
                reason: err.to_string(),
            }
        })
    }

    async fn transfer_and_confirm(
        &self,
        funder: &Account,
        to: alloy::primitives::Address,
        amount: U256,
    ) -> Result<TxReference, ChainError> {
        let handle = self.client.send_value(funder, to, amount).await?;
        self.client.confirm(&handle, FUNDING_CONFIRMATIONS).await
    }

    /// 每个钱包一个并发任务，钱包内部按 nonce 严格串行。
    pub async fn start_swarm(&self) -> Result<OperationOutcome<SwarmReport>, FleetError> {
        let Some(_guard) = self.try_begin("swarm") else {
            return Ok(OperationOutcome::Busy);
        };

        let target = self.settings.target.trim().to_string();
        if target.is_empty() {
            self.journal.error("未配置目标合约地址，swarm 未启动", None);
            return Err(FleetError::MissingTarget);
        }
        let fleet = self.current_fleet();
        if fleet.is_empty() {
            self.journal.error("舰队为空，swarm 未启动", None);
            return Err(FleetError::EmptyFleet);
        }
        let payload = parse_payload(&self.settings.payload).map_err(|err| {
            self.journal
                .error(format!("payload 无效，swarm 未启动: {err}"), None);
            err
        })?;

        let stats = self.stats.reset();
        self.bus.publish(FleetEvent::StatsUpdated(stats));
        for slot in fleet.iter() {
            slot.lock().tx_count = 0;
        }

        let started = Instant::now();
        self.journal.info(format!(
            "开始 swarm：{} 个钱包 × {} 笔交易，目标 {target}",
            fleet.len(),
            self.settings.tx_per_wallet
        ));

        let runs = join_all(
            (0..fleet.len()).map(|index| self.run_wallet(&fleet, index, &target, &payload)),
        )
        .await;
        let abandoned = runs
            .iter()
            .filter(|run| matches!(run, WalletRun::Abandoned))
            .count();

        let stats = self.stats.snapshot();
        events::swarm_finished(&stats, fleet.len(), abandoned, started.elapsed());
        self.journal.info(format!(
            "swarm 结束：共 {} 笔，成功 {}，失败 {}，放弃钱包 {}",
            stats.total_tx, stats.successful_tx, stats.failed_tx, abandoned
        ));

        self.refresh_fleet_balances(&fleet).await;

        Ok(OperationOutcome::Completed(SwarmReport {
            stats,
            wallets: fleet.len(),
            abandoned,
        }))
    }

    async fn run_wallet(
        &self,
        fleet: &Fleet,
        index: usize,
        target: &str,
        payload: &Bytes,
    ) -> WalletRun {
        let slot = &fleet[index];
        let account = slot.lock().account.clone();
        let address = account.address();

        let mut nonce = match self.client.get_nonce(address).await {
            Ok(nonce) => nonce,
            Err(err) => {
                events::nonce_fetch_failed(index, &address);
                self.journal.error(
                    format!("钱包 #{index} 获取 nonce 失败，放弃该钱包: {err}"),
                    None,
                );
                self.set_status(index, slot, WalletStatus::Error);
                return WalletRun::Abandoned;
            }
        };
        self.set_status(index, slot, WalletStatus::Sending);

        let total = self.settings.tx_per_wallet;
        for iteration in 0..total {
            let call = ContractCall {
                to: target.to_string(),
                data: payload.clone(),
                nonce,
                gas_limit: self.settings.gas_limit,
            };
            let started = Instant::now();
            let (hash, outcome) = self.call_and_confirm(&account, &call).await;
            nonce += 1;
            events::swarm_tx_result(index, call.nonce, outcome.is_ok(), started.elapsed());

            match outcome {
                Ok(reference) => {
                    slot.lock().tx_count += 1;
                    let stats = self.stats.record_success();
                    self.journal.success(
                        format!(
                            "钱包 #{index} 交易 {}/{total} 已确认（nonce {}）",
                            iteration + 1,
                            call.nonce
                        ),
                        Some(reference.hash),
                    );
                    self.bus.publish(FleetEvent::TransactionConfirmed {
                        index,
                        nonce: call.nonce,
                        reference,
                    });
                    self.bus.publish(FleetEvent::StatsUpdated(stats));
                }
                Err(err) => {
                    let stats = self.stats.record_failure();
                    self.journal.error(
                        format!(
                            "钱包 #{index} 交易 {}/{total} 失败（nonce {}）: {err}",
                            iteration + 1,
                            call.nonce
                        ),
                        hash,
                    );
                    self.bus.publish(FleetEvent::TransactionFailed {
                        index,
                        nonce: call.nonce,
                        hash,
                        reason: err.to_string(),
                    });
                    self.bus.publish(FleetEvent::StatsUpdated(stats));
                    self.advance_status(index, slot, WalletStatus::Error);
                }
            }

            if iteration + 1 < total {
                tokio::time::sleep(self.settings.pacing).await;
            }
        }

        self.advance_status(index, slot, WalletStatus::Done);
        WalletRun::Completed
    }

    async fn call_and_confirm(
        &self,
        account: &Account,
        call: &ContractCall,
    ) -> (Option<TxHandle>, Result<TxReference, ChainError>) {
        let handle = match self.client.send_call(account, call).await {
            Ok(handle) => handle,
            Err(err) => return (None, Err(err)),
        };
        let outcome = self
            .client
            .confirm(&handle, self.settings.confirmations)
            .await;
        (Some(handle), outcome)
    }

    /// 逐个刷新余额；查询失败由链客户端按 `"0"` 返回。
    pub async fn refresh_balances(&self) {
        let fleet = self.current_fleet();
        self.refresh_fleet_balances(&fleet).await;
    }

    async fn refresh_fleet_balances(&self, fleet: &Fleet) {
        for (index, slot) in fleet.iter().enumerate() {
            let address = slot.lock().address();
            let balance = self.client.get_balance(address).await;
            slot.lock().balance = balance.clone();
            self.bus
                .publish(FleetEvent::BalanceUpdated { index, balance });
        }
        debug!(target: "fleet::balances", wallets = fleet.len(), "余额刷新完成");
    }

    /// 丢弃全部钱包并清零统计；注资或 swarm 进行中时返回 `false` 且不做任何修改。
    pub fn reset_fleet(&self) -> bool {
        let Some(_guard) = self.try_begin("reset") else {
            return false;
        };
        *self.fleet.write() = Arc::new(Vec::new());
        let stats = self.stats.reset();
        self.bus.publish(FleetEvent::FleetReset);
        self.bus.publish(FleetEvent::StatsUpdated(stats));
        self.journal.info("舰队已重置");
        info!(target: "fleet", "fleet reset");
        true
    }

    fn set_status(&self, index: usize, slot: &WalletSlot, status: WalletStatus) {
        let changed = {
            let mut wallet = slot.lock();
            let changed = wallet.status != status;
            wallet.status = status;
            changed
        };
        if changed {
            self.bus
                .publish(FleetEvent::WalletStatusChanged { index, status });
        }
    }

    fn advance_status(&self, index: usize, slot: &WalletSlot, status: WalletStatus) {
        let changed = slot.lock().advance_status(status);
        if changed {
            self.bus
                .publish(FleetEvent::WalletStatusChanged { index, status });
        }
    }
}

/// 空字符串与 `0x` 视为空 payload。
pub fn parse_payload(raw: &str) -> Result<Bytes, FleetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("0x") {
        return Ok(Bytes::new());
    }
    alloy::hex::decode(trimmed)
        .map(Bytes::from)
        .map_err(|err| FleetError::InvalidPayload(format!("{trimmed}: {err}")))
}
