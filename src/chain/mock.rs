//! 测试用链客户端：记录所有提交，支持注入失败与阻塞确认。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use super::{Account, ChainClient, ChainError, ContractCall, TxHandle, TxReference};

#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    pub from: Address,
    pub to: Address,
    pub amount_wei: U256,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub from: Address,
    pub call: ContractCall,
}

#[derive(Default)]
struct MockState {
    next_tx: u64,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, String>,
    nonce_failures: HashSet<Address>,
    transfer_failures: HashSet<Address>,
    call_failures: HashSet<(Address, u64)>,
    transfers: Vec<RecordedTransfer>,
    calls: Vec<RecordedCall>,
    balance_queries: Vec<Address>,
}

pub struct MockChainClient {
    state: Mutex<MockState>,
    gate: Option<Arc<Semaphore>>,
    submitted: Notify,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            gate: None,
            submitted: Notify::new(),
        }
    }

    /// 所有确认都阻塞，直到调用 [`MockChainClient::release_confirmations`]。
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn release_confirmations(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub async fn wait_for_submission(&self) {
        self.submitted.notified().await;
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().nonces.insert(address, nonce);
    }

    pub fn set_balance(&self, address: Address, balance: &str) {
        self.state
            .lock()
            .balances
            .insert(address, balance.to_string());
    }

    pub fn fail_nonce_for(&self, address: Address) {
        self.state.lock().nonce_failures.insert(address);
    }

    pub fn fail_transfer_to(&self, address: Address) {
        self.state.lock().transfer_failures.insert(address);
    }

    /// 让指定钱包在指定 nonce 上提交失败。
    pub fn fail_call(&self, address: Address, nonce: u64) {
        self.state.lock().call_failures.insert((address, nonce));
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.state.lock().transfers.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_from(&self, address: Address) -> Vec<ContractCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|recorded| recorded.from == address)
            .map(|recorded| recorded.call.clone())
            .collect()
    }

    pub fn balance_queries(&self) -> Vec<Address> {
        self.state.lock().balance_queries.clone()
    }

    fn next_hash(state: &mut MockState) -> TxHandle {
        state.next_tx += 1;
        B256::left_padding_from(&state.next_tx.to_be_bytes())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_balance(&self, address: Address) -> String {
        let mut state = self.state.lock();
        state.balance_queries.push(address);
        state
            .balances
            .get(&address)
            .cloned()
            .unwrap_or_else(|| "0".to_string())
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, ChainError> {
        let state = self.state.lock();
        if state.nonce_failures.contains(&address) {
            return Err(ChainError::rpc("mock nonce failure"));
        }
        Ok(state.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn send_value(
        &self,
        from: &Account,
        to: Address,
        amount_wei: U256,
    ) -> Result<TxHandle, ChainError> {
        let hash = {
            let mut state = self.state.lock();
            state.transfers.push(RecordedTransfer {
                from: from.address(),
                to,
                amount_wei,
            });
            if state.transfer_failures.contains(&to) {
                return Err(ChainError::rpc("mock transfer rejected"));
            }
            Self::next_hash(&mut state)
        };
        self.submitted.notify_one();
        Ok(hash)
    }

    async fn send_call(
        &self,
        from: &Account,
        call: &ContractCall,
    ) -> Result<TxHandle, ChainError> {
        let hash = {
            let mut state = self.state.lock();
            state.calls.push(RecordedCall {
                from: from.address(),
                call: call.clone(),
            });
            if state.call_failures.contains(&(from.address(), call.nonce)) {
                return Err(ChainError::rpc("mock call rejected"));
            }
            Self::next_hash(&mut state)
        };
        self.submitted.notify_one();
        Ok(hash)
    }

    async fn confirm(
        &self,
        handle: &TxHandle,
        _confirmations: u64,
    ) -> Result<TxReference, ChainError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|err| ChainError::rpc(err.to_string()))?;
            permit.forget();
        }
        Ok(TxReference {
            hash: *handle,
            block_number: self.state.lock().next_tx,
        })
    }
}
