//! 链客户端抽象：钱包派生、余额 / nonce 查询、交易提交与确认。
//!
//! 编排层只依赖 [`ChainClient`]，生产环境使用基于 alloy 的 [`EvmChainClient`]，
//! 测试使用记录调用顺序的 mock。

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

pub mod evm;
#[cfg(test)]
pub mod mock;
pub mod units;

pub use evm::EvmChainClient;

/// 交易提交后的句柄，即交易哈希。
pub type TxHandle = B256;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("私钥无效: {0}")]
    InvalidKey(String),
    #[error("地址无效 {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("RPC 调用失败: {0}")]
    Rpc(String),
    #[error("交易 {hash} 执行失败（receipt status = 0）")]
    Reverted { hash: TxHandle },
    #[error("等待交易 {hash} 确认超时（{waited_ms} ms）")]
    Timeout { hash: TxHandle, waited_ms: u64 },
}

impl ChainError {
    pub fn rpc(reason: impl fmt::Display) -> Self {
        Self::Rpc(reason.to_string())
    }
}

/// 一个受控账户：本地签名器 + 派生地址。
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// 以 `0x` 前缀十六进制导出私钥，仅用于操作员主动导出。
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(alloy::hex::encode_prefixed(self.signer.to_bytes()))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// 确认后的交易引用，用于日志与区块浏览器链接。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReference {
    pub hash: TxHandle,
    pub block_number: u64,
}

/// swarm 阶段的一次合约调用。
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub to: String,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    fn create_random_account(&self) -> Account {
        Account::new(PrivateKeySigner::random())
    }

    fn account_from_key(&self, raw: &str) -> Result<Account, ChainError> {
        parse_private_key(raw).map(Account::new)
    }

    /// 查询失败时返回 `"0"`，不向上传播错误。
    async fn get_balance(&self, address: Address) -> String;

    async fn get_nonce(&self, address: Address) -> Result<u64, ChainError>;

    async fn send_value(
        &self,
        from: &Account,
        to: Address,
        amount_wei: U256,
    ) -> Result<TxHandle, ChainError>;

    async fn send_call(&self, from: &Account, call: &ContractCall)
    -> Result<TxHandle, ChainError>;

    async fn confirm(
        &self,
        handle: &TxHandle,
        confirmations: u64,
    ) -> Result<TxReference, ChainError>;
}

pub fn parse_private_key(raw: &str) -> Result<PrivateKeySigner, ChainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidKey("私钥为空".to_string()));
    }
    PrivateKeySigner::from_str(trimmed).map_err(|err| ChainError::InvalidKey(err.to_string()))
}

pub fn parse_address(raw: &str) -> Result<Address, ChainError> {
    let trimmed = raw.trim();
    Address::from_str(trimmed).map_err(|err| ChainError::InvalidAddress {
        address: trimmed.to_string(),
        reason: err.to_string(),
    })
}
