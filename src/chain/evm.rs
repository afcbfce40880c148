use std::fmt;
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::Signer;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use super::units::format_native_amount;
use super::{Account, ChainClient, ChainError, ContractCall, TxHandle, TxReference, parse_address};

/// 普通原生币转账的固定 gas 上限。
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// 基于 alloy HTTP provider 的 EVM 链客户端。
///
/// 只读 provider 在构造时建立一次，签名 provider 复用它的 HTTP 连接池。
#[derive(Clone)]
pub struct EvmChainClient {
    rpc_url: Url,
    provider: RootProvider<Http<Client>>,
    chain_id: u64,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for EvmChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmChainClient")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("chain_id", &self.chain_id)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl EvmChainClient {
    pub fn new(
        rpc_url: &str,
        chain_id: u64,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, ChainError> {
        let rpc_url = Url::parse(rpc_url.trim())
            .map_err(|err| ChainError::rpc(format!("RPC URL 无效 {rpc_url}: {err}")))?;
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());
        Ok(Self {
            rpc_url,
            provider,
            chain_id,
            confirm_timeout,
            poll_interval: poll_interval.max(Duration::from_millis(50)),
        })
    }

    async fn submit(&self, from: &Account, request: TransactionRequest) -> Result<TxHandle, ChainError> {
        let signer = from.signer().clone().with_chain_id(Some(self.chain_id));
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_provider(self.provider.clone());

        let gas_price = provider.get_gas_price().await.map_err(ChainError::rpc)?;
        let request = request
            .with_from(from.address())
            .with_chain_id(self.chain_id)
            .with_gas_price(gas_price);

        let pending = provider
            .send_transaction(request)
            .await
            .map_err(ChainError::rpc)?;
        Ok(*pending.tx_hash())
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn get_balance(&self, address: Address) -> String {
        match self.provider.get_balance(address).await {
            Ok(wei) => format_native_amount(wei),
            Err(err) => {
                warn!(
                    target: "chain::evm",
                    address = %address,
                    error = %err,
                    "查询余额失败，按 0 处理"
                );
                "0".to_string()
            }
        }
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(ChainError::rpc)
    }

    async fn send_value(
        &self,
        from: &Account,
        to: Address,
        amount_wei: U256,
    ) -> Result<TxHandle, ChainError> {
        let nonce = self.get_nonce(from.address()).await?;
        let request = TransactionRequest::default()
            .with_to(to)
            .with_value(amount_wei)
            .with_nonce(nonce)
            .with_gas_limit(TRANSFER_GAS_LIMIT);
        let hash = self.submit(from, request).await?;
        debug!(
            target: "chain::evm",
            from = %from.address(),
            to = %to,
            nonce,
            tx_hash = %hash,
            "原生币转账已提交"
        );
        Ok(hash)
    }

    async fn send_call(
        &self,
        from: &Account,
        call: &ContractCall,
    ) -> Result<TxHandle, ChainError> {
        let to = parse_address(&call.to)?;
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(call.data.clone())
            .with_nonce(call.nonce)
            .with_gas_limit(call.gas_limit);
        let hash = self.submit(from, request).await?;
        debug!(
            target: "chain::evm",
            from = %from.address(),
            to = %to,
            nonce = call.nonce,
            gas_limit = call.gas_limit,
            tx_hash = %hash,
            "合约调用已提交"
        );
        Ok(hash)
    }

    async fn confirm(
        &self,
        handle: &TxHandle,
        confirmations: u64,
    ) -> Result<TxReference, ChainError> {
        let provider = &self.provider;
        let confirmations = confirmations.max(1);
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match provider.get_transaction_receipt(*handle).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(ChainError::Reverted { hash: *handle });
                    }
                    if let Some(mined_in) = receipt.block_number {
                        let confirmed = if confirmations == 1 {
                            true
                        } else {
                            match provider.get_block_number().await {
                                Ok(head) => head + 1 >= mined_in + confirmations,
                                Err(err) => {
                                    debug!(
                                        target: "chain::evm",
                                        error = %err,
                                        "查询最新区块失败，稍后重试"
                                    );
                                    false
                                }
                            }
                        };
                        if confirmed {
                            info!(
                                target: "chain::evm",
                                tx_hash = %handle,
                                block = mined_in,
                                confirmations,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "交易已确认"
                            );
                            return Ok(TxReference {
                                hash: *handle,
                                block_number: mined_in,
                            });
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(
                        target: "chain::evm",
                        tx_hash = %handle,
                        error = %err,
                        "查询 receipt 失败，稍后重试"
                    );
                }
            }

            if started.elapsed() >= self.confirm_timeout {
                return Err(ChainError::Timeout {
                    hash: *handle,
                    waited_ms: self.confirm_timeout.as_millis() as u64,
                });
            }
        }
    }
}
