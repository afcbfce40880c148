use thiserror::Error;

use crate::chain::ChainError;

/// 前置条件失败：在任何链上副作用之前终止整个操作。
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("注资私钥无效: {0}")]
    InvalidFunderKey(#[source] ChainError),
    #[error("导入的私钥中没有任何有效钱包")]
    NoValidWallets,
    #[error("钱包数量必须大于 0")]
    InvalidWalletCount,
    #[error("未配置目标合约地址")]
    MissingTarget,
    #[error("舰队为空，请先生成或导入钱包")]
    EmptyFleet,
    #[error("注资金额无效 {amount}: {reason}")]
    InvalidAmount { amount: String, reason: String },
    #[error("交易 payload 不是合法的十六进制: {0}")]
    InvalidPayload(String),
}
