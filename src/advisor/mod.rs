//! 交易 payload 顾问：向托管大模型请求 calldata 建议。
//!
//! 顾问永远不向调用方返回错误，任何失败都映射为固定的兜底建议。

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::{AdvisorError, GeminiAdvisor};

pub const FALLBACK_HEX: &str = "0x";
pub const REASON_MISSING_KEY: &str = "API key missing";
pub const REASON_FAILED: &str = "generation failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadSuggestion {
    pub hex_data: String,
    pub reasoning: String,
}

impl PayloadSuggestion {
    pub fn missing_key() -> Self {
        Self::fallback(REASON_MISSING_KEY)
    }

    pub fn failed() -> Self {
        Self::fallback(REASON_FAILED)
    }

    fn fallback(reason: &str) -> Self {
        Self {
            hex_data: FALLBACK_HEX.to_string(),
            reasoning: reason.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.hex_data == FALLBACK_HEX
            && (self.reasoning == REASON_MISSING_KEY || self.reasoning == REASON_FAILED)
    }
}

#[async_trait]
pub trait PayloadAdvisor: Send + Sync {
    async fn generate_payload(&self, contract: &str, intent: &str) -> PayloadSuggestion;
}
