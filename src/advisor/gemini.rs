use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{PayloadAdvisor, PayloadSuggestion};
use crate::config::AdvisorConfig;

const BODY_PREVIEW_CHARS: usize = 256;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("调用 Gemini API 失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("请求 {endpoint} 超时（{timeout_ms} ms）")]
    Timeout { endpoint: String, timeout_ms: u64 },
    #[error("Gemini API 返回状态 {status}: {body}")]
    ApiStatus { status: StatusCode, body: String },
    #[error("响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("响应结构不符合预期: {0}")]
    Schema(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiAdvisor {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl fmt::Debug for GeminiAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiAdvisor")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiAdvisor {
    pub fn new(client: reqwest::Client, config: &AdvisorConfig) -> Self {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    async fn request(
        &self,
        api_key: &str,
        contract: &str,
        intent: &str,
    ) -> Result<PayloadSuggestion, AdvisorError> {
        let url = self.endpoint();
        let prompt = build_prompt(contract, intent);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        debug!(
            target: "advisor::gemini",
            endpoint = %url,
            model = %self.model,
            "请求 Gemini 生成 payload"
        );
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AdvisorError::Timeout {
                        endpoint: url.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AdvisorError::Http(err.without_url())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| err.without_url())?;
        if !status.is_success() {
            return Err(AdvisorError::ApiStatus {
                status,
                body: summarize_body(&text),
            });
        }

        let suggestion = parse_response(&text)?;
        debug!(
            target: "advisor::gemini",
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = suggestion.hex_data.len().saturating_sub(2) / 2,
            "Gemini payload 建议已生成"
        );
        Ok(suggestion)
    }
}

#[async_trait]
impl PayloadAdvisor for GeminiAdvisor {
    async fn generate_payload(&self, contract: &str, intent: &str) -> PayloadSuggestion {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(target: "advisor::gemini", "未配置 Gemini API key，返回兜底 payload");
            return PayloadSuggestion::missing_key();
        };

        match self.request(api_key, contract, intent).await {
            Ok(suggestion) => suggestion,
            Err(err) => {
                warn!(
                    target: "advisor::gemini",
                    error = %err,
                    "Gemini payload 生成失败，返回兜底 payload"
                );
                PayloadSuggestion::failed()
            }
        }
    }
}

fn build_prompt(contract: &str, intent: &str) -> String {
    format!(
        "You are an EVM calldata assistant for the Celo network.\n\
         Target contract: {contract}\n\
         Intent: {intent}\n\
         Respond with a JSON object {{\"hexData\": string, \"reasoning\": string}} where \
         hexData is the 0x-prefixed ABI-encoded calldata for a single call and \
         reasoning briefly explains the encoding."
    )
}

/// 取第一个候选的第一个文本片段，再按 `{hexData, reasoning}` 解析。
fn parse_response(body: &str) -> Result<PayloadSuggestion, AdvisorError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| AdvisorError::Schema("响应中没有候选文本".to_string()))?;

    let suggestion: PayloadSuggestion = serde_json::from_str(strip_code_fence(&text))?;
    let hex_data = normalize_hex(&suggestion.hex_data)
        .ok_or_else(|| AdvisorError::Schema(format!("hexData 不是十六进制: {}", suggestion.hex_data)))?;
    Ok(PayloadSuggestion {
        hex_data,
        reasoning: suggestion.reasoning,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn normalize_hex(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    alloy::hex::decode(digits).ok()?;
    Some(format!("0x{}", digits.to_ascii_lowercase()))
}

fn summarize_body(body: &str) -> String {
    let mut summary: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    if body.chars().count() > BODY_PREVIEW_CHARS {
        summary.push('…');
    }
    summary
}
