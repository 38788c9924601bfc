//! Gemini API連携
//!
//! 書類をBase64のインラインデータとして `generateContent` に送る。
//! 429（レート制限）は待機時間を読み取って再試行する。

use super::{Attachment, BackendReply, ExtractionBackend};
use crate::config::Config;
use crate::error::{CareDxError, Result};
use crate::scanner::DocumentKind;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// 待機時間が読み取れない場合の既定値
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(32);
/// 提示された待機時間に足す余裕
const RETRY_MARGIN: Duration = Duration::from_secs(2);
/// 待機時間の上限
const MAX_RETRY_WAIT: Duration = Duration::from_secs(300);

/// 医療・介護用語の誤検知を避けるため全カテゴリを BLOCK_NONE にする
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini APIリクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Gemini APIレスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl GeminiBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key()?.to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }
}

impl ExtractionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini API"
    }

    fn supports(&self, _kind: DocumentKind) -> bool {
        true
    }

    async fn generate(&self, prompt: &str, attachments: &[Attachment]) -> Result<BackendReply> {
        let request = build_request(prompt, attachments);

        for attempt in 1..=self.max_retries {
            let response = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;

            if status.is_success() {
                let parsed: GeminiResponse = serde_json::from_str(&body)
                    .map_err(|e| CareDxError::ApiParse(format!("Geminiレスポンス: {}", e)))?;
                return Ok(interpret_response(parsed));
            }

            if is_rate_limited(status.as_u16(), &body) && attempt < self.max_retries {
                let wait = retry_delay(&body);
                println!(
                    "  ⏳ API利用制限のため {:.1}秒 待機して再試行します... ({}/{})",
                    wait.as_secs_f64(),
                    attempt,
                    self.max_retries
                );
                tracing::warn!(attempt, wait_secs = wait.as_secs_f64(), "レート制限");
                tokio::time::sleep(wait).await;
                continue;
            }

            return Err(CareDxError::ApiCall(format!(
                "Gemini API failed (status {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        Err(CareDxError::ApiCall("再試行回数を超えました".into()))
    }
}

fn build_request(prompt: &str, attachments: &[Attachment]) -> GeminiRequest {
    let mut parts = vec![Part::Text {
        text: prompt.to_string(),
    }];

    for attachment in attachments {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: attachment.document.mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&attachment.data),
            },
        });
    }

    GeminiRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "application/json".to_string(),
        },
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
    }
}

/// 候補なし・安全フィルタ停止はブロックとして扱う
fn interpret_response(response: GeminiResponse) -> BackendReply {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "不明".to_string());
        return BackendReply::Blocked(reason);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return BackendReply::Blocked(candidate.finish_reason.unwrap_or_else(|| "空の応答".to_string()));
    }

    BackendReply::Text(text)
}

fn is_rate_limited(status: u16, body: &str) -> bool {
    let lower = body.to_lowercase();
    status == 429 || lower.contains("resource exhausted") || lower.contains("resource_exhausted") || lower.contains("quota")
}

/// エラー本文から待機時間を読み取る（例: "Please retry in 30.55s", "retryDelay": "30s"）
fn retry_delay(body: &str) -> Duration {
    lazy_static! {
        static ref RETRY_IN: Regex = Regex::new(r"retry in (\d+(?:\.\d+)?)s").unwrap();
        static ref RETRY_DELAY: Regex = Regex::new(r#""retryDelay"\s*:\s*"(\d+(?:\.\d+)?)s""#).unwrap();
    }

    RETRY_IN
        .captures(body)
        .or_else(|| RETRY_DELAY.captures(body))
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(|wait| wait.saturating_add(RETRY_MARGIN).min(MAX_RETRY_WAIT))
        .unwrap_or(DEFAULT_RETRY_WAIT)
}
