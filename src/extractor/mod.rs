//! AI抽出（外部AIとの境界）
//!
//! マッピングの項目をバッチに分けてプロンプトを作り、
//! バックエンド（Gemini API / Claude CLI）の応答を `ExtractedValue` に変換する。
//! レート制限の再試行はバックエンド側で行う。

pub mod cache;
mod claude_cli;
mod gemini;

pub use claude_cli::ClaudeCliBackend;
pub use gemini::GeminiBackend;

use crate::config::Config;
use crate::error::{CareDxError, Result};
use crate::scanner::{Document, DocumentKind};
use cache::CacheFile;
use care_dx_common::{
    build_extraction_prompt, build_service_meeting_prompt, field_batches, parse_extraction_response,
    ExtractedValue, MappingSet,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// 読み込み済みの添付ファイル
#[derive(Debug, Clone)]
pub struct Attachment {
    pub document: Document,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn load(document: &Document) -> Result<Self> {
        Ok(Self {
            document: document.clone(),
            data: document.read_bytes()?,
        })
    }
}

/// バックエンドの応答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Text(String),
    /// 安全フィルタ等でブロックされた（理由）
    Blocked(String),
}

/// AI抽出バックエンド
#[allow(async_fn_in_trait)]
pub trait ExtractionBackend {
    fn name(&self) -> &str;

    fn supports(&self, kind: DocumentKind) -> bool;

    async fn generate(&self, prompt: &str, attachments: &[Attachment]) -> Result<BackendReply>;
}

/// 抽出結果
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub values: Vec<ExtractedValue>,
    /// スキップしたバッチ（番号と理由）
    pub skipped_batches: Vec<(usize, String)>,
    pub from_cache: bool,
}

/// 書類から項目を抽出
///
/// # Arguments
/// * `backend` - AIバックエンド
/// * `attachments` - 1件の記録を構成する書類
/// * `mapping` - 抽出対象の項目
/// * `config` - 実行設定（バッチサイズ）
pub async fn extract<B: ExtractionBackend>(
    backend: &B,
    attachments: &[Attachment],
    mapping: &MappingSet,
    config: &Config,
) -> Result<ExtractionOutcome> {
    ensure_supported(backend, attachments)?;

    let batches = field_batches(mapping, config.batch_size);
    let progress = if batches.len() > 1 {
        let pb = ProgressBar::new(batches.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("  {bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut outcome = ExtractionOutcome::default();

    for (idx, batch) in batches.iter().enumerate() {
        let batch_no = idx + 1;
        progress.set_message(format!("バッチ {}/{}", batch_no, batches.len()));
        tracing::debug!(batch = batch_no, fields = batch.len(), backend = backend.name(), "抽出開始");

        let prompt = build_extraction_prompt(batch);
        match backend.generate(&prompt, attachments).await? {
            BackendReply::Text(text) => match parse_extraction_response(&text) {
                Ok(values) => {
                    tracing::debug!(batch = batch_no, values = values.len(), "抽出完了");
                    outcome.values.extend(values);
                }
                Err(e) => {
                    tracing::warn!(batch = batch_no, error = %e, "抽出結果を解析できませんでした");
                    outcome.skipped_batches.push((batch_no, e.to_string()));
                }
            },
            BackendReply::Blocked(reason) => {
                tracing::warn!(batch = batch_no, %reason, "バッチがブロックされました");
                outcome
                    .skipped_batches
                    .push((batch_no, format!("ブロックされました ({})", reason)));
            }
        }

        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(outcome)
}

/// 会議音声を要約して会議録の項目を得る
///
/// 抽出と違い1回の呼び出しで全項目を得るため、ブロックされた場合はエラーにする。
pub async fn summarize_meeting<B: ExtractionBackend>(
    backend: &B,
    attachments: &[Attachment],
) -> Result<Vec<ExtractedValue>> {
    ensure_supported(backend, attachments)?;

    let prompt = build_service_meeting_prompt();
    tracing::debug!(files = attachments.len(), backend = backend.name(), "会議録要約開始");

    match backend.generate(&prompt, attachments).await? {
        BackendReply::Text(text) => {
            let values = parse_extraction_response(&text)?;
            tracing::debug!(values = values.len(), "会議録要約完了");
            Ok(values)
        }
        BackendReply::Blocked(reason) => Err(CareDxError::ApiBlocked(reason)),
    }
}

fn ensure_supported<B: ExtractionBackend>(backend: &B, attachments: &[Attachment]) -> Result<()> {
    if attachments.is_empty() {
        return Err(CareDxError::NoDocumentsFound("抽出対象がありません".into()));
    }

    if let Some(unsupported) = attachments.iter().find(|a| !backend.supports(a.document.kind)) {
        return Err(CareDxError::UnsupportedFile(format!(
            "{} は {} では扱えません",
            unsupported.document.file_name,
            backend.name()
        )));
    }

    Ok(())
}

/// キャッシュを使って抽出
///
/// 同じ書類・マッピング・モデルの組み合わせは再抽出しない。
/// 一部のバッチがスキップされた結果はキャッシュしない。
pub async fn extract_with_cache<B: ExtractionBackend>(
    backend: &B,
    attachments: &[Attachment],
    mapping: &MappingSet,
    config: &Config,
    cache_dir: &Path,
) -> Result<ExtractionOutcome> {
    let key = cache::cache_key(attachments, mapping, &config.model);
    let mut cache_file = CacheFile::load(cache_dir);

    if let Some(values) = cache_file.get(&key) {
        tracing::info!(entries = cache_file.len(), "キャッシュを使用");
        return Ok(ExtractionOutcome {
            values: values.to_vec(),
            skipped_batches: Vec::new(),
            from_cache: true,
        });
    }

    let outcome = extract(backend, attachments, mapping, config).await?;

    if outcome.skipped_batches.is_empty() {
        let file_names = attachments
            .iter()
            .map(|a| a.document.file_name.clone())
            .collect();
        cache_file.insert(key, file_names, outcome.values.clone());
        cache_file.save(cache_dir)?;
    }

    Ok(outcome)
}
