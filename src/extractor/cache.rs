//! 抽出結果キャッシュモジュール
//!
//! 書類の内容・マッピング・モデル名のSHA-256をキーにして抽出結果をキャッシュし、
//! 同じ書類の再抽出をスキップする。

use super::Attachment;
use crate::error::Result;
use care_dx_common::{ExtractedValue, MappingSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".extraction-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// キャッシュキー → 抽出結果
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_names: Vec<String>,
    pub created_at: String,
    pub values: Vec<ExtractedValue>,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（壊れている場合は空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "キャッシュを読み込めませんでした");
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&[ExtractedValue]> {
        self.entries.get(key).map(|e| e.values.as_slice())
    }

    pub fn insert(&mut self, key: String, file_names: Vec<String>, values: Vec<ExtractedValue>) {
        self.entries.insert(
            key,
            CacheEntry {
                file_names,
                created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                values,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// キャッシュファイルを削除（存在しなければ false）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// キャッシュキーを計算
///
/// 書類のバイト列・マッピング定義・モデル名が1つでも変われば別キーになる。
pub fn cache_key(attachments: &[Attachment], mapping: &MappingSet, model: &str) -> String {
    let mut hasher = Sha256::new();

    for attachment in attachments {
        hasher.update((attachment.data.len() as u64).to_le_bytes());
        hasher.update(&attachment.data);
    }
    for field in mapping {
        hasher.update(field.label.as_bytes());
        hasher.update([0u8]);
        hasher.update(field.cell_reference.to_string().as_bytes());
        for choice in &field.choices {
            hasher.update([0u8]);
            hasher.update(choice.as_bytes());
        }
        hasher.update([1u8]);
    }
    hasher.update(model.as_bytes());

    hex::encode(hasher.finalize())
}
