//! 実行設定
//!
//! 設定ファイル（~/.config/care-dx/config.json）と環境変数から1回の実行分の
//! `Config` を組み立て、パイプラインの各処理に引数として渡す。

use crate::error::{CareDxError, Result};
use care_dx_common::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    /// 1回の問い合わせに含める項目数
    pub batch_size: usize,
    /// 1ファイルあたりの上限（MB）
    pub max_file_size_mb: u64,
    pub timeout_seconds: u64,
    /// レート制限時の最大試行回数
    pub max_retries: u32,
    /// 転記先シート名（省略時は Sheet1）
    pub sheet_name: Option<String>,
    /// 出力ファイル名に使う利用者名の項目（先頭から順に探す）
    pub name_labels: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_file_size_mb: 20, // Gemini インラインデータの上限
            timeout_seconds: 120,
            max_retries: 3,
            sheet_name: None,
            name_labels: vec!["利用者情報_氏名_漢字".into(), "氏名".into()],
        }
    }
}

impl Config {
    /// 設定ファイルを読み込み、環境変数で上書き
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CareDxError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("care-dx").join("config.json"))
    }

    /// 環境変数による上書き（空文字は無視）
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CareDxError::Config("batch_size は1以上にしてください".into()));
        }
        if self.max_retries == 0 {
            return Err(CareDxError::Config("max_retries は1以上にしてください".into()));
        }
        if self.model.trim().is_empty() {
            return Err(CareDxError::Config("model が空です".into()));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CareDxError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet_name
            .as_deref()
            .unwrap_or(care_dx_common::export::excel_core::DEFAULT_SHEET_NAME)
    }
}
