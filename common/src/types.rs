//! 転記パイプラインの型定義
//!
//! CLIと他のフロントエンドで共有される型:
//! - FieldDefinition: マッピングファイルの1行（項目名・セル・選択肢）
//! - ExtractedValue: AI抽出の出力（項目名と生テキスト）
//! - WriteInstruction: 最終出力（セルと書き込む値）

use crate::cell::CellRef;
use serde::{Deserialize, Serialize};

/// マッピングファイルの1項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// 項目名（マッピング内で一意）
    pub label: String,

    /// 転記先セル
    pub cell_reference: CellRef,

    /// 選択肢（空なら自由記述）
    #[serde(default)]
    pub choices: Vec<String>,
}

impl FieldDefinition {
    /// 選択肢を持つ項目か
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// AI抽出結果の1項目
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedValue {
    pub label: String,
    pub raw_text: String,
}

impl ExtractedValue {
    pub fn new(label: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// セル書き込み指示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteInstruction {
    pub cell_reference: CellRef,
    pub value: String,
}
