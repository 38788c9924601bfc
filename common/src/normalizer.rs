//! 抽出値の正規化
//!
//! AIが抽出した自由記述の値を、マッピングの選択肢に寄せる。
//!
//! ## 処理フロー（1項目ごと）
//! 1. 項目名でマッピングを検索（なければ孤立項目として破棄）
//! 2. 選択肢なし → 前後の空白を除去してそのまま採用
//! 3. 選択肢あり → 完全一致（宣言順の先勝ち）
//! 4. 一致なし → 部分一致（双方向・宣言順の先勝ち）
//! 5. それでも一致なし → 未解決として警告し、生テキストをそのまま渡す
//!
//! 警告は全件まとめて返し、処理は中断しない。

use crate::mapping::MappingSet;
use crate::types::{ExtractedValue, FieldDefinition};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// 「値なし」を表すAI出力
pub const BLANK_MARKER: &str = "（空白）";

/// 正規化時の警告（処理は継続）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// マッピングにない項目名（値は破棄）
    OrphanField { label: String },
    /// マッピングにあるが抽出されなかった項目
    MissingField { label: String },
    /// 選択肢に一致しなかった値（生テキストのまま）
    UnresolvedChoice {
        label: String,
        raw_text: String,
        choices: Vec<String>,
    },
    /// 同じ項目名が複数回抽出された（先の値を採用）
    DuplicateExtraction { label: String },
}

impl Warning {
    /// 対象の項目名
    pub fn label(&self) -> &str {
        match self {
            Warning::OrphanField { label }
            | Warning::MissingField { label }
            | Warning::UnresolvedChoice { label, .. }
            | Warning::DuplicateExtraction { label } => label,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::OrphanField { label } => {
                write!(f, "「{}」はマッピングにない項目のため破棄しました", label)
            }
            Warning::MissingField { label } => {
                write!(f, "「{}」は抽出されませんでした", label)
            }
            Warning::UnresolvedChoice { label, raw_text, choices } => write!(
                f,
                "「{}」の値「{}」が選択肢（{}）に一致しません（未確認のまま）",
                label,
                raw_text,
                choices.join("、")
            ),
            Warning::DuplicateExtraction { label } => {
                write!(f, "「{}」が重複して抽出されたため最初の値を採用しました", label)
            }
        }
    }
}

/// 正規化結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationResult {
    /// 項目名 → 正規化後の値
    pub values: HashMap<String, String>,
    /// 警告（発生順）
    pub warnings: Vec<Warning>,
}

impl NormalizationResult {
    /// 選択肢に一致しなかった項目名
    pub fn unverified_labels(&self) -> HashSet<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                Warning::UnresolvedChoice { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 未確認の値を除いた値の一覧
    pub fn verified_values(&self) -> HashMap<String, String> {
        let unverified = self.unverified_labels();
        self.values
            .iter()
            .filter(|(label, _)| !unverified.contains(label.as_str()))
            .map(|(label, value)| (label.clone(), value.clone()))
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// 抽出値を正規化する
///
/// # Arguments
/// * `mapping` - パース済みマッピング
/// * `extracted` - AI抽出結果
///
/// # Returns
/// 項目名→値のマップと警告のリスト
pub fn normalize(mapping: &MappingSet, extracted: &[ExtractedValue]) -> NormalizationResult {
    let mut result = NormalizationResult::default();

    for item in extracted {
        let Some(field) = mapping.get(&item.label) else {
            tracing::debug!(label = %item.label, "孤立項目");
            result.warnings.push(Warning::OrphanField {
                label: item.label.clone(),
            });
            continue;
        };

        if result.values.contains_key(&field.label) {
            result.warnings.push(Warning::DuplicateExtraction {
                label: field.label.clone(),
            });
            continue;
        }

        let value = match resolve_value(field, &item.raw_text) {
            Resolution::Resolved(value) => value,
            Resolution::Unresolved => {
                result.warnings.push(Warning::UnresolvedChoice {
                    label: field.label.clone(),
                    raw_text: item.raw_text.clone(),
                    choices: field.choices.clone(),
                });
                item.raw_text.clone()
            }
        };

        result.values.insert(field.label.clone(), value);
    }

    for field in mapping {
        if !extracted.iter().any(|e| e.label == field.label) {
            result.warnings.push(Warning::MissingField {
                label: field.label.clone(),
            });
        }
    }

    tracing::debug!(
        values = result.values.len(),
        warnings = result.warnings.len(),
        "正規化完了"
    );

    result
}

enum Resolution {
    Resolved(String),
    Unresolved,
}

/// 1項目の値を決定
fn resolve_value(field: &FieldDefinition, raw_text: &str) -> Resolution {
    let text = raw_text.trim();

    if text.is_empty() || text == BLANK_MARKER {
        return Resolution::Resolved(String::new());
    }

    if !field.has_choices() {
        return Resolution::Resolved(text.to_string());
    }

    match match_choice(&field.choices, text) {
        Some(choice) => Resolution::Resolved(choice.to_string()),
        None => Resolution::Unresolved,
    }
}

/// 選択肢を照合（完全一致 → 部分一致、いずれも宣言順の先勝ち）
///
/// # Examples
/// ```
/// use care_dx_common::normalizer::match_choice;
///
/// let choices = vec!["初回".to_string(), "更新".to_string()];
/// assert_eq!(match_choice(&choices, "区分：初回"), Some("初回"));
/// assert_eq!(match_choice(&choices, "不明"), None);
/// ```
pub fn match_choice<'a>(choices: &'a [String], text: &str) -> Option<&'a str> {
    if text.is_empty() {
        return None;
    }

    choices
        .iter()
        .find(|c| c.as_str() == text)
        .or_else(|| {
            choices
                .iter()
                .find(|c| text.contains(c.as_str()) || c.contains(text))
        })
        .map(|c| c.as_str())
}
