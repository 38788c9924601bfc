//! プロンプト生成モジュール
//!
//! マッピングの項目（と選択肢）から抽出用プロンプトを組み立てる。
//! 項目数が多い場合は `batch_size` ごとに分割して複数回問い合わせる。

use crate::mapping::MappingSet;
use crate::normalizer::BLANK_MARKER;
use crate::types::FieldDefinition;

/// 1回の問い合わせに含める項目数の既定値
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// プロンプト用の項目表記
///
/// 選択肢がある場合は `項目名 (選択肢: A、B)` の形式
pub fn describe_field(field: &FieldDefinition) -> String {
    if field.has_choices() {
        format!("{} (選択肢: {})", field.label, field.choices.join("、"))
    } else {
        field.label.clone()
    }
}

/// 項目をバッチに分割（宣言順を維持）
pub fn field_batches(mapping: &MappingSet, batch_size: usize) -> Vec<&[FieldDefinition]> {
    if mapping.is_empty() {
        return Vec::new();
    }
    mapping.fields().chunks(batch_size.max(1)).collect()
}

/// 抽出プロンプト生成
///
/// # Arguments
/// * `fields` - 対象項目（1バッチ分）
///
/// # Returns
/// 添付した帳票・音声から項目を抽出させるプロンプト
pub fn build_extraction_prompt(fields: &[FieldDefinition]) -> String {
    let field_list = fields
        .iter()
        .map(|f| format!("- {}", describe_field(f)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"あなたは介護事業所の帳票転記担当者です。添付された書類（PDF・画像）または音声の内容から、指定された項目の値を読み取ってください。

## ルール
1. 書かれている（話されている）内容だけを記載し、推測で補わない
2. 値が見つからない項目は "{BLANK_MARKER}" とする
3. 項目に「(選択肢: ...)」がある場合は、必ずその選択肢の中から最も適切なものを1つだけ選ぶ
4. 日付は書類の表記のまま記載する
5. 出力は有効なJSONオブジェクトのみ。説明文は不要

## 対象項目
{field_list}

## 出力形式（キーは対象項目の項目名部分をそのまま使用）
{{
  "項目名1": "値1",
  "項目名2": "値2"
}}"#
    )
}
