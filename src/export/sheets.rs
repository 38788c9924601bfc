//! Google Sheets `values:batchUpdate` 用のリクエスト本文
//!
//! 転記指示を1回の一括更新で書き込める形にする。送信は行わない。

use crate::error::Result;
use care_dx_common::WriteInstruction;
use serde::Serialize;
use std::path::Path;

/// 入力値をそのまま文字列として扱う
const VALUE_INPUT_OPTION: &str = "RAW";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    pub value_input_option: &'static str,
    pub data: Vec<ValueRange>,
}

#[derive(Debug, Serialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

pub fn build_batch_update(instructions: &[WriteInstruction], sheet_name: &str) -> BatchUpdateRequest {
    let data = instructions
        .iter()
        .map(|instruction| ValueRange {
            range: format!("{}!{}", quote_sheet_name(sheet_name), instruction.cell_reference),
            values: vec![vec![instruction.value.clone()]],
        })
        .collect();

    BatchUpdateRequest {
        value_input_option: VALUE_INPUT_OPTION,
        data,
    }
}

pub fn write_batch_update(instructions: &[WriteInstruction], output_path: &Path, sheet_name: &str) -> Result<()> {
    let request = build_batch_update(instructions, sheet_name);
    std::fs::write(output_path, serde_json::to_string_pretty(&request)?)?;
    Ok(())
}

/// A1記法のシート名（英数字以外を含む場合は引用符で囲む）
fn quote_sheet_name(sheet_name: &str) -> String {
    if sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet_name.to_string()
    } else {
        format!("'{}'", sheet_name.replace('\'', "''"))
    }
}
