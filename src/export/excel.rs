//! Excel出力（CLI版）
//!
//! 共通ライブラリでバッファを生成してファイルに書き出し、
//! calamineで読み戻して転記内容を検証する。
//! 会議録の記録シートもcalamineで読み込む。

use crate::error::{CareDxError, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use care_dx_common::export::excel_core::generate_excel_buffer;
use care_dx_common::WriteInstruction;
use std::path::Path;

pub fn write_excel(instructions: &[WriteInstruction], output_path: &Path, sheet_name: &str) -> Result<()> {
    let buffer = generate_excel_buffer(instructions, sheet_name).map_err(CareDxError::ExcelGeneration)?;
    std::fs::write(output_path, buffer)?;

    tracing::debug!(cells = instructions.len(), path = %output_path.display(), "Excelを書き出しました");
    Ok(())
}

/// 書き出したExcelを読み戻し、全セルが指示どおりか確認
///
/// 不一致があったセル番地を列挙してエラーにする（値は出さない）。
pub fn verify_excel(output_path: &Path, sheet_name: &str, instructions: &[WriteInstruction]) -> Result<()> {
    let mut workbook: Xlsx<_> = open_workbook(output_path)
        .map_err(|e| CareDxError::Verification(format!("{}: {}", output_path.display(), e)))?;

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| CareDxError::Verification(format!("シート「{}」: {}", sheet_name, e)))?;

    let mismatched: Vec<String> = instructions
        .iter()
        .filter(|instruction| {
            let (row, col) = instruction.cell_reference.zero_based();
            cell_text(&range, row, col as u32) != instruction.value
        })
        .map(|instruction| instruction.cell_reference.to_string())
        .collect();

    if !mismatched.is_empty() {
        return Err(CareDxError::Verification(format!(
            "{}件のセルが一致しません: {}",
            mismatched.len(),
            mismatched.join(", ")
        )));
    }

    Ok(())
}

/// シートの内容を1行目から文字列の表として読み込む
///
/// 数値や日付は表示用の文字列になる。空のシートは空の表。
pub fn read_table(path: &Path, sheet_name: &str) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(CareDxError::FileNotFound(path.display().to_string()));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| CareDxError::UnsupportedFile(format!("{}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| CareDxError::UnsupportedFile(format!("シート「{}」: {}", sheet_name, e)))?;

    let Some((last_row, last_col)) = range.end() else {
        return Ok(Vec::new());
    };

    let table = (0..=last_row)
        .map(|row| (0..=last_col).map(|col| cell_text(&range, row, col)).collect())
        .collect();

    tracing::debug!(rows = last_row + 1, path = %path.display(), "記録シートを読み込みました");
    Ok(table)
}

/// 0始まりの絶対座標のセルを文字列で取得（範囲外は空）
fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
