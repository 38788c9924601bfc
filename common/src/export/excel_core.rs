//! Excel生成（共通ライブラリ）
//!
//! 転記指示をワークシートのセルに書き込む

use crate::types::WriteInstruction;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};

/// シート名の既定値
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// 転記指示を1シートのExcelとしてバッファに生成
///
/// # Arguments
/// * `instructions` - 書き込み指示（宣言順）
/// * `sheet_name` - ワークシート名
pub fn generate_excel_buffer(
    instructions: &[WriteInstruction],
    sheet_name: &str,
) -> Result<Vec<u8>, String> {
    build_workbook(instructions, sheet_name)
        .and_then(|mut workbook| workbook.save_to_buffer())
        .map_err(|e| format!("Excel生成エラー: {}", e))
}

fn build_workbook(instructions: &[WriteInstruction], sheet_name: &str) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();

    let value_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for instruction in instructions {
        let (row, col) = instruction.cell_reference.zero_based();
        if instruction.value.is_empty() {
            worksheet.write_blank(row, col, &value_format)?;
        } else {
            worksheet.write_string_with_format(row, col, &instruction.value, &value_format)?;
        }
    }

    Ok(workbook)
}
