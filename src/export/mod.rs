pub mod excel;
pub mod sheets;

use crate::cli::ExportFormat;
use crate::error::Result;
use care_dx_common::meeting::table_instructions;
use care_dx_common::WriteInstruction;
use std::path::{Path, PathBuf};

/// 出力先がフォルダ（または拡張子なし）ならファイル名を付ける
fn output_path_for_format(output: &Path, file_stem: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", file_stem, extension))
    } else {
        output.with_extension(extension)
    }
}

/// 書き出したファイル
#[derive(Debug, Default)]
pub struct ExportedFiles {
    pub excel: Option<PathBuf>,
    pub sheets_payload: Option<PathBuf>,
}

/// 転記指示を指定形式で書き出す
///
/// Excelは書き出し後に読み戻して検証する。
pub fn export_instructions(
    instructions: &[WriteInstruction],
    format: ExportFormat,
    output: &Path,
    file_stem: &str,
    sheet_name: &str,
) -> Result<ExportedFiles> {
    let mut exported = ExportedFiles::default();

    if matches!(format, ExportFormat::Xlsx | ExportFormat::Both) {
        let path = output_path_for_format(output, file_stem, "xlsx");
        println!("- Excelを生成中...");
        excel::write_excel(instructions, &path, sheet_name)?;
        excel::verify_excel(&path, sheet_name, instructions)?;
        println!("✔ Excel出力: {} ({}セル, 検証OK)", path.display(), instructions.len());
        exported.excel = Some(path);
    }

    if matches!(format, ExportFormat::Json | ExportFormat::Both) {
        let path = output_path_for_format(output, file_stem, "json");
        println!("- Sheets更新データを生成中...");
        sheets::write_batch_update(instructions, &path, sheet_name)?;
        println!("✔ Sheets更新データ出力: {}", path.display());
        exported.sheets_payload = Some(path);
    }

    Ok(exported)
}

/// 記録シートの末尾に会議録の1行を追加して書き出す
///
/// Excelは既存の表（見出しを含む）と追加行をまとめて書き出して検証する。
/// Sheets更新データは追加行のセルだけを書き込む。
pub fn export_meeting_row(
    table: &[Vec<String>],
    row: &[String],
    format: ExportFormat,
    output: &Path,
    file_stem: &str,
    sheet_name: &str,
) -> Result<ExportedFiles> {
    let row_no = u32::try_from(table.len()).unwrap_or(u32::MAX).saturating_add(1);
    let row_instructions = table_instructions(&[row.to_vec()], row_no)?;
    let mut exported = ExportedFiles::default();

    if matches!(format, ExportFormat::Xlsx | ExportFormat::Both) {
        let mut instructions = table_instructions(table, 1)?;
        instructions.extend(row_instructions.iter().cloned());

        let path = output_path_for_format(output, file_stem, "xlsx");
        println!("- Excelを生成中...");
        excel::write_excel(&instructions, &path, sheet_name)?;
        excel::verify_excel(&path, sheet_name, &instructions)?;
        println!("✔ Excel出力: {} ({}行目に追加, 検証OK)", path.display(), row_no);
        exported.excel = Some(path);
    }

    if matches!(format, ExportFormat::Json | ExportFormat::Both) {
        let path = output_path_for_format(output, file_stem, "json");
        println!("- Sheets更新データを生成中...");
        sheets::write_batch_update(&row_instructions, &path, sheet_name)?;
        println!("✔ Sheets更新データ出力: {} ({}行目)", path.display(), row_no);
        exported.sheets_payload = Some(path);
    }

    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path_for_format(dir.path(), "山田花子_20250401_アセスメント", "xlsx");
        assert_eq!(path, dir.path().join("山田花子_20250401_アセスメント.xlsx"));
    }

    #[test]
    fn test_output_path_for_file() {
        let path = output_path_for_format(Path::new("out/result.xlsx"), "ignored", "json");
        assert_eq!(path, PathBuf::from("out/result.json"));
    }
}
