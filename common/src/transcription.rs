//! 転記指示の生成
//!
//! 正規化済みの値を、マッピングの宣言順にセル書き込み指示へ変換する。
//! 2つの項目が同じセルに値を持つ場合は上書きせずにエラーとする。

use crate::cell::CellRef;
use crate::error::{Error, Result};
use crate::mapping::MappingSet;
use crate::types::WriteInstruction;
use std::collections::HashMap;

/// 書き込み指示を生成
///
/// # Arguments
/// * `mapping` - パース済みマッピング
/// * `values` - 項目名 → 正規化後の値
///
/// # Returns
/// * `Ok(Vec<WriteInstruction>)` - マッピングの宣言順
/// * `Err(Error::CellConflict)` - 同一セルに複数項目の値がある（指示は一切返さない）
pub fn build_instructions(
    mapping: &MappingSet,
    values: &HashMap<String, String>,
) -> Result<Vec<WriteInstruction>> {
    let mut instructions = Vec::new();
    let mut owners: HashMap<&CellRef, &str> = HashMap::new();

    for field in mapping {
        let Some(value) = values.get(&field.label) else {
            continue;
        };

        if let Some(first) = owners.insert(&field.cell_reference, &field.label) {
            return Err(Error::CellConflict {
                cell: field.cell_reference.to_string(),
                first: first.to_string(),
                second: field.label.clone(),
            });
        }

        instructions.push(WriteInstruction {
            cell_reference: field.cell_reference.clone(),
            value: value.clone(),
        });
    }

    tracing::debug!(instructions = instructions.len(), "転記指示を生成しました");

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_declaration_order() {
        let mapping = MappingSet::parse("作成日：J11\n氏名：D14\n性別：P18（男、女）").unwrap();
        let instructions = build_instructions(
            &mapping,
            &values(&[("性別", "女"), ("作成日", "2025-04-01"), ("氏名", "山田 花子")]),
        )
        .unwrap();

        let cells: Vec<String> = instructions
            .iter()
            .map(|i| i.cell_reference.to_string())
            .collect();
        assert_eq!(cells, vec!["J11", "D14", "P18"]);
        assert_eq!(instructions[2].value, "女");
    }

    #[test]
    fn test_missing_values_skipped() {
        let mapping = MappingSet::parse("作成日：J11\n氏名：D14").unwrap();
        let instructions = build_instructions(&mapping, &values(&[("氏名", "山田")])).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].cell_reference.to_string(), "D14");
    }

    #[test]
    fn test_unknown_labels_ignored() {
        let mapping = MappingSet::parse("氏名：D14").unwrap();
        let instructions =
            build_instructions(&mapping, &values(&[("氏名", "山田"), ("住所", "東京都")])).unwrap();
        assert_eq!(instructions.len(), 1);
    }

    #[test]
    fn test_cell_conflict() {
        let mapping = MappingSet::parse("作成日：J11\n記入日：j11").unwrap();
        let result = build_instructions(
            &mapping,
            &values(&[("作成日", "2025-04-01"), ("記入日", "2025-04-02")]),
        );

        match result {
            Err(Error::CellConflict { cell, first, second }) => {
                assert_eq!(cell, "J11");
                assert_eq!(first, "作成日");
                assert_eq!(second, "記入日");
            }
            other => panic!("Expected CellConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_cell_without_both_values_is_ok() {
        let mapping = MappingSet::parse("作成日：J11\n記入日：J11").unwrap();
        let instructions =
            build_instructions(&mapping, &values(&[("記入日", "2025-04-02")])).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].value, "2025-04-02");
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        let mapping = MappingSet::parse("作成日：J11\n記入日：J11").unwrap();
        let result =
            build_instructions(&mapping, &values(&[("作成日", ""), ("記入日", "2025-04-02")]));
        assert!(matches!(result, Err(Error::CellConflict { .. })));
    }

    #[test]
    fn test_idempotent() {
        let mapping = MappingSet::parse("作成日：J11\n氏名：D14\n区分：M11（初回、更新）").unwrap();
        let input = values(&[("氏名", "山田"), ("区分", "更新"), ("作成日", "2025-04-01")]);

        let first = build_instructions(&mapping, &input).unwrap();
        let second = build_instructions(&mapping, &input).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
