//! マッピングファイルパーサー
//!
//! 1行1項目の形式:
//!
//! ```text
//! 項目名：セル（選択肢1、選択肢2）
//! ```
//!
//! - 区切りは全角コロン「：」
//! - 選択肢は全角括弧「（）」と読点「、」で区切る（省略可）
//! - 空行と `#` / `＃` で始まるコメント行は無視

use crate::cell::CellRef;
use crate::error::{Error, Result};
use crate::types::FieldDefinition;
use serde::Serialize;
use std::collections::HashSet;

/// 項目名とセルの区切り
pub const SEPARATOR: char = '：';
/// 選択肢リストの開始
pub const CHOICES_OPEN: char = '（';
/// 選択肢リストの終了
pub const CHOICES_CLOSE: char = '）';
/// 選択肢の区切り
pub const CHOICE_SEPARATOR: char = '、';

/// パース済みのマッピング（読み込み後は不変）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSet {
    fields: Vec<FieldDefinition>,
}

impl MappingSet {
    /// マッピングテキストをパース
    pub fn parse(text: &str) -> Result<Self> {
        parse(text)
    }

    /// ファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        parse(&content)
    }

    /// 宣言順の全項目
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// 項目名で検索
    pub fn get(&self, label: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.label == label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDefinition> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a MappingSet {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// マッピングテキストをパース
///
/// # Arguments
/// * `text` - マッピングファイルの内容（UTF-8）
///
/// # Returns
/// * `Ok(MappingSet)` - 宣言順の項目定義
/// * `Err(Error::Parse)` - 文法違反・項目名の重複（該当行を含む）
///
/// # Examples
/// ```
/// use care_dx_common::MappingSet;
///
/// let mapping = MappingSet::parse("性別：P18（男、女）").unwrap();
/// assert_eq!(mapping.fields()[0].cell_reference.to_string(), "P18");
/// ```
pub fn parse(text: &str) -> Result<MappingSet> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut fields = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        let field = parse_line(trimmed).map_err(|reason| Error::parse(line_no, line, reason))?;

        if !seen.insert(field.label.clone()) {
            return Err(Error::parse(
                line_no,
                line,
                format!("項目名「{}」が重複しています", field.label),
            ));
        }

        fields.push(field);
    }

    tracing::debug!(fields = fields.len(), "マッピングを読み込みました");

    Ok(MappingSet { fields })
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('＃')
}

/// 1行をパース（エラー時は理由を返す）
fn parse_line(line: &str) -> std::result::Result<FieldDefinition, String> {
    let (label, rest) = line
        .split_once(SEPARATOR)
        .ok_or_else(|| format!("区切り文字「{}」がありません", SEPARATOR))?;

    let label = label.trim();
    if label.is_empty() {
        return Err("項目名が空です".into());
    }

    let (cell_text, choices) = match rest.find(CHOICES_OPEN) {
        Some(open) => {
            let inner = rest[open + CHOICES_OPEN.len_utf8()..]
                .trim_end()
                .strip_suffix(CHOICES_CLOSE)
                .ok_or_else(|| format!("選択肢が「{}」で閉じられていません", CHOICES_CLOSE))?;
            (&rest[..open], parse_choices(inner)?)
        }
        None => (rest, Vec::new()),
    };

    let cell_reference = CellRef::parse(cell_text)?;

    Ok(FieldDefinition {
        label: label.to_string(),
        cell_reference,
        choices,
    })
}

fn parse_choices(inner: &str) -> std::result::Result<Vec<String>, String> {
    let mut choices: Vec<String> = Vec::new();

    for choice in inner.split(CHOICE_SEPARATOR) {
        let choice = choice.trim();
        if choice.is_empty() {
            return Err("空の選択肢があります".into());
        }
        if choice.contains(CHOICES_CLOSE) {
            return Err(format!("選択肢「{}」に「{}」が含まれています", choice, CHOICES_CLOSE));
        }
        if choices.iter().any(|c| c == choice) {
            return Err(format!("選択肢「{}」が重複しています", choice));
        }
        choices.push(choice.to_string());
    }

    Ok(choices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# アセスメントシート
作成日：J11
区分：M11（初回、更新、区分変更）

利用者情報_氏名_漢字：D14
性別：P18（男、女）
";

    #[test]
    fn test_parse_sample() {
        let mapping = parse(SAMPLE).unwrap();
        assert_eq!(mapping.len(), 4);

        let labels: Vec<&str> = mapping.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["作成日", "区分", "利用者情報_氏名_漢字", "性別"]);

        let kubun = mapping.get("区分").unwrap();
        assert_eq!(kubun.cell_reference.to_string(), "M11");
        assert_eq!(kubun.choices, vec!["初回", "更新", "区分変更"]);

        assert!(mapping.get("作成日").unwrap().choices.is_empty());
    }

    #[test]
    fn test_parse_choices_round_trip() {
        let mapping = parse("性別：P18（男、女）").unwrap();
        let field = &mapping.fields()[0];
        assert_eq!(field.label, "性別");
        assert_eq!(field.cell_reference.to_string(), "P18");
        assert_eq!(field.choices, vec!["男", "女"]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse(SAMPLE).unwrap();
        let second = parse(SAMPLE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_trims_and_uppercases() {
        let mapping = parse("  氏名 ：  d14  ").unwrap();
        let field = &mapping.fields()[0];
        assert_eq!(field.label, "氏名");
        assert_eq!(field.cell_reference.to_string(), "D14");
    }

    #[test]
    fn test_parse_choices_with_spaces() {
        let mapping = parse("要介護度：K20（ 要支援1 、要介護1 ）").unwrap();
        assert_eq!(mapping.fields()[0].choices, vec!["要支援1", "要介護1"]);
    }

    #[test]
    fn test_parse_duplicate_label() {
        let err = parse("作成日：J11\n作成日：K11").unwrap_err();
        match err {
            Error::Parse { line_no, line, reason } => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "作成日：K11");
                assert!(reason.contains("重複"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_duplicate_cell_is_allowed() {
        // セル競合は転記時に値が揃った場合のみエラー
        let mapping = parse("作成日：J11\n記入日：J11").unwrap();
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_parse_missing_separator() {
        let err = parse("作成日 J11").unwrap_err();
        assert!(matches!(err, Error::Parse { line_no: 1, .. }));
    }

    #[test]
    fn test_parse_ascii_colon_rejected() {
        assert!(parse("作成日:J11").is_err());
    }

    #[test]
    fn test_parse_empty_label() {
        assert!(parse("：J11").is_err());
    }

    #[test]
    fn test_parse_invalid_cell() {
        assert!(parse("作成日：11J").is_err());
        assert!(parse("作成日：").is_err());
        assert!(parse("作成日：J11 K12").is_err());
    }

    #[test]
    fn test_parse_unclosed_choices() {
        let err = parse("性別：P18（男、女").unwrap_err();
        if let Error::Parse { reason, .. } = err {
            assert!(reason.contains("閉じられていません"));
        } else {
            panic!("Expected Parse error");
        }
    }

    #[test]
    fn test_parse_trailing_text_after_choices() {
        assert!(parse("性別：P18（男、女）備考").is_err());
    }

    #[test]
    fn test_parse_empty_or_duplicate_choice() {
        assert!(parse("性別：P18（）").is_err());
        assert!(parse("性別：P18（男、、女）").is_err());
        assert!(parse("性別：P18（男、男）").is_err());
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let mapping = parse("\n   \n# コメント\n＃ 全角コメント\n氏名：D14\n").unwrap();
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_parse_bom_and_crlf() {
        let mapping = parse("\u{feff}氏名：D14\r\n性別：P18（男、女）\r\n").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.fields()[1].choices, vec!["男", "女"]);
    }

    #[test]
    fn test_parse_empty_text() {
        let mapping = parse("").unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_error_reports_original_line_number() {
        let err = parse("氏名：D14\n\n# c\n性別 P18").unwrap_err();
        assert!(matches!(err, Error::Parse { line_no: 4, .. }));
    }
}
