//! サービス担当者会議録
//!
//! 会議音声から決まった項目（開催日・検討内容・結論など）を要約させ、
//! 記録シートの見出し行に合わせて1行分の値を並べる。

use crate::cell::CellRef;
use crate::error::{Error, Result};
use crate::types::{ExtractedValue, WriteInstruction};

/// 要約させる項目（出力JSONのキー）
pub const SERVICE_MEETING_KEYS: [&str; 9] = [
    "開催日",
    "開催場所",
    "開催時間",
    "開催回数",
    "担当者名",
    "利用者名",
    "検討内容",
    "検討した項目",
    "結論",
];

/// 会議録の帳票名（出力ファイル名に使用）
pub const SERVICE_MEETING_TITLE: &str = "サービス担当者会議議事録";

/// 会議音声の要約プロンプト
pub fn build_service_meeting_prompt() -> String {
    let keys = SERVICE_MEETING_KEYS
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"あなたは、ケアマネジメントの専門知識を有する、医療・福祉分野のプロの記録担当者です。
添付されたサービス担当者会議の音声を聞き取り、指定された項目を抽出・要約してください。

## 出力要件
次のキーを持つJSONオブジェクトのみを出力してください: {keys}
値はマークダウンを含まないプレーンテキストとし、改行は \n で表してください。

- "開催日": 日付のみ（例: 2025年4月1日）
- "開催場所": 場所のみ
- "開催時間": 時間のみ（例: 10:00~11:00）
- "開催回数": 回数のみ（例: 1）
- "担当者名": 名前のみ
- "利用者名": 名前のみ
- "検討内容": 【本人及び家族の意向】【会議の結論・ケアプラン詳細】各事業所の役割分担、福祉用具・住宅改修等 の形式でまとめる
- "検討した項目": 1.【会議の目的】 2.【暫定プランに関する事項】 3.【重要事項の抽出】 の形式でまとめる
- "結論": 決定事項・今後の方針・モニタリング点を箇条書きで6~8項目程度

## 出力例
{{
  "開催日": "2025年4月1日",
  "開催場所": "自宅",
  "開催時間": "10:00~11:00",
  "開催回数": "1",
  "担当者名": "介護 太郎",
  "利用者名": "福祉 花子",
  "検討内容": "【本人及び家族の意向】\n・本人⇒...",
  "検討した項目": "1. 【会議の目的】...",
  "結論": "1. ..."
}}"#
    )
}

/// 要約結果に含まれなかった項目
pub fn missing_meeting_keys(values: &[ExtractedValue]) -> Vec<&'static str> {
    SERVICE_MEETING_KEYS
        .iter()
        .filter(|key| !values.iter().any(|v| v.label == **key))
        .copied()
        .collect()
}

/// 見出し行に合わせて1行分の値を並べる
///
/// 見出しごとに、項目名が見出しを含むか見出しが項目名を含む最初の値を使う。
/// 空の見出しと一致しない見出しは空文字。
///
/// # Examples
/// ```
/// use care_dx_common::meeting::build_meeting_row;
/// use care_dx_common::ExtractedValue;
///
/// let headers = vec!["開催日時".to_string(), "結論".to_string(), "備考".to_string()];
/// let values = vec![ExtractedValue::new("開催日", "2025年4月1日"), ExtractedValue::new("結論", "継続")];
/// assert_eq!(build_meeting_row(&headers, &values), vec!["2025年4月1日", "継続", ""]);
/// ```
pub fn build_meeting_row(headers: &[String], values: &[ExtractedValue]) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            let header = header.trim();
            if header.is_empty() {
                return String::new();
            }
            values
                .iter()
                .find(|v| {
                    let label = v.label.trim();
                    !label.is_empty() && (header.contains(label) || label.contains(header))
                })
                .map(|v| v.raw_text.trim().to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// 既定の見出し（シートがない場合）
pub fn default_meeting_headers() -> Vec<String> {
    SERVICE_MEETING_KEYS.iter().map(|k| k.to_string()).collect()
}

/// 表を `first_row` 行目（1始まり）から左詰めで書き込む指示にする
///
/// 空文字のセルも空欄として指示に含める。
pub fn table_instructions(rows: &[Vec<String>], first_row: u32) -> Result<Vec<WriteInstruction>> {
    let mut instructions = Vec::new();

    for (offset, row) in rows.iter().enumerate() {
        let row_no = u32::try_from(offset)
            .ok()
            .and_then(|offset| first_row.checked_add(offset))
            .ok_or_else(|| Error::Range(format!("{}行目以降に{}行は書き込めません", first_row, rows.len())))?;

        for (idx, value) in row.iter().enumerate() {
            let column = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            let cell_reference = CellRef::from_position(row_no, column).map_err(Error::Range)?;
            instructions.push(WriteInstruction {
                cell_reference,
                value: value.clone(),
            });
        }
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Vec<ExtractedValue> {
        vec![
            ExtractedValue::new("開催日", "2025年4月1日"),
            ExtractedValue::new("開催場所", "自宅"),
            ExtractedValue::new("利用者名", "福祉 花子"),
            ExtractedValue::new("結論", " 1. サービス継続 "),
        ]
    }

    #[test]
    fn test_prompt_lists_all_keys() {
        let prompt = build_service_meeting_prompt();
        for key in SERVICE_MEETING_KEYS {
            assert!(prompt.contains(&format!("\"{}\"", key)), "{} がない", key);
        }
        assert!(prompt.contains("JSONオブジェクトのみ"));
    }

    #[test]
    fn test_row_follows_header_order() {
        let headers: Vec<String> = ["結論", "利用者名", "開催日"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            build_meeting_row(&headers, &values()),
            vec!["1. サービス継続", "福祉 花子", "2025年4月1日"]
        );
    }

    #[test]
    fn test_row_matches_by_containment_both_ways() {
        // 見出しが項目名を含む / 項目名が見出しを含む
        let headers: Vec<String> = ["開催日（曜日）", "場所"].iter().map(|s| s.to_string()).collect();
        assert_eq!(build_meeting_row(&headers, &values()), vec!["2025年4月1日", "自宅"]);
    }

    #[test]
    fn test_row_first_match_wins() {
        // 「開催」は開催日・開催場所の両方に含まれる
        let headers = vec!["開催".to_string()];
        assert_eq!(build_meeting_row(&headers, &values()), vec!["2025年4月1日"]);
    }

    #[test]
    fn test_row_blank_and_unmatched_headers() {
        let headers: Vec<String> = ["", "備考", "  "].iter().map(|s| s.to_string()).collect();
        assert_eq!(build_meeting_row(&headers, &values()), vec!["", "", ""]);
    }

    #[test]
    fn test_missing_meeting_keys() {
        let missing = missing_meeting_keys(&values());
        assert_eq!(
            missing,
            vec!["開催時間", "開催回数", "担当者名", "検討内容", "検討した項目"]
        );
    }

    #[test]
    fn test_table_instructions() {
        let rows = vec![
            vec!["開催日".to_string(), "結論".to_string()],
            vec!["2025年4月1日".to_string(), String::new()],
        ];
        let instructions = table_instructions(&rows, 3).unwrap();

        let cells: Vec<String> = instructions.iter().map(|i| i.cell_reference.to_string()).collect();
        assert_eq!(cells, vec!["A3", "B3", "A4", "B4"]);
        assert_eq!(instructions[2].value, "2025年4月1日");
        assert_eq!(instructions[3].value, "");
    }

    #[test]
    fn test_table_instructions_past_last_row() {
        let rows = vec![vec!["a".to_string()], vec!["b".to_string()]];
        let result = table_instructions(&rows, crate::cell::MAX_ROW);
        assert!(matches!(result, Err(Error::Range(_))));
    }

    #[test]
    fn test_default_headers() {
        let headers = default_meeting_headers();
        assert_eq!(headers.len(), 9);
        assert_eq!(headers[0], "開催日");
        assert_eq!(
            build_meeting_row(&headers, &values())[5],
            "福祉 花子"
        );
    }
}
