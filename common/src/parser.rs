//! AIレスポンスパーサー
//!
//! Gemini / Claude CLIなどのレスポンスからJSONを抽出し、
//! 型付きの境界レコードを経由して `ExtractedValue` に変換する。
//!
//! 受け付ける形式:
//! - オブジェクト: `{"項目名": 値, ...}`（入れ子は `親_子` の項目名に展開）
//! - 配列: `[{"label": "項目名", "value": 値}, ...]`

use crate::error::{Error, Result};
use crate::types::ExtractedValue;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 入れ子の項目名を連結する区切り
pub const NESTED_LABEL_SEPARATOR: &str = "_";

/// AIが返す値（型が揺れるため境界で受け止める）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFieldValue {
    #[default]
    Null,
    Text(String),
    Flag(bool),
    Number(serde_json::Number),
    List(Vec<RawFieldValue>),
    Nested(OrderedFields),
}

impl RawFieldValue {
    /// 文字列に変換（null は空、リストは「、」区切り）
    pub fn into_text(self) -> String {
        match self {
            RawFieldValue::Null => String::new(),
            RawFieldValue::Text(text) => text,
            RawFieldValue::Flag(flag) => flag.to_string(),
            RawFieldValue::Number(number) => number.to_string(),
            RawFieldValue::List(items) => items
                .into_iter()
                .map(RawFieldValue::into_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("、"),
            nested @ RawFieldValue::Nested(_) => serde_json::to_string(&nested).unwrap_or_default(),
        }
    }
}

/// 出現順・重複をそのまま保持するJSONオブジェクト
///
/// 同じキーが2回現れても後勝ちで潰さず、両方を正規化に渡す。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedFields(pub Vec<(String, RawFieldValue)>);

impl<'de> Deserialize<'de> for OrderedFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = OrderedFields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, RawFieldValue>()? {
                    entries.push((key, value));
                }
                Ok(OrderedFields(entries))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

impl Serialize for OrderedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 配列形式の1レコード
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRecord {
    #[serde(alias = "項目名", alias = "name")]
    pub label: String,
    #[serde(default, alias = "値", alias = "rawText", alias = "text")]
    pub value: RawFieldValue,
}

/// レスポンス全体
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExtractionPayload {
    Records(Vec<ExtractionRecord>),
    Object(OrderedFields),
}

impl ExtractionPayload {
    /// `ExtractedValue` の列に変換
    pub fn into_values(self) -> Vec<ExtractedValue> {
        let mut values = Vec::new();
        match self {
            ExtractionPayload::Records(records) => {
                for record in records {
                    push_flattened(&mut values, record.label, record.value);
                }
            }
            ExtractionPayload::Object(OrderedFields(entries)) => {
                for (label, value) in entries {
                    push_flattened(&mut values, label, value);
                }
            }
        }
        values
    }
}

fn push_flattened(values: &mut Vec<ExtractedValue>, label: String, value: RawFieldValue) {
    match value {
        RawFieldValue::Nested(OrderedFields(children)) => {
            for (child, child_value) in children {
                let nested_label = format!("{}{}{}", label, NESTED_LABEL_SEPARATOR, child);
                push_flattened(values, nested_label, child_value);
            }
        }
        other => values.push(ExtractedValue {
            label: label.trim().to_string(),
            raw_text: other.into_text(),
        }),
    }
}

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. ``` ... ``` ブロック
/// 3. 生の {...} または [...]（先に現れた方）
/// 4. エラー
///
/// # Examples
/// ```
/// use care_dx_common::extract_json;
///
/// let response = "結果です: {\"氏名\": \"山田\"}";
/// assert_eq!(extract_json(response).unwrap(), "{\"氏名\": \"山田\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(block) = fenced_block(response, "```json").or_else(|| fenced_block(response, "```")) {
        return Ok(block);
    }

    let object = response.find('{').map(|s| (s, '}'));
    let array = response.find('[').map(|s| (s, ']'));
    let first = match (object, array) {
        (Some(o), Some(a)) => Some(if o.0 < a.0 { o } else { a }),
        (o, a) => o.or(a),
    };

    if let Some((start, close)) = first {
        if let Some(end) = response.rfind(close) {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Response("JSONが見つかりません".into()))
}

fn fenced_block<'a>(response: &'a str, marker: &str) -> Option<&'a str> {
    let start = response.find(marker)? + marker.len();
    let end = start + response[start..].find("```")?;
    Some(response[start..end].trim())
}

/// 抽出レスポンスをパース
///
/// # Arguments
/// * `response` - AIのレスポンス文字列
///
/// # Returns
/// * `Ok(Vec<ExtractedValue>)` - パース成功
/// * `Err` - JSONが見つからないか形式が不正
pub fn parse_extraction_response(response: &str) -> Result<Vec<ExtractedValue>> {
    let json_str = extract_json(response)?;
    let payload: ExtractionPayload = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Response(format!("抽出結果 JSONパースエラー: {}", e)))?;
    Ok(payload.into_values())
}
