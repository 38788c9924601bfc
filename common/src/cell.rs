//! セル参照（A1形式）
//!
//! 列文字 + 行番号の厳密な形式のみを受け付ける。
//! 列文字は大文字に正規化する。

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref CELL_REF: Regex = Regex::new(r"^([A-Za-z]+)([0-9]+)$").unwrap();
}

/// Excelの最大列（XFD）
pub const MAX_COLUMN: u32 = 16_384;
/// Excelの最大行
pub const MAX_ROW: u32 = 1_048_576;

/// 検証済みのセル参照
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    column: String,
    row: u32,
}

impl CellRef {
    /// A1形式の文字列をパース
    ///
    /// 前後の空白は除去し、列文字は大文字にする。
    /// 形式不正の場合はエラー理由を返す。
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let caps = CELL_REF
            .captures(text)
            .ok_or_else(|| format!("セル参照「{}」は列文字+行番号の形式ではありません", text))?;

        let column = caps[1].to_ascii_uppercase();
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| format!("行番号「{}」が大きすぎます", &caps[2]))?;

        if row == 0 || row > MAX_ROW {
            return Err(format!("行番号 {} は範囲外です (1-{})", row, MAX_ROW));
        }
        if column_number(&column).map_or(true, |n| n > MAX_COLUMN) {
            return Err(format!("列「{}」は範囲外です (A-XFD)", column));
        }

        Ok(Self { column, row })
    }

    /// 1始まりの行番号・列番号から作る
    pub fn from_position(row: u32, column: u32) -> Result<Self, String> {
        if row == 0 || row > MAX_ROW {
            return Err(format!("行番号 {} は範囲外です (1-{})", row, MAX_ROW));
        }
        if column == 0 || column > MAX_COLUMN {
            return Err(format!("列番号 {} は範囲外です (1-{})", column, MAX_COLUMN));
        }
        Ok(Self {
            column: column_letters(column),
            row,
        })
    }

    /// 列文字（大文字）
    pub fn column(&self) -> &str {
        &self.column
    }

    /// 行番号（1始まり）
    pub fn row(&self) -> u32 {
        self.row
    }

    /// 0始まりの (row, col) 座標
    pub fn zero_based(&self) -> (u32, u16) {
        // parseで範囲検証済み
        let col = column_number(&self.column).unwrap_or(1) - 1;
        (self.row - 1, col as u16)
    }
}

/// 列文字を1始まりの列番号に変換（A=1, Z=26, AA=27）
fn column_number(column: &str) -> Option<u32> {
    column.chars().try_fold(0u32, |acc, c| {
        let digit = (c as u32).checked_sub('A' as u32)? + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// 1始まりの列番号を列文字に変換（1=A, 27=AA）
fn column_letters(mut number: u32) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        number = (number - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellRef> for String {
    fn from(cell: CellRef) -> Self {
        cell.to_string()
    }
}
