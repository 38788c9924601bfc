//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    /// マッピングファイルの文法エラー・重複定義
    #[error("マッピング {line_no}行目: {reason}「{line}」")]
    Parse {
        line_no: usize,
        line: String,
        reason: String,
    },

    /// 同じセルに2つの項目の値が書き込まれようとした
    #[error("セル競合: {cell} に「{first}」と「{second}」の両方が割り当てられています")]
    CellConflict {
        cell: String,
        first: String,
        second: String,
    },

    /// AIレスポンスの形式が不正
    #[error("レスポンス解析エラー: {0}")]
    Response(String),

    /// 行・列がシートの範囲に収まらない
    #[error("セル範囲エラー: {0}")]
    Range(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line_no: usize, line: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            line_no,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
