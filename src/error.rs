use thiserror::Error;

#[derive(Error, Debug)]
pub enum CareDxError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`care-dx config --set-api-key YOUR_KEY` または環境変数 GEMINI_API_KEY で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していないファイル形式です: {0}")]
    UnsupportedFile(String),

    #[error("ファイルサイズが上限を超えています: {path} ({size_mb:.1}MB > {limit_mb}MB)")]
    FileTooLarge {
        path: String,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("書類が指定されていません: {0}")]
    NoDocumentsFound(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("AIが応答をブロックしました: {0}")]
    ApiBlocked(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("転記結果の検証に失敗: {0}")]
    Verification(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("転記を中止しました")]
    Aborted,

    #[error(transparent)]
    Common(#[from] care_dx_common::Error),
}

pub type Result<T> = std::result::Result<T, CareDxError>;
