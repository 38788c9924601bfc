use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "care-dx")]
#[command(about = "介護帳票AI抽出・スプレッドシート自動転記ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (gemini/claude)
    #[arg(long, default_value = "gemini", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// マッピングファイルを検査して項目一覧を表示
    Check {
        /// マッピングファイル（項目名：セル（選択肢、…））
        #[arg(required = true)]
        mapping: PathBuf,
    },

    /// 書類から項目を抽出してJSONを出力
    Extract {
        /// 書類ファイルまたはフォルダ（PDF/画像/音声）
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// マッピングファイル
        #[arg(short, long)]
        mapping: PathBuf,

        /// 出力JSONファイル（デフォルト: extracted.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// キャッシュを使用（再抽出をスキップ）
        #[arg(long)]
        use_cache: bool,
    },

    /// 抽出結果JSONを正規化してスプレッドシートに転記
    Transcribe {
        /// 抽出結果JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        #[command(flatten)]
        options: TranscribeOptions,
    },

    /// 抽出から転記まで一括実行
    Run {
        /// 書類ファイルまたはフォルダ（PDF/画像/音声）
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// キャッシュを使用（再抽出をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// 抽出結果JSONも保存する
        #[arg(long)]
        save_extracted: Option<PathBuf>,

        #[command(flatten)]
        options: TranscribeOptions,
    },

    /// 会議音声からサービス担当者会議録の1行を作成
    Meeting {
        /// 会議の音声ファイルまたはフォルダ
        #[arg(required = true)]
        audio: Vec<PathBuf>,

        /// 記録シートのExcel（1行目の見出しに合わせて末尾に追加）
        #[arg(long)]
        template: Option<PathBuf>,

        /// 出力ファイル/ディレクトリ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (xlsx/json/both)
        #[arg(short, long, default_value = "xlsx")]
        format: ExportFormat,

        /// シート名（省略時は設定値または Sheet1）
        #[arg(long)]
        sheet_name: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 使用モデルを設定
        #[arg(long)]
        set_model: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

/// 転記オプション（transcribe / run 共通）
#[derive(clap::Args, Clone, Debug)]
pub struct TranscribeOptions {
    /// マッピングファイル
    #[arg(short, long)]
    pub mapping: PathBuf,

    /// 出力ファイル/ディレクトリ（デフォルト: カレント）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 出力形式 (xlsx/json/both)
    #[arg(short, long, default_value = "xlsx")]
    pub format: ExportFormat,

    /// シート名（省略時は設定値または Sheet1）
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// 帳票名（出力ファイル名に使用）
    #[arg(short, long, default_value = "アセスメント")]
    pub title: String,

    /// 選択肢に一致しない値を転記しない
    #[arg(long)]
    pub skip_unverified: bool,

    /// 確認なしで転記
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    /// Google Sheets `values:batchUpdate` の本文
    Json,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "json" | "sheets" => Ok(ExportFormat::Json),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use xlsx, json, or both", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Xlsx => write!(f, "xlsx"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "care-dx", "run", "docs", "-m", "mapping.txt", "--format", "both", "-y", "--ai-provider", "claude",
        ])
        .unwrap();

        assert_eq!(cli.ai_provider, AiProvider::Claude);
        match cli.command {
            Commands::Run { documents, options, use_cache, .. } => {
                assert_eq!(documents, vec![PathBuf::from("docs")]);
                assert_eq!(options.mapping, PathBuf::from("mapping.txt"));
                assert_eq!(options.format, ExportFormat::Both);
                assert!(options.yes);
                assert!(!options.skip_unverified);
                assert!(!use_cache);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_meeting_command() {
        let cli = Cli::try_parse_from([
            "care-dx", "meeting", "会議.m4a", "--template", "会議録.xlsx", "--sheet-name", "会議録", "-f", "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Meeting { audio, template, format, sheet_name, output } => {
                assert_eq!(audio, vec![PathBuf::from("会議.m4a")]);
                assert_eq!(template, Some(PathBuf::from("会議録.xlsx")));
                assert_eq!(format, ExportFormat::Json);
                assert_eq!(sheet_name.as_deref(), Some("会議録"));
                assert!(output.is_none());
            }
            _ => panic!("expected meeting"),
        }
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("sheets".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
