//! ログ初期化（tracing）
//!
//! 進捗表示は標準出力、診断ログは標準エラーへ出す。
//! 抽出値は介護記録のため、ログには項目名・セルのみを出し値は出さない。

use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` が未設定のときの既定フィルタ
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "care_dx=debug,care_dx_common=debug"
    } else {
        "warn"
    }
}

/// ログを初期化（二重初期化は無視）
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "warn");
        assert!(default_directive(true).contains("care_dx=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(false);
        init_logging(true);
    }
}
