//! Claude CLI連携モジュール
//!
//! 書類は絶対パスでプロンプトに埋め込み、CLI側で読ませる。
//! 音声ファイルは扱えない。

use super::{Attachment, BackendReply, ExtractionBackend};
use crate::error::{CareDxError, Result};
use crate::scanner::DocumentKind;
use tokio::process::Command;

#[derive(Debug, Default)]
pub struct ClaudeCliBackend {
    verbose: bool,
}

impl ClaudeCliBackend {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ExtractionBackend for ClaudeCliBackend {
    fn name(&self) -> &str {
        "Claude CLI"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind != DocumentKind::Audio
    }

    async fn generate(&self, prompt: &str, attachments: &[Attachment]) -> Result<BackendReply> {
        let full_prompt = build_cli_prompt(prompt, attachments)?;

        if self.verbose {
            println!("  [Claude] プロンプト長: {} chars", full_prompt.len());
        }

        let response = run_claude_cli(&full_prompt).await?;

        if self.verbose {
            println!("  [Claude] レスポンス長: {} chars", response.len());
        }

        if response.trim().is_empty() {
            return Ok(BackendReply::Blocked("空の応答".to_string()));
        }

        Ok(BackendReply::Text(response))
    }
}

/// ファイル一覧を先頭に付け、改行をスペースに置換する
///
/// 引用符のエスケープはcmd経由で渡すWindowsのみ。それ以外は引数をそのまま渡す。
fn build_cli_prompt(prompt: &str, attachments: &[Attachment]) -> Result<String> {
    let mut paths = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let abs_path = std::fs::canonicalize(&attachment.document.path)?;
        paths.push(abs_path.display().to_string().replace('\\', "/"));
    }

    let raw_prompt = format!(
        "Read the following files and extract the fields: {}\n\n{}",
        paths.join(", "),
        prompt
    );
    let prompt = raw_prompt.replace('\n', " ");
    #[cfg(windows)]
    let prompt = prompt.replace('"', "\\\"");
    Ok(prompt)
}

async fn run_claude_cli(prompt: &str) -> Result<String> {
    // Windowsではcmd /c経由
    #[cfg(windows)]
    let output = Command::new("cmd")
        .args(["/c", "claude", "-p", prompt, "--output-format", "text"])
        .output()
        .await
        .map_err(|e| CareDxError::CliExecution(format!("Claude CLI実行エラー: {}", e)))?;

    #[cfg(not(windows))]
    let output = Command::new("claude")
        .args(["-p", prompt, "--output-format", "text"])
        .output()
        .await
        .map_err(|e| CareDxError::CliExecution(format!("Claude CLI実行エラー: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CareDxError::CliExecution(format!(
            "Claude CLI failed (code {:?}): {}",
            output.status.code(),
            stderr
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
