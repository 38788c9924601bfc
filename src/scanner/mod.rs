use crate::error::{CareDxError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Audio,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    pub kind: DocumentKind,
    pub size: u64,
}

impl Document {
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// 拡張子 → (MIMEタイプ, 種別)
const SUPPORTED_TYPES: &[(&str, &str, DocumentKind)] = &[
    ("pdf", "application/pdf", DocumentKind::Pdf),
    ("png", "image/png", DocumentKind::Image),
    ("jpg", "image/jpeg", DocumentKind::Image),
    ("jpeg", "image/jpeg", DocumentKind::Image),
    ("webp", "image/webp", DocumentKind::Image),
    ("mp3", "audio/mp3", DocumentKind::Audio),
    ("wav", "audio/wav", DocumentKind::Audio),
    ("m4a", "audio/m4a", DocumentKind::Audio),
    ("aac", "audio/aac", DocumentKind::Audio),
    ("ogg", "audio/ogg", DocumentKind::Audio),
    ("flac", "audio/flac", DocumentKind::Audio),
];

fn lookup_type(path: &Path) -> Option<(&'static str, DocumentKind)> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    SUPPORTED_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, mime, kind)| (*mime, *kind))
}

/// 入力パス（ファイルまたはフォルダ）から書類を収集
///
/// フォルダは直下のみを対象とし、ファイル名でソートする。
/// 明示的に指定したファイルが未対応形式の場合はエラー。
pub fn scan_documents(inputs: &[PathBuf], max_file_size_mb: u64) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(CareDxError::FileNotFound(input.display().to_string()));
        }

        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input)
                .max_depth(1) // 直下のみ（再帰しない）
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && lookup_type(path).is_some() {
                    found.push(load_document(path, max_file_size_mb)?);
                }
            }
            found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
            documents.extend(found);
        } else {
            documents.push(load_document(input, max_file_size_mb)?);
        }
    }

    tracing::debug!(count = documents.len(), "書類を検出");

    Ok(documents)
}

fn load_document(path: &Path, max_file_size_mb: u64) -> Result<Document> {
    let (mime_type, kind) = lookup_type(path)
        .ok_or_else(|| CareDxError::UnsupportedFile(path.display().to_string()))?;

    let size = std::fs::metadata(path)?.len();
    if size > max_file_size_mb.saturating_mul(1024 * 1024) {
        return Err(CareDxError::FileTooLarge {
            path: path.display().to_string(),
            size_mb: size as f64 / (1024.0 * 1024.0),
            limit_mb: max_file_size_mb,
        });
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Document {
        path: path.to_path_buf(),
        file_name,
        mime_type,
        kind,
        size,
    })
}
