//! キャッシュ機能テスト
//!
//! 抽出結果キャッシュの動作を検証

use care_dx::extractor::cache::CacheFile;
use care_dx_common::ExtractedValue;
use tempfile::tempdir;

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = CacheFile::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut cache = CacheFile::load(dir.path());
    cache.insert(
        "abc123".to_string(),
        vec!["assessment.pdf".to_string(), "meeting.m4a".to_string()],
        vec![
            ExtractedValue::new("性別", "女"),
            ExtractedValue::new("要介護度", "要介護2"),
        ],
    );
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let loaded = CacheFile::load(dir.path());
    assert_eq!(loaded.len(), 1);

    let values = loaded.get("abc123").expect("キャッシュが見つからない");
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], ExtractedValue::new("性別", "女"));
    assert!(loaded.get("unknown").is_none());
}

/// キャッシュファイルの削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");

    // 存在しない場合
    assert!(!CacheFile::clear(dir.path()).unwrap());

    let mut cache = CacheFile::load(dir.path());
    cache.insert("key".to_string(), vec!["a.pdf".to_string()], Vec::new());
    cache.save(dir.path()).unwrap();
    assert!(CacheFile::cache_path(dir.path()).exists());

    assert!(CacheFile::clear(dir.path()).unwrap());
    assert!(!CacheFile::cache_path(dir.path()).exists());
}

/// キャッシュファイル名
#[test]
fn test_cache_path() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert_eq!(
        CacheFile::cache_path(dir.path()),
        dir.path().join(".extraction-cache.json")
    );
}
