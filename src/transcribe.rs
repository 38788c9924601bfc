//! 転記前の確認
//!
//! 正規化の警告を種類ごとにまとめて表示し、選択肢に一致しなかった値を
//! 書き込むかどうかを決めてから転記指示を生成する。
//! セル競合は確認やファイルの書き出しより前にエラーになる。

use crate::cli::TranscribeOptions;
use crate::config::Config;
use crate::error::{CareDxError, Result};
use crate::export::{self, ExportedFiles};
use care_dx_common::{
    build_instructions, normalize, parse_extraction_response, ExtractedValue, MappingSet, Warning,
    WriteInstruction,
};
use chrono::NaiveDate;
use dialoguer::Confirm;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 利用者名が見つからない場合のファイル名
const UNKNOWN_USER: &str = "利用者未定";

/// 未確認の値の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnverifiedPolicy {
    /// 書き込む前に確認する
    Confirm,
    /// 確認せずに書き込む（-y）
    Accept,
    /// 書き込まない（--skip-unverified）
    Skip,
}

impl UnverifiedPolicy {
    pub fn from_flags(skip_unverified: bool, assume_yes: bool) -> Self {
        if skip_unverified {
            UnverifiedPolicy::Skip
        } else if assume_yes {
            UnverifiedPolicy::Accept
        } else {
            UnverifiedPolicy::Confirm
        }
    }
}

/// 転記準備の結果
#[derive(Debug)]
pub struct PreparedTranscription {
    pub instructions: Vec<WriteInstruction>,
    /// 正規化後の全値（ファイル名の決定に使う）
    pub values: HashMap<String, String>,
    pub warnings: Vec<Warning>,
    /// 書き込みから外した項目数
    pub skipped_unverified: usize,
}

/// 抽出値を正規化して転記指示を作る
///
/// 警告は確認の前に表示する。
/// `confirm` は未確認の値があり `policy` が `Confirm` のときだけ、
/// セル競合がないことを確かめてから呼ばれる。
pub fn prepare<F>(
    mapping: &MappingSet,
    extracted: &[ExtractedValue],
    policy: UnverifiedPolicy,
    confirm: F,
) -> Result<PreparedTranscription>
where
    F: FnOnce(usize) -> Result<bool>,
{
    let normalized = normalize(mapping, extracted);
    print_warnings(&normalized.warnings);

    let unverified = normalized.unverified_labels().len();

    let (values_to_write, skipped_unverified) = match policy {
        UnverifiedPolicy::Skip if unverified > 0 => (normalized.verified_values(), unverified),
        _ => (normalized.values.clone(), 0),
    };

    let instructions = build_instructions(mapping, &values_to_write)?;

    if policy == UnverifiedPolicy::Confirm && unverified > 0 && !confirm(unverified)? {
        return Err(CareDxError::Aborted);
    }

    tracing::debug!(
        instructions = instructions.len(),
        warnings = normalized.warnings.len(),
        skipped_unverified,
        "転記準備完了"
    );

    Ok(PreparedTranscription {
        instructions,
        values: normalized.values,
        warnings: normalized.warnings,
        skipped_unverified,
    })
}

/// 正規化・確認・書き出しまでを行う
///
/// 出力先は `options.output`（省略時はカレント）、ファイル名は利用者名・当日の日付・帳票名から決める。
/// エラーになった場合は何も書き出さない。
pub fn transcribe_to_files<F>(
    mapping: &MappingSet,
    extracted: &[ExtractedValue],
    options: &TranscribeOptions,
    config: &Config,
    confirm: F,
) -> Result<ExportedFiles>
where
    F: FnOnce(usize) -> Result<bool>,
{
    let policy = UnverifiedPolicy::from_flags(options.skip_unverified, options.yes);

    let prepared = prepare(mapping, extracted, policy, confirm)?;
    if prepared.skipped_unverified > 0 {
        println!("- 未確認の{}項目は転記しません", prepared.skipped_unverified);
    }

    let sheet_name = options.sheet_name.as_deref().unwrap_or_else(|| config.sheet_name());
    let file_stem = default_file_stem(
        &prepared.values,
        &config.name_labels,
        chrono::Local::now().date_naive(),
        &options.title,
    );
    let output = options.output.clone().unwrap_or_else(|| PathBuf::from("."));

    export::export_instructions(&prepared.instructions, options.format, &output, &file_stem, sheet_name)
}

/// 抽出結果JSONを読み込む
///
/// `extract` の出力のほか、AIの生応答（オブジェクト形式）もそのまま読める。
pub fn load_extracted(path: &Path) -> Result<Vec<ExtractedValue>> {
    if !path.exists() {
        return Err(CareDxError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_extraction_response(&content)?)
}

/// 対話的に確認（dialoguer）
pub fn confirm_unverified(count: usize) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("選択肢に一致しない値が{}件あります。このまま転記しますか?", count))
        .default(false)
        .interact()
        .map_err(|e| CareDxError::CliExecution(e.to_string()))
}

/// 警告を種類ごとにまとめて表示
pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }

    println!("⚠ 警告 {}件", warnings.len());
    for (title, group) in group_warnings(warnings) {
        println!("  [{}] {}件", title, group.len());
        for warning in group {
            println!("    - {}", warning);
        }
    }
}

/// 種類ごとにまとめる（表示順は固定）
fn group_warnings(warnings: &[Warning]) -> Vec<(&'static str, Vec<&Warning>)> {
    let kinds: [(&'static str, fn(&Warning) -> bool); 4] = [
        ("選択肢不一致", |w| matches!(w, Warning::UnresolvedChoice { .. })),
        ("未抽出", |w| matches!(w, Warning::MissingField { .. })),
        ("マッピング外", |w| matches!(w, Warning::OrphanField { .. })),
        ("重複", |w| matches!(w, Warning::DuplicateExtraction { .. })),
    ];

    kinds
        .iter()
        .map(|(title, is_kind)| (*title, warnings.iter().filter(|w| is_kind(w)).collect::<Vec<_>>()))
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

/// 出力ファイル名（拡張子なし）: `{利用者名}_{YYYYMMDD}_{title}`
pub fn default_file_stem(
    values: &HashMap<String, String>,
    name_labels: &[String],
    date: NaiveDate,
    title: &str,
) -> String {
    let user_name = name_labels
        .iter()
        .filter_map(|label| values.get(label))
        .map(|name| name.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.to_string());

    format!("{}_{}_{}", sanitize(&user_name), date.format("%Y%m%d"), sanitize(title))
}

/// ファイル名に使えない文字を置換
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_dx_common::Error;

    fn mapping() -> MappingSet {
        MappingSet::parse("氏名：D5\n区分：M11（初回、更新）\n性別：P18（男、女）").unwrap()
    }

    fn extracted() -> Vec<ExtractedValue> {
        vec![
            ExtractedValue::new("氏名", "山田 花子"),
            ExtractedValue::new("区分", "再アセスメント"),
            ExtractedValue::new("性別", "女性"),
        ]
    }

    #[test]
    fn test_policy_from_flags() {
        assert_eq!(UnverifiedPolicy::from_flags(true, true), UnverifiedPolicy::Skip);
        assert_eq!(UnverifiedPolicy::from_flags(false, true), UnverifiedPolicy::Accept);
        assert_eq!(UnverifiedPolicy::from_flags(false, false), UnverifiedPolicy::Confirm);
    }

    #[test]
    fn test_prepare_skip_unverified() {
        let prepared = prepare(&mapping(), &extracted(), UnverifiedPolicy::Skip, |_| {
            panic!("確認は呼ばれない")
        })
        .unwrap();

        let cells: Vec<String> = prepared
            .instructions
            .iter()
            .map(|i| i.cell_reference.to_string())
            .collect();
        assert_eq!(cells, vec!["D5", "P18"]);
        assert_eq!(prepared.instructions[1].value, "女");
        assert_eq!(prepared.skipped_unverified, 1);
    }

    #[test]
    fn test_prepare_confirm_accepted() {
        let mut asked = 0;
        let prepared = prepare(&mapping(), &extracted(), UnverifiedPolicy::Confirm, |count| {
            asked = count;
            Ok(true)
        })
        .unwrap();

        assert_eq!(asked, 1);
        assert_eq!(prepared.instructions.len(), 3);
        assert_eq!(prepared.instructions[1].value, "再アセスメント");
    }

    #[test]
    fn test_prepare_confirm_declined() {
        let result = prepare(&mapping(), &extracted(), UnverifiedPolicy::Confirm, |_| Ok(false));
        assert!(matches!(result, Err(CareDxError::Aborted)));
    }

    #[test]
    fn test_prepare_no_confirm_when_all_resolved() {
        let extracted = vec![ExtractedValue::new("性別", "男")];
        let prepared = prepare(&mapping(), &extracted, UnverifiedPolicy::Confirm, |_| {
            panic!("確認は呼ばれない")
        })
        .unwrap();
        assert_eq!(prepared.instructions.len(), 1);
    }

    #[test]
    fn test_prepare_cell_conflict() {
        let mapping = MappingSet::parse("作成日：J11\n記入日：J11").unwrap();
        let extracted = vec![
            ExtractedValue::new("作成日", "令和7年4月1日"),
            ExtractedValue::new("記入日", "令和7年4月2日"),
        ];
        let result = prepare(&mapping, &extracted, UnverifiedPolicy::Accept, |_| Ok(true));
        assert!(matches!(result, Err(CareDxError::Common(Error::CellConflict { .. }))));
    }

    #[test]
    fn test_prepare_conflict_reported_before_confirm() {
        let mapping = MappingSet::parse("作成日：J11\n記入日：J11\n区分：M11（初回、更新）").unwrap();
        let extracted = vec![
            ExtractedValue::new("作成日", "令和7年4月1日"),
            ExtractedValue::new("記入日", "令和7年4月2日"),
            ExtractedValue::new("区分", "再アセスメント"),
        ];
        let result = prepare(&mapping, &extracted, UnverifiedPolicy::Confirm, |_| {
            panic!("競合があるときは確認しない")
        });
        assert!(matches!(result, Err(CareDxError::Common(Error::CellConflict { .. }))));
    }

    #[test]
    fn test_prepare_skip_avoids_conflict_with_unverified() {
        // 未確認の値を外せば競合しない
        let mapping = MappingSet::parse("区分：M11（初回、更新）\n備考：M11").unwrap();
        let extracted = vec![
            ExtractedValue::new("区分", "再アセスメント"),
            ExtractedValue::new("備考", "特になし"),
        ];
        let prepared = prepare(&mapping, &extracted, UnverifiedPolicy::Skip, |_| {
            panic!("確認は呼ばれない")
        })
        .unwrap();
        assert_eq!(prepared.instructions.len(), 1);
        assert_eq!(prepared.instructions[0].value, "特になし");
    }

    #[test]
    fn test_group_warnings_order() {
        let warnings = vec![
            Warning::MissingField { label: "住所".into() },
            Warning::OrphanField { label: "備考".into() },
            Warning::UnresolvedChoice {
                label: "区分".into(),
                raw_text: "再".into(),
                choices: vec!["初回".into()],
            },
        ];
        let titles: Vec<&str> = group_warnings(&warnings).iter().map(|(t, _)| *t).collect();
        assert_eq!(titles, vec!["選択肢不一致", "未抽出", "マッピング外"]);
    }

    #[test]
    fn test_default_file_stem() {
        let labels = vec!["利用者情報_氏名_漢字".to_string(), "氏名".to_string()];
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();

        let mut values = HashMap::new();
        values.insert("氏名".to_string(), "山田　花子".to_string());
        assert_eq!(
            default_file_stem(&values, &labels, date, "アセスメント"),
            "山田花子_20250401_アセスメント"
        );

        values.insert("利用者情報_氏名_漢字".to_string(), "佐藤 一郎".to_string());
        assert_eq!(
            default_file_stem(&values, &labels, date, "アセスメント"),
            "佐藤一郎_20250401_アセスメント"
        );
    }

    #[test]
    fn test_default_file_stem_unknown_user() {
        let labels = vec!["氏名".to_string()];
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut values = HashMap::new();
        values.insert("氏名".to_string(), " ".to_string());

        assert_eq!(
            default_file_stem(&values, &labels, date, "a/b"),
            "利用者未定_20250401_a_b"
        );
    }
}
