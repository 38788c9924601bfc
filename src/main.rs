use care_dx::ai_provider::AiProvider;
use care_dx::cli::{Cli, Commands};
use care_dx::config::Config;
use care_dx::error::{CareDxError, Result};
use care_dx::extractor::cache::CacheFile;
use care_dx::extractor::{self, Attachment, ClaudeCliBackend, ExtractionBackend, ExtractionOutcome, GeminiBackend};
use care_dx::transcribe;
use care_dx::{export, logging, scanner};
use care_dx_common::meeting::{self, SERVICE_MEETING_TITLE};
use care_dx_common::{ExtractedValue, MappingSet};
use clap::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Check { mapping } => {
            println!("📋 care-dx - マッピング検査\n");

            let mapping_set = MappingSet::from_file(&mapping)?;
            for (idx, field) in mapping_set.iter().enumerate() {
                if field.has_choices() {
                    println!(
                        "{:>4}  {:<8} {}（{}）",
                        idx + 1,
                        field.cell_reference.to_string(),
                        field.label,
                        field.choices.join("、")
                    );
                } else {
                    println!("{:>4}  {:<8} {}", idx + 1, field.cell_reference.to_string(), field.label);
                }
            }
            println!("\n✔ {}項目を読み込みました", mapping_set.len());
        }

        Commands::Extract { documents, mapping, output, use_cache } => {
            println!("📄 care-dx - 項目抽出\n");

            let config = Config::load()?;
            let mapping_set = MappingSet::from_file(&mapping)?;
            let values = run_extraction(&documents, &mapping_set, &config, cli.ai_provider, use_cache, cli.verbose, 2).await?;

            let output = output.unwrap_or_else(|| PathBuf::from("extracted.json"));
            println!("[2/2] 結果を保存中...");
            std::fs::write(&output, serde_json::to_string_pretty(&values)?)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 抽出完了");
        }

        Commands::Transcribe { input, options } => {
            println!("📝 care-dx - 転記\n");

            let config = Config::load()?;
            let mapping_set = MappingSet::from_file(&options.mapping)?;
            println!("[1/2] 抽出結果を読み込み中...");
            let values = transcribe::load_extracted(&input)?;
            println!("✔ {}項目\n", values.len());

            println!("[2/2] 転記中...");
            transcribe::transcribe_to_files(&mapping_set, &values, &options, &config, transcribe::confirm_unverified)?;

            println!("\n✅ 転記完了");
        }

        Commands::Run { documents, use_cache, save_extracted, options } => {
            println!("🚀 care-dx - 抽出・転記 一括実行\n");

            let config = Config::load()?;
            let mapping_set = MappingSet::from_file(&options.mapping)?;
            let values = run_extraction(&documents, &mapping_set, &config, cli.ai_provider, use_cache, cli.verbose, 3).await?;

            if let Some(path) = save_extracted {
                std::fs::write(&path, serde_json::to_string_pretty(&values)?)?;
                println!("✔ 抽出結果を保存: {}\n", path.display());
            }

            println!("[3/3] 転記中...");
            transcribe::transcribe_to_files(&mapping_set, &values, &options, &config, transcribe::confirm_unverified)?;

            println!("\n✅ 完了");
        }

        Commands::Meeting { audio, template, output, format, sheet_name } => {
            println!("🎙 care-dx - サービス担当者会議録\n");

            let config = Config::load()?;
            let sheet_name = sheet_name.unwrap_or_else(|| config.sheet_name().to_string());

            let table = match &template {
                Some(path) => export::excel::read_table(path, &sheet_name)?,
                None => vec![meeting::default_meeting_headers()],
            };
            let headers = table
                .first()
                .filter(|headers| headers.iter().any(|h| !h.trim().is_empty()))
                .ok_or_else(|| CareDxError::UnsupportedFile(format!("シート「{}」の1行目に見出しがありません", sheet_name)))?;

            let attachments = scan_attachments(&audio, &config, 3)?;

            println!("[2/3] 会議録を要約中... ({})", cli.ai_provider.display_name());
            let values = match cli.ai_provider {
                AiProvider::Gemini => {
                    let backend = GeminiBackend::new(&config)?;
                    extractor::summarize_meeting(&backend, &attachments).await?
                }
                AiProvider::Claude => {
                    let backend = ClaudeCliBackend::new(cli.verbose);
                    extractor::summarize_meeting(&backend, &attachments).await?
                }
            };
            let missing = meeting::missing_meeting_keys(&values);
            if !missing.is_empty() {
                println!("⚠ 要約に含まれなかった項目: {}", missing.join("、"));
            }
            println!("✔ {}項目を要約\n", values.len());

            println!("[3/3] 記録シートに追加中...");
            let row = meeting::build_meeting_row(headers, &values);
            let by_label = values.iter().fold(HashMap::<String, String>::new(), |mut map, v| {
                map.entry(v.label.clone()).or_insert_with(|| v.raw_text.clone());
                map
            });
            let file_stem = transcribe::default_file_stem(
                &by_label,
                &["利用者名".to_string()],
                chrono::Local::now().date_naive(),
                SERVICE_MEETING_TITLE,
            );
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            export::export_meeting_row(&table, &row, format, &output, &file_stem, &sheet_name)?;

            println!("\n✅ 会議録作成完了");
        }

        Commands::Config { set_api_key, set_model, show } => {
            let mut config = Config::load()?;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(model) = set_model {
                config.model = model;
                config.validate()?;
                config.save()?;
                println!("✔ モデルを設定しました: {}", config.model);
            }

            if show {
                println!("設定ファイル: {}", Config::config_path()?.display());
                println!("APIキー: {}", if config.api_key().is_ok() { "設定済み" } else { "未設定" });
                println!("モデル: {}", config.model);
                println!("バッチサイズ: {}", config.batch_size);
                println!("ファイルサイズ上限: {}MB", config.max_file_size_mb);
                println!("タイムアウト: {}秒", config.timeout_seconds);
                println!("最大試行回数: {}", config.max_retries);
                println!("シート名: {}", config.sheet_name());
                println!("利用者名の項目: {}", config.name_labels.join(", "));
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target_folder = match folder {
                Some(folder) => folder,
                None => std::env::current_dir()?,
            };

            if clear {
                if CacheFile::clear(&target_folder)? {
                    println!("✔ キャッシュを削除しました: {}", CacheFile::cache_path(&target_folder).display());
                } else {
                    println!("キャッシュファイルが見つかりません");
                }
            }

            if info || !clear {
                let cache_path = CacheFile::cache_path(&target_folder);
                if cache_path.exists() {
                    let cache = CacheFile::load(&target_folder);
                    println!("キャッシュファイル: {}", cache_path.display());
                    println!("エントリ数: {}", cache.len());
                } else {
                    println!("キャッシュファイルなし: {}", cache_path.display());
                }
            }
        }
    }

    Ok(())
}

/// 書類をスキャンして抽出（[1/N]〜[2/N]）
async fn run_extraction(
    documents: &[PathBuf],
    mapping: &MappingSet,
    config: &Config,
    provider: AiProvider,
    use_cache: bool,
    verbose: bool,
    total_steps: usize,
) -> Result<Vec<ExtractedValue>> {
    let attachments = scan_attachments(documents, config, total_steps)?;
    let cache_dir = if use_cache { Some(cache_dir_for(&documents[0])) } else { None };

    println!(
        "[2/{}] AI抽出中... ({}, {}項目){}",
        total_steps,
        provider.display_name(),
        mapping.len(),
        if use_cache { " (キャッシュ有効)" } else { "" }
    );

    let outcome = match provider {
        AiProvider::Gemini => {
            let backend = GeminiBackend::new(config)?;
            extract_with(&backend, &attachments, mapping, config, cache_dir.as_deref()).await?
        }
        AiProvider::Claude => {
            let backend = ClaudeCliBackend::new(verbose);
            extract_with(&backend, &attachments, mapping, config, cache_dir.as_deref()).await?
        }
    };

    for (batch_no, reason) in &outcome.skipped_batches {
        println!("⚠ バッチ{}をスキップ: {}", batch_no, reason);
    }
    println!(
        "✔ {}項目を抽出{}\n",
        outcome.values.len(),
        if outcome.from_cache { " (キャッシュ)" } else { "" }
    );

    Ok(outcome.values)
}

/// 書類をスキャンして読み込む（[1/N]）
fn scan_attachments(documents: &[PathBuf], config: &Config, total_steps: usize) -> Result<Vec<Attachment>> {
    println!("[1/{}] 書類をスキャン中...", total_steps);
    let found = scanner::scan_documents(documents, config.max_file_size_mb)?;
    if found.is_empty() {
        let inputs: Vec<String> = documents.iter().map(|p| p.display().to_string()).collect();
        return Err(CareDxError::NoDocumentsFound(inputs.join(", ")));
    }
    println!("✔ {}件の書類を検出\n", found.len());

    found.iter().map(Attachment::load).collect()
}

async fn extract_with<B: ExtractionBackend>(
    backend: &B,
    attachments: &[Attachment],
    mapping: &MappingSet,
    config: &Config,
    cache_dir: Option<&Path>,
) -> Result<ExtractionOutcome> {
    match cache_dir {
        Some(dir) => extractor::extract_with_cache(backend, attachments, mapping, config, dir).await,
        None => extractor::extract(backend, attachments, mapping, config).await,
    }
}

/// キャッシュは最初の入力（フォルダ自身、またはファイルの親）に置く
fn cache_dir_for(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.to_path_buf()
    } else {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
