use anyhow::{Context, Result};
use rogue_metadata::config::Config;
use rogue_metadata::scan::{self, FileResult};
use rogue_metadata::{logging, FieldError, ParseError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// JSON レポートに書き出す不正ファイル1件分
#[derive(Serialize)]
struct InvalidFile {
    file: String,
    message: String,
    errors: Vec<FieldError>,
}

#[derive(Serialize)]
struct Report {
    total: usize,
    valid: usize,
    invalid: Vec<InvalidFile>,
}

fn main() -> Result<()> {
    logging::init();

    let cfg = Config::load("config.yaml")?;
    let metadata_dir = Path::new(&cfg.input.metadata_dir);
    let max_examples = cfg.max_examples();

    let files = scan::collect_metadata_files(metadata_dir, &cfg.input.extensions)
        .with_context(|| format!("metadata ディレクトリが読めません: {:?}", metadata_dir))?;
    let results = scan::validate_files(&files);

    let total = results.len();
    let records: Vec<_> = results.iter().filter_map(|r| r.outcome.as_ref().ok()).collect();
    let stats = scan::trait_distribution(records.iter().copied());
    let tag_stats = scan::tag_distribution(records.iter().copied());
    let invalid: Vec<InvalidFile> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().err().map(|err| to_invalid(r, err)))
        .collect();
    let valid = records.len();

    println!("==============================");
    println!(" Rogue Metadata Check");
    println!(" Total files: {} (valid: {}, invalid: {})", total, valid, invalid.len());
    println!("==============================\n");

    for (trait_type, values) in &stats {
        println!("▶ Trait: {}", trait_type);

        let mut sorted: Vec<_> = values.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1));

        for (value, count) in sorted {
            let ratio = *count as f64 / valid as f64 * 100.0;
            println!("  {:30} {:5} ({:.2}%)", value, count, ratio);
        }
        println!();
    }

    if !tag_stats.is_empty() {
        println!("▶ Tags");
        let mut sorted: Vec<_> = tag_stats.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1));
        for (tag, count) in sorted {
            println!("  {:30} {:5}", tag, count);
        }
        println!();
    }

    println!("==============================");
    println!(" Validation Check");
    println!(" Invalid files: {}", invalid.len());
    println!("==============================");

    if invalid.is_empty() {
        println!("✅ 検証エラーは見つかりませんでした");
    } else {
        println!("❌ 検証エラーが見つかりました（最大 {} 件表示）:", max_examples);
        for item in invalid.iter().take(max_examples) {
            println!("  - {} : {}", item.file, item.message);
            for e in &item.errors {
                println!("      {}", e);
            }
        }
    }

    let invalid_count = invalid.len();
    if let Some(json_path) = cfg.report.as_ref().and_then(|r| r.json_path.as_ref()) {
        let report = Report { total, valid, invalid };
        let json = serde_json::to_string_pretty(&report)
            .context("レポートのJSONシリアライズに失敗しました")?;
        fs::write(json_path, json)
            .with_context(|| format!("レポートの書き込みに失敗しました: {}", json_path))?;
        tracing::info!(path = %json_path, "report written");
    }

    if invalid_count > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn to_invalid(result: &FileResult, err: &ParseError) -> InvalidFile {
    let errors = match err {
        ParseError::Invalid(invalid) => invalid.errors().to_vec(),
        _ => Vec::new(),
    };
    let message = match err {
        ParseError::Invalid(invalid) => format!("{} field error(s)", invalid.len()),
        other => other.to_string(),
    };
    InvalidFile {
        file: result.file_name(),
        message,
        errors,
    }
}
