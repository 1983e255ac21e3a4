use rogue_metadata::config::Config;
use rogue_metadata::{logging, scan};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

fn main() -> Result<()> {
    logging::init();

    let cfg = Config::load("config.yaml")
        .context("config.yaml の読み込みに失敗しました")?;
    let output = cfg
        .output
        .as_ref()
        .context("config.yaml に output.normalized_dir が設定されていません")?;

    let input_dir = Path::new(&cfg.input.metadata_dir);
    let out_dir = Path::new(&output.normalized_dir);
    fs::create_dir_all(out_dir)
        .with_context(|| format!("出力ディレクトリの作成に失敗しました: {:?}", out_dir))?;

    let files = scan::collect_metadata_files(input_dir, &cfg.input.extensions)
        .with_context(|| format!("metadata ディレクトリの走査に失敗しました: {:?}", input_dir))?;
    check_unique_stems(&files)?;

    if files.is_empty() {
        tracing::warn!(dir = ?input_dir, "対象のメタデータファイルがありません");
        return Ok(());
    }

    tracing::info!("Normalizing {} metadata files in parallel...", files.len());

    let failed = AtomicUsize::new(0);
    files.par_iter().for_each(|path| {
        if let Err(err) = normalize_one(path, out_dir) {
            failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!("❌ {:?}: {:#}", path, err);
        }
    });

    let failed = failed.into_inner();
    if failed > 0 {
        bail!("{} / {} 件のメタデータが検証に失敗しました", failed, files.len());
    }

    tracing::info!("✅ All {} metadata files are valid", files.len());
    Ok(())
}

/// 1ファイル分を検証して正規化 JSON を書き出す（並列で呼ばれる）
fn normalize_one(path: &Path, out_dir: &Path) -> Result<()> {
    let meta = scan::load_file(path)
        .with_context(|| format!("メタデータの検証に失敗しました: {:?}", path))?;
    let out_path = scan::write_normalized(&meta, path, out_dir)?;
    tracing::debug!("✅ {:?} -> {:?}", path, out_path);
    Ok(())
}

/// `1.json` と `1.yaml` のように出力先が衝突する組み合わせを弾く
fn check_unique_stems(files: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<&std::ffi::OsStr, &PathBuf> = HashMap::new();
    for path in files {
        let Some(stem) = path.file_stem() else { continue; };
        if let Some(prev) = seen.insert(stem, path) {
            bail!("出力ファイル名が衝突します: {:?} と {:?}", prev, path);
        }
    }
    Ok(())
}
