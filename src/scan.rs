use crate::metadata::{ParseError, RogueMetadata};

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 1ファイル分の検証結果
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: Result<RogueMetadata, ParseError>,
}

impl FileResult {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    /// 表示用のファイル名
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("<unknown>")
            .to_string()
    }
}

/// ディレクトリ以下のメタデータファイルを列挙（パス順）
pub fn collect_metadata_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("metadata ディレクトリが見つかりません: {:?}", dir);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        if has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// 拡張子で JSON / YAML を判別して読み込み、検証する
pub fn load_file(path: &Path) -> Result<RogueMetadata, ParseError> {
    let text = fs::read_to_string(path)?;
    if is_yaml(path) {
        RogueMetadata::from_yaml_str(&text)
    } else {
        RogueMetadata::from_json_str(&text)
    }
}

/// 全ファイルを並列に検証する。結果は入力と同じ順序
pub fn validate_files(files: &[PathBuf]) -> Vec<FileResult> {
    files
        .par_iter()
        .map(|path| {
            let outcome = load_file(path);
            if let Err(err) = &outcome {
                tracing::debug!(file = ?path, "invalid metadata: {}", err);
            }
            FileResult {
                path: path.clone(),
                outcome,
            }
        })
        .collect()
}

/// trait_type ごとの値の出現数
///
/// 値のラベルにはバリアント名を付ける（`"42"` と `42` は別の値として数える）。
pub fn trait_distribution<'a>(
    records: impl IntoIterator<Item = &'a RogueMetadata>,
) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut stats: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for meta in records {
        for attr in &meta.attributes {
            let label = format!("{} ({})", attr.value, attr.value.kind());
            *stats
                .entry(attr.trait_type.clone())
                .or_default()
                .entry(label)
                .or_insert(0) += 1;
        }
    }
    stats
}

pub fn tag_distribution<'a>(
    records: impl IntoIterator<Item = &'a RogueMetadata>,
) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    for meta in records {
        for tag in meta.tags() {
            *stats.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    stats
}

/// 正規化済みの JSON を `<out_dir>/<stem>.json` に書き出す
pub fn write_normalized(meta: &RogueMetadata, source: &Path, out_dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("ファイル名が取得できません: {:?}", source))?;
    let out_path = out_dir.join(format!("{}.json", stem));

    let json = serde_json::to_string_pretty(meta)
        .context("メタデータのJSONシリアライズに失敗しました")?;
    fs::write(&out_path, json)
        .with_context(|| format!("メタデータの書き込みに失敗しました: {:?}", out_path))?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "name": "Rogue",
        "description": "d",
        "image": "https://example.com/r.png",
        "attributes": [],
        "metadata_version": "1",
        "prompt_version": "1"
    }"#;

    fn exts() -> Vec<String> {
        vec!["json".to_string(), "yml".to_string()]
    }

    #[test]
    fn collects_matching_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), VALID).unwrap();
        fs::write(dir.path().join("a.JSON"), VALID).unwrap();
        fs::write(dir.path().join("nested/c.yml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_metadata_files(dir.path(), &exts()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.JSON", "b.json", "c.yml"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_metadata_files(&dir.path().join("nope"), &exts()).is_err());
    }

    #[test]
    fn validate_files_keeps_order_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("1.json");
        let bad = dir.path().join("2.json");
        let missing = dir.path().join("3.json");
        fs::write(&good, VALID).unwrap();
        fs::write(&bad, r#"{"name": "x"}"#).unwrap();

        let results = validate_files(&[good.clone(), bad.clone(), missing]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_valid());
        assert_eq!(results[1].path, bad);
        assert!(matches!(results[1].outcome, Err(ParseError::Invalid(_))));
        assert!(matches!(results[2].outcome, Err(ParseError::Io(_))));
    }

    #[test]
    fn trait_distribution_keeps_variants_apart() {
        let with_values = |values: serde_json::Value| {
            let mut v: serde_json::Value = serde_json::from_str(VALID).unwrap();
            v["attributes"] = values;
            v["tags"] = serde_json::json!(["night"]);
            RogueMetadata::from_value(&v).unwrap()
        };
        let records = [
            with_values(serde_json::json!([{ "trait_type": "Power", "value": "42" }])),
            with_values(serde_json::json!([{ "trait_type": "Power", "value": 42 }])),
            with_values(serde_json::json!([{ "trait_type": "Power", "value": 42 }])),
        ];

        let stats = trait_distribution(&records);
        let power = &stats["Power"];
        assert_eq!(power.len(), 2);
        assert_eq!(power["42 (text)"], 1);
        assert_eq!(power["42 (integer)"], 2);

        assert_eq!(tag_distribution(&records)["night"], 3);
    }

    #[test]
    fn write_normalized_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("7.yml");
        let meta = RogueMetadata::from_json_str(VALID).unwrap();

        let out = write_normalized(&meta, &source, dir.path()).unwrap();
        assert_eq!(out, dir.path().join("7.json"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["tags"], serde_json::json!([]));
        assert_eq!(RogueMetadata::from_value(&written).unwrap(), meta);
    }
}
