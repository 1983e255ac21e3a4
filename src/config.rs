use serde::Deserialize;
use anyhow::{Context, Result};
use std::fs;

pub const DEFAULT_MAX_EXAMPLES: usize = 20;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("設定ファイルが読めません: {}", path))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        Ok(config)
    }

    pub fn max_examples(&self) -> usize {
        self.report
            .as_ref()
            .and_then(|r| r.max_examples)
            .unwrap_or(DEFAULT_MAX_EXAMPLES)
    }
}


#[derive(Debug, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub output: Option<OutputConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub metadata_dir: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    pub normalized_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    pub max_examples: Option<usize>,
    pub json_path: Option<String>,
}

fn default_extensions() -> Vec<String> {
    ["json", "yaml", "yml"].iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_yaml_str("input:\n  metadata_dir: output/metadata\n").unwrap();
        assert_eq!(cfg.input.metadata_dir, "output/metadata");
        assert_eq!(cfg.input.extensions, ["json", "yaml", "yml"]);
        assert!(cfg.output.is_none());
        assert_eq!(cfg.max_examples(), DEFAULT_MAX_EXAMPLES);
    }

    #[test]
    fn full_config() {
        let text = r#"
input:
  metadata_dir: in
  extensions: [json]
output:
  normalized_dir: out
report:
  max_examples: 5
  json_path: out/report.json
"#;
        let cfg = Config::from_yaml_str(text).unwrap();
        assert_eq!(cfg.input.extensions, ["json"]);
        assert_eq!(cfg.output.unwrap().normalized_dir, "out");
        let report = cfg.report.unwrap();
        assert_eq!(report.max_examples, Some(5));
        assert_eq!(report.json_path.as_deref(), Some("out/report.json"));
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(Config::from_yaml_str("output:\n  normalized_dir: out\n").is_err());
    }
}
