//! Config file loading
//!
//! The file format follows the extension: `.toml`, `.yaml`/`.yml` or `.json`.

use anyhow::{Context, Result, bail};
use ddns_core::DdnsConfig;
use std::path::Path;

/// Read, decode and validate a config file
pub fn load(path: &Path) -> Result<DdnsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = parse(path, &text)?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

fn parse(path: &Path, text: &str) -> Result<DdnsConfig> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let config = match extension.as_str() {
        "toml" => toml::from_str(text).context("failed to parse TOML config")?,
        "yaml" | "yml" => serde_yaml::from_str(text).context("failed to parse YAML config")?,
        "json" => serde_json::from_str(text).context("failed to parse JSON config")?,
        other => bail!(
            "unsupported config format '{}' for {}; use .toml, .yaml, .yml or .json",
            other,
            path.display()
        ),
    };
    Ok(config)
}
