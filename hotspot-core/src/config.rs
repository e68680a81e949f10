//! Configuration file support.
//!
//! Loads project-specific defaults from a JSON config file. Search order:
//! 1. Explicit path (`--config` CLI flag)
//! 2. `.hotspotrc.json` in the repo root
//! 3. `hotspot.config.json` in the repo root
//!
//! All fields are optional; CLI flags always take precedence over file
//! values when both are present (merging happens in `resolve`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::ScoringMode;

/// Raw, on-disk configuration. Every field is optional so a minimal config
/// file is valid; unknown fields are rejected to catch typos early.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotspotConfig {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub result_limit: Option<usize>,
    #[serde(default)]
    pub path_filter: Option<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub follow: Option<bool>,
    #[serde(default)]
    pub lookback_days: Option<i64>,
    #[serde(default)]
    pub risk_thresholds: HashMap<String, f64>,
    #[serde(default)]
    pub custom_weights: HashMap<String, HashMap<String, f64>>,
}

/// Fully merged configuration: file defaults with CLI overrides applied.
/// Distinct from `HotspotConfig`: this type carries no `Option`s for fields
/// that must have a value by the time analysis runs.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mode: ScoringMode,
    pub workers: usize,
    pub result_limit: usize,
    pub path_filter: String,
    pub excludes: Vec<String>,
    pub follow: bool,
    pub lookback_days: i64,
    pub risk_thresholds: HashMap<ScoringMode, f64>,
    pub custom_weights: HashMap<ScoringMode, HashMap<String, f64>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Hot,
            workers: default_workers(),
            result_limit: 20,
            path_filter: String::new(),
            excludes: Vec::new(),
            follow: false,
            lookback_days: 90,
            risk_thresholds: HashMap::new(),
            custom_weights: HashMap::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Locate and parse the config file, trying `explicit` first and then the
/// standard search order rooted at `repo_root`. Returns the default
/// (empty) config when nothing is found — a missing config file is not an
/// error.
pub fn load(explicit: Option<&Path>, repo_root: &Path) -> Result<HotspotConfig> {
    let candidate = if let Some(p) = explicit {
        Some(p.to_path_buf())
    } else {
        find_default_config(repo_root)
    };

    match candidate {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file: {}", path.display()))
        }
        None => Ok(HotspotConfig::default()),
    }
}

fn find_default_config(repo_root: &Path) -> Option<PathBuf> {
    for name in [".hotspotrc.json", "hotspot.config.json"] {
        let candidate = repo_root.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Merge file config with CLI overrides (CLI wins when `Some`).
pub fn resolve(file: &HotspotConfig, overrides: CliOverrides) -> Result<ResolvedConfig> {
    let defaults = ResolvedConfig::default();

    let mode = overrides
        .mode
        .or_else(|| file.mode.as_deref().and_then(|s| s.parse().ok()))
        .unwrap_or(defaults.mode);

    let mut risk_thresholds = HashMap::new();
    for (k, v) in &file.risk_thresholds {
        if let Ok(m) = k.parse::<ScoringMode>() {
            risk_thresholds.insert(m, *v);
        }
    }
    for (mode, threshold) in overrides.risk_thresholds {
        risk_thresholds.insert(mode, threshold);
    }

    let mut custom_weights = HashMap::new();
    for (k, weights) in &file.custom_weights {
        if let Ok(m) = k.parse::<ScoringMode>() {
            custom_weights.insert(m, weights.clone());
        }
    }

    Ok(ResolvedConfig {
        mode,
        workers: overrides.workers.or(file.workers).unwrap_or(defaults.workers),
        result_limit: overrides
            .result_limit
            .or(file.result_limit)
            .unwrap_or(defaults.result_limit),
        path_filter: overrides
            .path_filter
            .or_else(|| file.path_filter.clone())
            .unwrap_or(defaults.path_filter),
        excludes: if overrides.excludes.is_empty() {
            file.excludes.clone()
        } else {
            overrides.excludes
        },
        follow: overrides.follow.or(file.follow).unwrap_or(defaults.follow),
        lookback_days: overrides
            .lookback_days
            .or(file.lookback_days)
            .unwrap_or(defaults.lookback_days),
        risk_thresholds,
        custom_weights,
    })
}

/// CLI-provided values that take precedence over the file config when set.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mode: Option<ScoringMode>,
    pub workers: Option<usize>,
    pub result_limit: Option<usize>,
    pub path_filter: Option<String>,
    pub excludes: Vec<String>,
    pub follow: Option<bool>,
    pub lookback_days: Option<i64>,
    pub risk_thresholds: HashMap<ScoringMode, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_fields() {
        let json = r#"{"not_a_real_field": true}"#;
        let result: std::result::Result<HotspotConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn cli_override_wins_over_file() {
        let file = HotspotConfig {
            workers: Some(2),
            ..Default::default()
        };
        let overrides = CliOverrides {
            workers: Some(8),
            ..Default::default()
        };
        let resolved = resolve(&file, overrides).unwrap();
        assert_eq!(resolved.workers, 8);
    }

    #[test]
    fn file_value_used_when_no_override() {
        let file = HotspotConfig {
            workers: Some(2),
            ..Default::default()
        };
        let resolved = resolve(&file, CliOverrides::default()).unwrap();
        assert_eq!(resolved.workers, 2);
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load(None, tmp.path()).unwrap();
        assert!(config.risk_thresholds.is_empty());
    }

    #[test]
    fn loads_hotspotrc_json() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".hotspotrc.json"), r#"{"mode": "risk"}"#).unwrap();
        let config = load(None, tmp.path()).unwrap();
        assert_eq!(config.mode.as_deref(), Some("risk"));
    }
}
