//! CI gating: evaluates changed files between two refs against per-mode
//! score thresholds and reports pass/fail without treating a failure as an
//! error (`CheckViolation` is carried as `CheckResult.passed == false`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::cache::{AggregateCache, PersistenceStore};
use crate::cancel::CancellationToken;
use crate::error::{HotspotError, Result};
use crate::{analyzer, git::GitClient};
use crate::types::{CheckFailure, CheckResult, Config, MaxScoreFile, ScoringMode};

pub fn run(
    git: &dyn GitClient,
    store: &dyn PersistenceStore,
    config: &Config,
    now: DateTime<Utc>,
    token: &CancellationToken,
) -> Result<CheckResult> {
    if !config.compare_mode {
        return Err(HotspotError::PreconditionFailed(
            "check requires compare_mode".to_string(),
        ));
    }
    let base_ref = config
        .base_ref
        .clone()
        .ok_or_else(|| HotspotError::PreconditionFailed("base_ref is required".to_string()))?;
    let target_ref = config
        .target_ref
        .clone()
        .ok_or_else(|| HotspotError::PreconditionFailed("target_ref is required".to_string()))?;

    let changed = git
        .get_changed_files_between_refs(&config.repo_path, &base_ref, &target_ref, token)
        .map_err(|e| HotspotError::GitUnavailable(e.to_string()))?;
    let filtered: Vec<String> = changed
        .into_iter()
        .filter(|p| !config.excludes.iter().any(|pat| p.contains(pat.as_str())))
        .collect();

    let target_ts = git
        .get_commit_time(&config.repo_path, &target_ref, token)
        .map_err(|e| HotspotError::GitUnavailable(e.to_string()))?;
    let window_start = target_ts - config.lookback;
    let window_config = config.with_window(Some(window_start), Some(target_ts));

    let cache = AggregateCache::new(store);
    let aggregate = cache.get_or_compute(git, &window_config, now, token)?;

    let results = analyzer::analyze(git, &window_config, &aggregate, &filtered, now, token)
        .map_err(|e| HotspotError::GitUnavailable(e.to_string()))?;

    let checked_modes: Vec<ScoringMode> = ScoringMode::ALL
        .into_iter()
        .filter(|m| config.risk_thresholds.contains_key(m))
        .collect();

    let mut failed_files = Vec::new();
    let mut max_scores: BTreeMap<ScoringMode, f64> = BTreeMap::new();
    let mut max_score_files: BTreeMap<ScoringMode, Vec<MaxScoreFile>> = BTreeMap::new();
    let mut avg_scores: BTreeMap<ScoringMode, f64> = BTreeMap::new();

    for &mode in &checked_modes {
        let threshold = config.risk_thresholds[&mode];
        let mut max_score = f64::MIN;
        let mut max_files: Vec<MaxScoreFile> = Vec::new();
        let mut sum = 0.0;

        for file in &results {
            let score = file.score_for(mode);
            sum += score;
            if score > threshold {
                failed_files.push(CheckFailure {
                    path: file.path.clone(),
                    mode,
                    score,
                    threshold,
                });
            }
            match score.partial_cmp(&max_score).unwrap_or(std::cmp::Ordering::Equal) {
                std::cmp::Ordering::Greater => {
                    max_score = score;
                    max_files = vec![MaxScoreFile {
                        path: file.path.clone(),
                        owners: file.owners.clone(),
                    }];
                }
                std::cmp::Ordering::Equal => {
                    max_files.push(MaxScoreFile {
                        path: file.path.clone(),
                        owners: file.owners.clone(),
                    });
                }
                std::cmp::Ordering::Less => {}
            }
        }

        if !results.is_empty() {
            max_scores.insert(mode, max_score);
            max_score_files.insert(mode, max_files);
            avg_scores.insert(mode, sum / results.len() as f64);
        }
    }

    Ok(CheckResult {
        passed: failed_files.is_empty(),
        failed_files,
        max_scores,
        max_score_files,
        avg_scores,
        total_files: results.len() as u64,
        base_ref,
        target_ref,
        thresholds: config.risk_thresholds.iter().map(|(k, v)| (*k, *v)).collect(),
        lookback_days: config.lookback.num_days(),
        checked_modes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e6_check_gating() {
        use crate::types::FileResult;
        use std::collections::BTreeMap as BMap;

        fn file(path: &str, hot: f64) -> FileResult {
            FileResult {
                path: path.to_string(),
                size_bytes: 100,
                lines_of_code: 10,
                commits: 1,
                churn: 1,
                recent_commits: 1,
                recent_churn: 1,
                recent_contributors: 1,
                unique_contributors: 1,
                gini: 0.0,
                first_commit: None,
                age_days: 0,
                owners: vec![],
                all_scores: BMap::from([(ScoringMode::Hot, hot)]),
                mode: ScoringMode::Hot,
                mode_score: hot,
                breakdown: BMap::new(),
            }
        }

        let results = vec![file("a.rs", 60.0), file("b.rs", 50.0)];
        let threshold = 55.0;
        let failed: Vec<_> = results
            .iter()
            .filter(|f| f.score_for(ScoringMode::Hot) > threshold)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, "a.rs");

        let max = results.iter().map(|f| f.score_for(ScoringMode::Hot)).fold(f64::MIN, f64::max);
        let avg: f64 = results.iter().map(|f| f.score_for(ScoringMode::Hot)).sum::<f64>() / results.len() as f64;
        assert_eq!(max, 60.0);
        assert_eq!(avg, 55.0);
    }
}
