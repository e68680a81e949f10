//! Per-file pipeline: merge aggregated history data, read on-disk file
//! stats, derive age/gini, resolve owners, and score every mode.
//!
//! Global invariant: each step below is idempotent and safe to run
//! independently; `build` composes them as a single function rather than a
//! mutable builder with method chaining (per the design note against
//! builder-object re-architecture).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::aggregator::AggregateOutput;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::gini;
use crate::git::GitClient;
use crate::scorer::{self, ScoreInputs};
use crate::types::{Config, FileResult};

struct RawMetrics {
    commits: u64,
    churn: u64,
    contributors: std::collections::HashMap<String, u64>,
    first_commit: Option<DateTime<Utc>>,
}

/// Step 1: FetchAllGitMetrics. Pulls from the pre-computed `AggregateOutput`
/// unless `use_follow` is set, in which case a per-file rename-following
/// history is requested fresh. In both cases the absolute (unwindowed)
/// first-commit timestamp overwrites whatever the windowed source produced.
fn fetch_all_git_metrics(
    git: &dyn GitClient,
    repo: &Path,
    path: &str,
    aggregate: &AggregateOutput,
    use_follow: bool,
    config: &Config,
    token: &CancellationToken,
) -> RawMetrics {
    let mut metrics = if use_follow {
        match git.get_file_activity_log(
            repo,
            path,
            config.start_time,
            config.end_time,
            true,
            token,
        ) {
            Ok(bytes) => {
                let log = String::from_utf8_lossy(&bytes);
                parse_file_activity_log(&log)
            }
            Err(e) => {
                eprintln!("warning: follow-pass history for {path} unavailable: {e}");
                RawMetrics {
                    commits: 0,
                    churn: 0,
                    contributors: Default::default(),
                    first_commit: None,
                }
            }
        }
    } else {
        RawMetrics {
            commits: aggregate.commits_for(path),
            churn: aggregate.churn_for(path),
            contributors: aggregate.contributors_for(path).clone(),
            first_commit: aggregate.first_commit_for(path),
        }
    };

    match git.get_file_first_commit_time(repo, path, use_follow, token) {
        Ok(Some(t)) => metrics.first_commit = Some(t),
        Ok(None) => {}
        Err(e) => eprintln!("warning: could not resolve first-commit time for {path}: {e}"),
    }

    metrics
}

/// Per-file activity log parser: header prefix is `DELIMITER_COMMIT_START`
/// rather than `--`, and every numstat line belongs to the single file being
/// followed, so no rename reconciliation is needed.
fn parse_file_activity_log(log: &str) -> RawMetrics {
    use crate::git::DELIMITER_COMMIT_START;

    let mut commits = 0u64;
    let mut churn = 0u64;
    let mut contributors: std::collections::HashMap<String, u64> = Default::default();
    let mut first_commit: Option<DateTime<Utc>> = None;

    for raw_line in log.lines() {
        let line = raw_line.trim_matches(|c| c == '\'' || c == '"').trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix(DELIMITER_COMMIT_START) {
            let mut parts = header.splitn(2, '|');
            let author = parts.next().unwrap_or_default().to_string();
            let date = parts
                .next()
                .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc));
            commits += 1;
            *contributors.entry(author).or_insert(0) += 1;
            if let Some(d) = date {
                first_commit = Some(first_commit.map_or(d, |existing| existing.min(d)));
            }
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let (Some(added_str), Some(deleted_str), Some(_path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let added: u64 = if added_str == "-" { 0 } else { added_str.trim().parse().unwrap_or(0) };
        let deleted: u64 = if deleted_str == "-" { 0 } else { deleted_str.trim().parse().unwrap_or(0) };
        churn += added + deleted;
    }

    RawMetrics {
        commits,
        churn,
        contributors,
        first_commit,
    }
}

struct FileStats {
    size_bytes: u64,
    lines_of_code: u64,
}

/// Step 2: FetchFileStats. Reads the file once; failure is non-fatal
/// (`IoError` is absorbed into size=0/loc=0, never propagated).
fn fetch_file_stats(repo: &Path, path: &str) -> FileStats {
    match std::fs::read(repo.join(path)) {
        Ok(bytes) => FileStats {
            size_bytes: bytes.len() as u64,
            lines_of_code: bytecount_newlines(&bytes),
        },
        Err(_) => FileStats {
            size_bytes: 0,
            lines_of_code: 0,
        },
    }
}

fn bytecount_newlines(bytes: &[u8]) -> u64 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u64
}

/// Step 5: CalculateOwner. Top 2 authors by commit count descending; ties
/// broken by author name ascending for determinism across a run.
fn calculate_owners(contributors: &std::collections::HashMap<String, u64>) -> Vec<String> {
    let mut entries: Vec<(&String, &u64)> = contributors.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().take(2).map(|(name, _)| name.clone()).collect()
}

/// Build one `FileResult` from its aggregated history and on-disk state.
#[allow(clippy::too_many_arguments)]
pub fn build(
    git: &dyn GitClient,
    repo: &Path,
    path: &str,
    aggregate: &AggregateOutput,
    use_follow: bool,
    config: &Config,
    now: DateTime<Utc>,
    token: &CancellationToken,
) -> Result<FileResult> {
    let raw = fetch_all_git_metrics(git, repo, path, aggregate, use_follow, config, token);
    let stats = fetch_file_stats(repo, path);

    let age_days = raw
        .first_commit
        .map(|fc| (now - fc).num_days().max(0) as u64)
        .unwrap_or(0);
    let contributor_counts: Vec<f64> = raw.contributors.values().map(|&c| c as f64).collect();
    let g = gini::gini(&contributor_counts);

    // Step 4: FetchRecentInfo. The AggregateOutput's window *is* the recent
    // window for this run, so commits/churn/contributor count mirror into
    // the recent_* fields directly.
    let recent_commits = raw.commits;
    let recent_churn = raw.churn;
    let recent_contributors = raw.contributors.len() as u64;

    let owners = calculate_owners(&raw.contributors);

    let metrics = ScoreInputs {
        path,
        size_bytes: stats.size_bytes,
        lines_of_code: stats.lines_of_code,
        commits: raw.commits,
        churn: raw.churn,
        recent_commits,
        unique_contributors: raw.contributors.len() as u64,
        gini: g,
        age_days,
    };
    let (all_scores, breakdown) = scorer::score_all(&metrics, config.mode, &config.custom_weights);
    let mode_score = all_scores.get(&config.mode).copied().unwrap_or(0.0);

    Ok(FileResult {
        path: path.to_string(),
        size_bytes: stats.size_bytes,
        lines_of_code: stats.lines_of_code,
        commits: raw.commits,
        churn: raw.churn,
        recent_commits,
        recent_churn,
        recent_contributors,
        unique_contributors: raw.contributors.len() as u64,
        gini: g,
        first_commit: raw.first_commit,
        age_days,
        owners,
        all_scores: all_scores.into_iter().collect::<BTreeMap<_, _>>(),
        mode: config.mode,
        mode_score,
        breakdown: breakdown.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_sorted_by_commits_desc_then_name() {
        let mut m = std::collections::HashMap::new();
        m.insert("bob".to_string(), 5);
        m.insert("alice".to_string(), 5);
        m.insert("carol".to_string(), 10);
        let owners = calculate_owners(&m);
        assert_eq!(owners, vec!["carol".to_string(), "alice".to_string()]);
    }

    #[test]
    fn owners_capped_at_two() {
        let mut m = std::collections::HashMap::new();
        for i in 0..5 {
            m.insert(format!("author{i}"), i as u64 + 1);
        }
        assert_eq!(calculate_owners(&m).len(), 2);
    }

    #[test]
    fn file_activity_log_parses_follow_format() {
        let log = concat!(
            "@@HOTSPOT_COMMIT@@Alice|2024-01-01T00:00:00+00:00\n3\t1\told_name.rs\n",
            "@@HOTSPOT_COMMIT@@Bob|2024-02-01T00:00:00+00:00\n2\t0\tnew_name.rs\n",
        );
        let m = parse_file_activity_log(log);
        assert_eq!(m.commits, 2);
        assert_eq!(m.churn, 6);
        assert_eq!(m.contributors.get("Alice"), Some(&1));
        assert_eq!(m.contributors.get("Bob"), Some(&1));
    }
}
