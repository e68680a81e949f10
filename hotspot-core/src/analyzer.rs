//! Parallel worker pool mapping path -> `FileResult` via `FileBuilder`.
//!
//! Global invariants enforced:
//! - Exactly one pool per `Analyzer` invocation, sized to `config.workers`.
//! - `AggregateOutput` and `Config` are read-only to every worker; no shared
//!   mutable collections. Each worker's `FileResult` (including its
//!   `breakdown` map) is wholly owned by that worker until collected.
//! - Result order is not stable; `Ranker` imposes order downstream.
//! - Cancellation is cooperative: a worker finishes its *current* path then
//!   checks the token before starting the next one.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::aggregator::AggregateOutput;
use crate::cancel::CancellationToken;
use crate::file_builder;
use crate::git::GitClient;
use crate::types::{Config, FileResult};

/// Return true if `path` should be dropped per `excludes` (substring match).
fn is_excluded(path: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// Run `FileBuilder` over every non-excluded path in `files`, using a
/// rayon thread pool sized to `config.workers`. `use_follow` is always
/// `false` here; the optional second `FollowPass` re-analyzes the ranked
/// subset with `use_follow = true`.
pub fn analyze(
    git: &dyn GitClient,
    config: &Config,
    aggregate: &AggregateOutput,
    files: &[String],
    now: DateTime<Utc>,
    token: &CancellationToken,
) -> anyhow::Result<Vec<FileResult>> {
    let filtered: Vec<&String> = files
        .iter()
        .filter(|p| !is_excluded(p, &config.excludes))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()?;

    let repo: &Path = &config.repo_path;
    let results: Vec<FileResult> = pool.install(|| {
        filtered
            .par_iter()
            .filter_map(|path| {
                if token.is_cancelled() {
                    return None;
                }
                match file_builder::build(git, repo, path, aggregate, false, config, now, token) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        eprintln!("warning: skipping {path}: {e}");
                        None
                    }
                }
            })
            .collect()
    });

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_match_by_substring() {
        assert!(is_excluded("src/vendor/foo.rs", &["vendor".to_string()]));
        assert!(!is_excluded("src/app/foo.rs", &["vendor".to_string()]));
    }

    #[test]
    fn no_excludes_keeps_everything() {
        assert!(!is_excluded("anything.rs", &[]));
    }
}
