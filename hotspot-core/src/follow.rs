//! Optional second analysis stage: re-analyzes the top-ranked files using
//! per-file rename-following history, which is expensive (one `GitClient`
//! call per file) and so is reserved for a bounded top-N subset.

use chrono::{DateTime, Utc};

use crate::aggregator::AggregateOutput;
use crate::cancel::CancellationToken;
use crate::file_builder;
use crate::git::GitClient;
use crate::ranker;
use crate::types::{Config, FileResult};

/// Rank `results`, take the top `config.result_limit` (or all when `0`), and
/// rebuild each with `use_follow = true`. Returns the re-ranked subset.
pub fn run(
    git: &dyn GitClient,
    config: &Config,
    aggregate: &AggregateOutput,
    results: Vec<FileResult>,
    now: DateTime<Utc>,
    token: &CancellationToken,
) -> Vec<FileResult> {
    let ranked = ranker::rank_files(results, config.result_limit);

    let rebuilt: Vec<FileResult> = ranked
        .iter()
        .filter_map(|r| {
            match file_builder::build(git, &config.repo_path, &r.path, aggregate, true, config, now, token) {
                Ok(result) => Some(result),
                Err(e) => {
                    eprintln!("warning: follow-pass failed for {}: {e}", r.path);
                    Some(r.clone())
                }
            }
        })
        .collect();

    ranker::rank_files(rebuilt, 0)
}
