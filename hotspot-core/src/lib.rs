//! Hotspot core library - git-history-driven file and folder risk/importance
//! scoring.
//!
//! Global invariants enforced:
//! - No global mutable state; every run is parameterized entirely by `Config`
//!   plus the injected `GitClient`/`PersistenceStore` capabilities.
//! - Deterministic output ordering: `Analyzer` workers make no ordering
//!   promise, but `Ranker`/`Comparator` re-establish it before anything is
//!   returned to a caller.
//! - Per-file errors never poison a run; only aggregation/comparison
//!   preconditions are fatal.

pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod cancel;
pub mod check;
pub mod comparator;
pub mod config;
pub mod error;
pub mod file_builder;
pub mod folder_roll;
pub mod follow;
pub mod gini;
pub mod git;
pub mod normalize;
pub mod ranker;
pub mod scorer;
pub mod timeseries;
pub mod types;

pub use aggregator::AggregateOutput;
pub use cache::{AggregateCache, PersistenceStore};
pub use cancel::CancellationToken;
pub use error::HotspotError;
pub use git::GitClient;
pub use types::{
    CheckResult, Config, ComparisonResult, FileResult, FolderResult, OutputFormat, ScoringMode,
    Status, TimeseriesPoint,
};

use chrono::{DateTime, Utc};

/// Result of a single-window analysis run: ranked files plus, when the
/// config's `path_filter` is empty or a folder scope is requested, their
/// folder roll-up.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    pub files: Vec<FileResult>,
    pub folders: Vec<FolderResult>,
}

/// Run the full pipeline once: `GitClient` -> `Aggregator` (+ cache) ->
/// `Analyzer` -> optional `FollowPass` -> `Ranker` -> `FolderRoll` -> `Ranker`.
pub fn analyze(
    git: &dyn GitClient,
    store: &dyn PersistenceStore,
    config: &Config,
    now: DateTime<Utc>,
    token: &CancellationToken,
) -> anyhow::Result<AnalysisOutput> {
    let cache = AggregateCache::new(store);
    let aggregate = cache.get_or_compute(git, config, now, token)?;

    let all_files = git.list_files_at_ref(&config.repo_path, "HEAD", token)?;
    let files: Vec<String> = if config.path_filter.is_empty() {
        all_files
    } else {
        all_files
            .into_iter()
            .filter(|f| f.starts_with(&config.path_filter))
            .collect()
    };

    let mut results = analyzer::analyze(git, config, &aggregate, &files, now, token)?;
    if config.follow {
        results = follow::run(git, config, &aggregate, results, now, token);
    }

    let ranked_files = ranker::rank_files(results, config.result_limit);
    let folders = folder_roll::roll_up(&ranked_files, &config.path_filter);
    let ranked_folders = ranker::rank_folders(folders, config.result_limit);

    Ok(AnalysisOutput {
        files: ranked_files,
        folders: ranked_folders,
    })
}
