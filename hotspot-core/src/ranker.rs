//! Deterministic top-N ranking by primary score, descending.

use crate::types::{FileResult, FolderResult};

/// Rank files by `mode_score` descending (stable sort preserves input order
/// among ties). `limit == 0` returns everything; ranking with a limit is
/// idempotent: `rank(rank(xs, k), k) == rank(xs, k)`.
pub fn rank_files(mut files: Vec<FileResult>, limit: usize) -> Vec<FileResult> {
    files.sort_by(|a, b| b.mode_score.partial_cmp(&a.mode_score).unwrap_or(std::cmp::Ordering::Equal));
    if limit == 0 {
        files
    } else {
        files.truncate(limit);
        files
    }
}

/// Rank folders by `score` descending. `limit <= 0` (callers pass `0`)
/// returns an empty vector per the folder convention in §4.10.
pub fn rank_folders(mut folders: Vec<FolderResult>, limit: usize) -> Vec<FolderResult> {
    if limit == 0 {
        return Vec::new();
    }
    folders.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    folders.truncate(limit);
    folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoringMode;
    use std::collections::BTreeMap;

    fn file(path: &str, score: f64) -> FileResult {
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
            all_scores: BTreeMap::from([(ScoringMode::Hot, score)]),
            mode: ScoringMode::Hot,
            mode_score: score,
            breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn ranks_descending_by_mode_score() {
        let files = vec![file("a", 10.0), file("b", 50.0), file("c", 30.0)];
        let ranked = rank_files(files, 0);
        assert_eq!(ranked.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(), vec!["b", "c", "a"]);
    }

    #[test]
    fn rank_is_idempotent() {
        let files = vec![file("a", 10.0), file("b", 50.0), file("c", 30.0), file("d", 5.0)];
        let once = rank_files(files.clone(), 2);
        let twice = rank_files(once.clone(), 2);
        assert_eq!(once.iter().map(|f| f.path.clone()).collect::<Vec<_>>(), twice.iter().map(|f| f.path.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn zero_limit_means_unlimited_for_files() {
        let files = vec![file("a", 1.0), file("b", 2.0)];
        assert_eq!(rank_files(files, 0).len(), 2);
    }

    #[test]
    fn zero_limit_means_empty_for_folders() {
        assert!(rank_folders(Vec::new(), 0).is_empty());
    }
}
