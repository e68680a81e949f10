//! Folder roll-up: aggregate `FileResult`s into `FolderResult`s, LOC-weighted
//! by score, owner credited by commit volume.
//!
//! Global invariant (conservation): summing `commits`/`churn`/`total_loc`
//! across every produced `FolderResult` equals summing the same fields
//! across the selected `FileResult`s.

use std::collections::HashMap;

use crate::types::{FileResult, FolderResult};

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Roll files up into folders. When `path_filter` is empty, the synthetic
/// root folder `"."` is skipped (its files belong to no meaningful folder
/// grouping for an unscoped run).
pub fn roll_up(files: &[FileResult], path_filter: &str) -> Vec<FolderResult> {
    struct Acc {
        commits: u64,
        churn: u64,
        total_loc: u64,
        weighted_score_sum: f64,
        owner_commits: HashMap<String, u64>,
    }

    let mut acc: HashMap<String, Acc> = HashMap::new();

    for file in files {
        let folder = dirname(&file.path);
        if folder == "." && path_filter.is_empty() {
            continue;
        }
        let entry = acc.entry(folder).or_insert(Acc {
            commits: 0,
            churn: 0,
            total_loc: 0,
            weighted_score_sum: 0.0,
            owner_commits: HashMap::new(),
        });
        entry.commits += file.commits;
        entry.churn += file.churn;
        entry.total_loc += file.lines_of_code;
        entry.weighted_score_sum += file.mode_score * file.lines_of_code as f64;
        if let Some(primary_owner) = file.owners.first() {
            *entry.owner_commits.entry(primary_owner.clone()).or_insert(0) += file.commits;
        }
    }

    acc.into_iter()
        .map(|(path, a)| {
            let score = if a.total_loc == 0 {
                0.0
            } else {
                a.weighted_score_sum / a.total_loc as f64
            };
            let mut owners: Vec<(&String, &u64)> = a.owner_commits.iter().collect();
            owners.sort_by(|x, y| y.1.cmp(x.1).then_with(|| x.0.cmp(y.0)));
            let owners: Vec<String> = owners.into_iter().take(2).map(|(n, _)| n.clone()).collect();
            FolderResult {
                path,
                commits: a.commits,
                churn: a.churn,
                total_loc: a.total_loc,
                weighted_score_sum: a.weighted_score_sum,
                score,
                owners,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoringMode;
    use std::collections::BTreeMap;

    fn file(path: &str, commits: u64, churn: u64, loc: u64, score: f64, owner: &str) -> FileResult {
        FileResult {
            path: path.to_string(),
            size_bytes: loc * 10,
            lines_of_code: loc,
            commits,
            churn,
            recent_commits: commits,
            recent_churn: churn,
            recent_contributors: 1,
            unique_contributors: 1,
            gini: 0.0,
            first_commit: None,
            age_days: 0,
            owners: vec![owner.to_string()],
            all_scores: BTreeMap::from([(ScoringMode::Hot, score)]),
            mode: ScoringMode::Hot,
            mode_score: score,
            breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn conservation_of_commits_churn_loc() {
        let files = vec![
            file("src/a.rs", 5, 10, 100, 50.0, "alice"),
            file("src/b.rs", 3, 7, 50, 20.0, "bob"),
            file("lib/c.rs", 2, 4, 30, 10.0, "alice"),
        ];
        let folders = roll_up(&files, "");
        let sum_commits: u64 = folders.iter().map(|f| f.commits).sum();
        let sum_churn: u64 = folders.iter().map(|f| f.churn).sum();
        let sum_loc: u64 = folders.iter().map(|f| f.total_loc).sum();
        assert_eq!(sum_commits, 10);
        assert_eq!(sum_churn, 21);
        assert_eq!(sum_loc, 180);
    }

    #[test]
    fn root_folder_skipped_when_no_path_filter() {
        let files = vec![file("toplevel.rs", 1, 1, 10, 5.0, "a")];
        assert!(roll_up(&files, "").is_empty());
    }

    #[test]
    fn root_folder_kept_with_path_filter() {
        let files = vec![file("toplevel.rs", 1, 1, 10, 5.0, "a")];
        assert_eq!(roll_up(&files, "toplevel").len(), 1);
    }

    #[test]
    fn zero_loc_folder_has_zero_score() {
        let files = vec![file("src/a.rs", 1, 1, 0, 99.0, "a")];
        let folders = roll_up(&files, "");
        assert_eq!(folders[0].score, 0.0);
    }
}
