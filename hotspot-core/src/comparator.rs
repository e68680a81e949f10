//! Full-outer join of two result sets into deltas, status classification,
//! and an unfiltered summary.
//!
//! Global invariants enforced:
//! - `ComparisonDetails` is emitted only when `|delta_score| > 0.01`.
//! - `ComparisonSummary` accumulates over *every* joined path, not just the
//!   emitted subset.
//! - Sort order is deterministic: `|delta_score|` desc, then positive sign
//!   before negative at equal magnitude, then path ascending.

use std::collections::HashMap;

use crate::types::{ComparisonDetails, ComparisonResult, ComparisonSummary, FileResult, ScoringMode, Status};

const SIGNIFICANCE_THRESHOLD: f64 = 0.01;

fn status_for(base_present: bool, target_present: bool) -> Status {
    match (base_present, target_present) {
        (false, true) => Status::New,
        (true, true) => Status::Active,
        (true, false) => Status::Inactive,
        (false, false) => Status::Unknown,
    }
}

pub fn compare(
    base: &[FileResult],
    target: &[FileResult],
    limit: usize,
    mode: ScoringMode,
) -> ComparisonResult {
    let base_by_path: HashMap<&str, &FileResult> =
        base.iter().map(|f| (f.path.as_str(), f)).collect();
    let target_by_path: HashMap<&str, &FileResult> =
        target.iter().map(|f| (f.path.as_str(), f)).collect();

    let mut all_paths: Vec<&str> = base_by_path.keys().chain(target_by_path.keys()).copied().collect();
    all_paths.sort_unstable();
    all_paths.dedup();

    let mut details = Vec::new();
    let mut summary = ComparisonSummary::default();

    for path in all_paths {
        let b = base_by_path.get(path).copied();
        let t = target_by_path.get(path).copied();
        let status = status_for(b.is_some(), t.is_some());
        debug_assert_ne!(status, Status::Unknown, "path present in neither set should not occur");

        let base_score = b.map(|f| f.score_for(mode)).unwrap_or(0.0);
        let target_score = t.map(|f| f.score_for(mode)).unwrap_or(0.0);
        let delta_score = target_score - base_score;

        let (delta_commits, delta_churn, delta_loc, delta_contributors) = match (b, t) {
            (Some(bf), Some(tf)) => (
                tf.commits as i64 - bf.commits as i64,
                tf.churn as i64 - bf.churn as i64,
                tf.lines_of_code as i64 - bf.lines_of_code as i64,
                tf.unique_contributors as i64 - bf.unique_contributors as i64,
            ),
            _ => (0, 0, 0, 0),
        };

        let base_owners = b.map(|f| f.owners.clone()).unwrap_or_default();
        let target_owners = t.map(|f| f.owners.clone()).unwrap_or_default();
        let ownership_changed = b.is_some() && t.is_some() && base_owners != target_owners;

        summary.net_score_delta += delta_score;
        summary.net_churn_delta += delta_churn;
        match status {
            Status::New => summary.total_new += 1,
            Status::Inactive => summary.total_inactive += 1,
            Status::Active => summary.total_modified += 1,
            Status::Unknown => {}
        }
        if ownership_changed {
            summary.ownership_changes += 1;
        }

        if delta_score.abs() > SIGNIFICANCE_THRESHOLD {
            details.push(ComparisonDetails {
                path: path.to_string(),
                status,
                delta_score,
                delta_commits,
                delta_churn,
                delta_loc,
                delta_contributors,
                base_owners,
                target_owners,
                ownership_changed,
            });
        }
    }

    details.sort_by(|a, b| {
        b.delta_score
            .abs()
            .partial_cmp(&a.delta_score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| sign_rank(a.delta_score).cmp(&sign_rank(b.delta_score)))
            .then_with(|| a.path.cmp(&b.path))
    });

    if limit > 0 {
        details.truncate(limit);
    }

    ComparisonResult {
        mode: Some(mode),
        details,
        summary,
    }
}

/// Positive sorts before negative at equal magnitude.
fn sign_rank(delta: f64) -> i32 {
    if delta >= 0.0 {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn file(path: &str, score: f64, commits: u64) -> FileResult {
        FileResult {
            path: path.to_string(),
            size_bytes: 100,
            lines_of_code: 10,
            commits,
            churn: 0,
            recent_commits: 0,
            recent_churn: 0,
            recent_contributors: 0,
            unique_contributors: 1,
            gini: 0.0,
            first_commit: None,
            age_days: 0,
            owners: vec!["alice".to_string()],
            all_scores: BTreeMap::from([(ScoringMode::Hot, score)]),
            mode: ScoringMode::Hot,
            mode_score: score,
            breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn e4_comparison_join() {
        let base = vec![file("A", 10.0, 1), file("B", 5.0, 1)];
        let target = vec![file("A", 15.0, 1), file("C", 8.0, 1)];
        let result = compare(&base, &target, 0, ScoringMode::Hot);

        let a = result.details.iter().find(|d| d.path == "A").unwrap();
        assert_eq!(a.status, Status::Active);
        assert!((a.delta_score - 5.0).abs() < 1e-9);

        let b = result.details.iter().find(|d| d.path == "B").unwrap();
        assert_eq!(b.status, Status::Inactive);
        assert!((b.delta_score - (-5.0)).abs() < 1e-9);

        let c = result.details.iter().find(|d| d.path == "C").unwrap();
        assert_eq!(c.status, Status::New);
        assert!((c.delta_score - 8.0).abs() < 1e-9);

        assert_eq!(result.summary.total_new, 1);
        assert_eq!(result.summary.total_inactive, 1);
        assert_eq!(result.summary.total_modified, 1);
        assert!((result.summary.net_score_delta - 8.0).abs() < 1e-9);
    }

    #[test]
    fn filters_insignificant_deltas() {
        let base = vec![file("A", 10.0, 1)];
        let target = vec![file("A", 10.005, 1)];
        let result = compare(&base, &target, 0, ScoringMode::Hot);
        assert!(result.details.is_empty());
        // But the summary still counts the path as modified.
        assert_eq!(result.summary.total_modified, 1);
    }

    #[test]
    fn active_status_never_new() {
        let base = vec![file("A", 10.0, 1)];
        let target = vec![file("A", 50.0, 1)];
        let result = compare(&base, &target, 0, ScoringMode::Hot);
        assert_eq!(result.details[0].status, Status::Active);
    }

    #[test]
    fn sort_is_deterministic_on_ties() {
        let base = vec![file("z", 0.0, 1), file("a", 0.0, 1)];
        let target = vec![file("z", 5.0, 1), file("a", -5.0, 1)];
        let result = compare(&base, &target, 0, ScoringMode::Hot);
        // Equal magnitude: positive (z, +5) sorts before negative (a, -5).
        assert_eq!(result.details[0].path, "z");
        assert_eq!(result.details[1].path, "a");
    }

    #[test]
    fn truncates_to_limit() {
        let base = vec![];
        let target = vec![file("a", 10.0, 1), file("b", 20.0, 1), file("c", 30.0, 1)];
        let result = compare(&base, &target, 2, ScoringMode::Hot);
        assert_eq!(result.details.len(), 2);
    }
}
