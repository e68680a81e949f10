//! Per-mode weighted composite score.
//!
//! Global invariants enforced:
//! - Weight tables are keyed by the closed `BreakdownKey` enum, never by raw
//!   strings, so every match arm stays exhaustive (per the closed-enumeration
//!   design note).
//! - Custom weights override matching keys only; unspecified keys keep their
//!   default and the table is never renormalized.

use std::collections::{BTreeMap, HashMap};

use crate::normalize::{self, clamp01, inv, n_age, n_linear, n_size};
use crate::types::{BreakdownKey, ScoringMode};

/// Read-only metric view a `FileResult` is scored from. Deliberately a subset
/// of `FileResult`'s fields: scoring runs *before* `all_scores`/`breakdown`
/// exist, so `FileBuilder` builds this first and assembles the full
/// `FileResult` around the scorer's output.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub path: &'a str,
    pub size_bytes: u64,
    pub lines_of_code: u64,
    pub commits: u64,
    pub churn: u64,
    pub recent_commits: u64,
    pub unique_contributors: u64,
    pub gini: f64,
    pub age_days: u64,
}

fn default_weights(mode: ScoringMode) -> &'static [(BreakdownKey, f64)] {
    use BreakdownKey::*;
    match mode {
        ScoringMode::Hot => &[
            (Commits, 0.40),
            (Churn, 0.40),
            (Age, 0.10),
            (Contrib, 0.05),
            (Size, 0.05),
        ],
        ScoringMode::Risk => &[
            (InvContrib, 0.30),
            (Gini, 0.26),
            (Age, 0.16),
            (Size, 0.12),
            (Loc, 0.06),
            (Churn, 0.06),
            (Commits, 0.04),
        ],
        ScoringMode::Complexity => &[
            (Age, 0.30),
            (Churn, 0.30),
            (Loc, 0.20),
            (Commits, 0.10),
            (Size, 0.05),
            (LowRecent, 0.05),
        ],
        ScoringMode::Stale => &[
            (InvRecent, 0.35),
            (Size, 0.25),
            (Age, 0.20),
            (Commits, 0.15),
            (Contrib, 0.05),
        ],
    }
}

fn normalized_value(key: BreakdownKey, m: &ScoreInputs) -> f64 {
    match key {
        BreakdownKey::Commits => n_linear(m.commits as f64, normalize::MAX_COMMITS),
        BreakdownKey::Churn => n_linear(m.churn as f64, normalize::MAX_CHURN),
        BreakdownKey::Age => n_age(m.age_days as f64),
        BreakdownKey::Contrib => n_linear(m.unique_contributors as f64, normalize::MAX_CONTRIB),
        BreakdownKey::InvContrib => {
            inv(n_linear(m.unique_contributors as f64, normalize::MAX_CONTRIB))
        }
        BreakdownKey::Size => n_size(m.size_bytes as f64),
        BreakdownKey::Gini => clamp01(m.gini),
        BreakdownKey::Loc => n_linear(m.lines_of_code as f64, normalize::MAX_LOC),
        BreakdownKey::LowRecent => {
            inv(n_linear(m.recent_commits as f64, normalize::MAX_RECENT_COMMITS))
        }
        BreakdownKey::InvRecent => {
            inv(n_linear(m.recent_commits as f64, normalize::MAX_RECENT_COMMITS))
        }
    }
}

fn is_test_path(path: &str) -> bool {
    path.contains("_test") || path.ends_with("_test.go")
}

/// Compute a single mode's score and breakdown. Returns `(score in [0,100],
/// breakdown percent-of-100 map keyed by the stable breakdown identifier)`.
pub fn score(
    metrics: &ScoreInputs,
    mode: ScoringMode,
    custom_weights: Option<&HashMap<String, f64>>,
) -> (f64, BTreeMap<String, f64>) {
    if metrics.size_bytes == 0 {
        return (0.0, BTreeMap::new());
    }

    let mut breakdown = BTreeMap::new();
    let mut raw = 0.0;
    for &(key, default_weight) in default_weights(mode) {
        let weight = custom_weights
            .and_then(|w| w.get(key.as_str()))
            .copied()
            .unwrap_or(default_weight);
        let contribution = weight * normalized_value(key, metrics) * 100.0;
        raw += contribution;
        breakdown.insert(key.as_str().to_string(), contribution);
    }

    let debuffed = if is_test_path(metrics.path) {
        match mode {
            ScoringMode::Risk => raw * 0.75,
            ScoringMode::Stale => raw * 0.50,
            ScoringMode::Hot | ScoringMode::Complexity => raw,
        }
    } else {
        raw
    };

    (debuffed.clamp(0.0, 100.0), breakdown)
}

/// Score every mode in canonical order, returning `(all_scores, primary breakdown)`.
/// Only the primary mode's breakdown is retained on `FileResult` per §4.6 step 6.
pub fn score_all(
    metrics: &ScoreInputs,
    primary_mode: ScoringMode,
    custom_weights: &HashMap<ScoringMode, HashMap<String, f64>>,
) -> (BTreeMap<ScoringMode, f64>, BTreeMap<String, f64>) {
    let mut all_scores = BTreeMap::new();
    let mut primary_breakdown = BTreeMap::new();
    for mode in ScoringMode::ALL {
        let (s, breakdown) = score(metrics, mode, custom_weights.get(&mode));
        if mode == primary_mode {
            primary_breakdown = breakdown;
        }
        all_scores.insert(mode, s);
    }
    (all_scores, primary_breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(path: &'static str) -> ScoreInputs<'static> {
        ScoreInputs {
            path,
            size_bytes: 51_200,
            lines_of_code: 100,
            commits: 100,
            churn: 500,
            recent_commits: 20,
            unique_contributors: 10,
            gini: 0.3,
            age_days: 365,
        }
    }

    #[test]
    fn empty_file_forces_zero_and_empty_breakdown() {
        let mut m = base("x.rs");
        m.size_bytes = 0;
        let (s, b) = score(&m, ScoringMode::Hot, None);
        assert_eq!(s, 0.0);
        assert!(b.is_empty());
    }

    #[test]
    fn e1_basic_hot_score_in_range() {
        let m = base("src/lib.rs");
        let (s, b) = score(&m, ScoringMode::Hot, None);
        assert!((15.0..=30.0).contains(&s), "hot score {s} out of expected range");
        assert!(!b.is_empty());
    }

    #[test]
    fn e2_saturated_hot_score_in_range() {
        let m = ScoreInputs {
            path: "src/lib.rs",
            size_bytes: 1_048_576,
            lines_of_code: 5000,
            commits: 1000,
            churn: 2000,
            recent_commits: 50,
            unique_contributors: 30,
            gini: 0.1,
            age_days: 5000,
        };
        let (s, _) = score(&m, ScoringMode::Hot, None);
        assert!((70.0..=85.0).contains(&s), "hot score {s} out of expected range");
    }

    #[test]
    fn e3_risk_with_concentration_and_test_debuff() {
        let m = ScoreInputs {
            path: "risky.go",
            size_bytes: 102_400,
            lines_of_code: 3000,
            commits: 100,
            churn: 500,
            recent_commits: 5,
            unique_contributors: 2,
            gini: 0.8,
            age_days: 1000,
        };
        let (s, _) = score(&m, ScoringMode::Risk, None);
        assert!((55.0..=80.0).contains(&s), "risk score {s} out of expected range");

        let mut test_m = m;
        test_m.path = "risky_test.go";
        let (s_test, _) = score(&test_m, ScoringMode::Risk, None);
        assert!((s_test - s * 0.75).abs() < 1e-9);
    }

    #[test]
    fn stale_test_debuff_is_half() {
        let m = base("x.rs");
        let (plain, _) = score(&m, ScoringMode::Stale, None);
        let mut test_m = m;
        test_m.path = "x_test.rs";
        let (test_score, _) = score(&test_m, ScoringMode::Stale, None);
        assert!((test_score - plain * 0.5).abs() < 1e-9);
    }

    #[test]
    fn custom_weights_override_only_named_keys() {
        let m = base("src/lib.rs");
        let mut custom = HashMap::new();
        custom.insert("commits".to_string(), 0.0);
        let (_, breakdown_default) = score(&m, ScoringMode::Hot, None);
        let (_, breakdown_custom) = score(&m, ScoringMode::Hot, Some(&custom));
        assert_eq!(breakdown_custom["commits"], 0.0);
        assert_ne!(breakdown_default["commits"], breakdown_custom["commits"]);
        // Untouched key keeps its default contribution.
        assert_eq!(breakdown_default["churn"], breakdown_custom["churn"]);
    }

    #[test]
    fn score_never_exceeds_100_even_with_unnormalized_custom_weights() {
        let m = ScoreInputs {
            path: "huge.rs",
            size_bytes: 10_000_000,
            lines_of_code: 100_000,
            commits: 100_000,
            churn: 1_000_000,
            recent_commits: 1000,
            unique_contributors: 1,
            gini: 1.0,
            age_days: 100_000,
        };
        let mut custom = HashMap::new();
        custom.insert("commits".to_string(), 5.0);
        custom.insert("churn".to_string(), 5.0);
        let (s, _) = score(&m, ScoringMode::Hot, Some(&custom));
        assert!(s <= 100.0);
    }
}
