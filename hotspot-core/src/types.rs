//! Shared data model for the analysis engine.
//!
//! Global invariants enforced:
//! - No global mutable state; every type here is a plain, owned value.
//! - Closed enumerations (`ScoringMode`, `Status`, `BreakdownKey`) are sum types,
//!   never open-ended strings, so weight tables and match arms stay exhaustive.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The four scoring lenses. Order here is the canonical reporting order used
/// everywhere `all_scores` is iterated (`FileBuilder::calculate_score`, CLI tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Hot,
    Risk,
    Complexity,
    Stale,
}

impl ScoringMode {
    /// All modes in canonical order.
    pub const ALL: [ScoringMode; 4] = [
        ScoringMode::Hot,
        ScoringMode::Risk,
        ScoringMode::Complexity,
        ScoringMode::Stale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Hot => "hot",
            ScoringMode::Risk => "risk",
            ScoringMode::Complexity => "complexity",
            ScoringMode::Stale => "stale",
        }
    }
}

impl std::str::FromStr for ScoringMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(ScoringMode::Hot),
            "risk" => Ok(ScoringMode::Risk),
            "complexity" => Ok(ScoringMode::Complexity),
            "stale" => Ok(ScoringMode::Stale),
            other => anyhow::bail!("unknown scoring mode: {other}"),
        }
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable breakdown component identifiers. Weight tables are keyed by this enum,
/// never by raw strings, per the closed-enumeration design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BreakdownKey {
    Commits,
    Churn,
    Age,
    Contrib,
    Size,
    InvContrib,
    Gini,
    Loc,
    LowRecent,
    InvRecent,
}

impl BreakdownKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakdownKey::Commits => "commits",
            BreakdownKey::Churn => "churn",
            BreakdownKey::Age => "age",
            BreakdownKey::Contrib => "contrib",
            BreakdownKey::Size => "size",
            BreakdownKey::InvContrib => "inv_contrib",
            BreakdownKey::Gini => "gini",
            BreakdownKey::Loc => "loc",
            BreakdownKey::LowRecent => "low_recent",
            BreakdownKey::InvRecent => "inv_recent",
        }
    }
}

/// Output selector. A plain data field on `Config`; the core does not know how
/// to render any of these, it only carries the caller's choice through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Per-file owner summary: up to two authors, ranked by commit count descending.
pub type Owners = Vec<String>;

/// Analysis configuration threaded through the whole pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo_path: PathBuf,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub lookback: Duration,
    pub mode: ScoringMode,
    pub workers: usize,
    pub result_limit: usize,
    pub path_filter: String,
    pub excludes: Vec<String>,
    pub follow: bool,
    pub compare_mode: bool,
    pub base_ref: Option<String>,
    pub target_ref: Option<String>,
    pub ts_path: Option<String>,
    pub ts_interval: Duration,
    pub ts_points: usize,
    pub risk_thresholds: HashMap<ScoringMode, f64>,
    pub custom_weights: HashMap<ScoringMode, HashMap<String, f64>>,
    pub output: OutputFormat,
}

impl Config {
    /// Clone this config with the analysis window replaced. Used by `TimeSeries`
    /// and `CheckEngine`, which both run the pipeline repeatedly over different windows.
    pub fn with_window(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Config {
        let mut next = self.clone();
        next.start_time = start;
        next.end_time = end;
        next
    }
}

/// Per-file scored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FileResult {
    pub path: String,
    pub size_bytes: u64,
    pub lines_of_code: u64,
    pub commits: u64,
    pub churn: u64,
    pub recent_commits: u64,
    pub recent_churn: u64,
    pub recent_contributors: u64,
    pub unique_contributors: u64,
    pub gini: f64,
    pub first_commit: Option<DateTime<Utc>>,
    pub age_days: u64,
    pub owners: Owners,
    pub all_scores: BTreeMap<ScoringMode, f64>,
    pub mode: ScoringMode,
    pub mode_score: f64,
    pub breakdown: BTreeMap<String, f64>,
}

impl FileResult {
    pub fn score_for(&self, mode: ScoringMode) -> f64 {
        self.all_scores.get(&mode).copied().unwrap_or(0.0)
    }
}

/// Folder roll-up record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FolderResult {
    pub path: String,
    pub commits: u64,
    pub churn: u64,
    pub total_loc: u64,
    pub weighted_score_sum: f64,
    pub score: f64,
    pub owners: Owners,
}

/// File-or-folder change status between a base and target analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    Active,
    Inactive,
    Unknown,
}

/// One path's comparison record, emitted only when `|delta_score| > 0.01`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonDetails {
    pub path: String,
    pub status: Status,
    pub delta_score: f64,
    pub delta_commits: i64,
    pub delta_churn: i64,
    pub delta_loc: i64,
    pub delta_contributors: i64,
    pub base_owners: Owners,
    pub target_owners: Owners,
    pub ownership_changed: bool,
}

/// Aggregate summary over every joined path, not just the emitted subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonSummary {
    pub net_score_delta: f64,
    pub net_churn_delta: i64,
    pub total_new: u64,
    pub total_inactive: u64,
    pub total_modified: u64,
    pub ownership_changes: u64,
}

/// Full comparison result: filtered details plus the unfiltered summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonResult {
    pub mode: Option<ScoringMode>,
    pub details: Vec<ComparisonDetails>,
    pub summary: ComparisonSummary,
}

/// One point in a sliding-window time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TimeseriesPoint {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub lookback_days: i64,
    pub score: f64,
    pub owners: Owners,
    pub path: String,
    pub mode: ScoringMode,
}

/// One file that tripped a per-mode threshold during a check run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CheckFailure {
    pub path: String,
    pub mode: ScoringMode,
    pub score: f64,
    pub threshold: f64,
}

/// A path tied for the maximum score in a given mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MaxScoreFile {
    pub path: String,
    pub owners: Owners,
}

/// Result of a CI gating check run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CheckResult {
    pub passed: bool,
    pub failed_files: Vec<CheckFailure>,
    pub max_scores: BTreeMap<ScoringMode, f64>,
    pub max_score_files: BTreeMap<ScoringMode, Vec<MaxScoreFile>>,
    pub avg_scores: BTreeMap<ScoringMode, f64>,
    pub total_files: u64,
    pub base_ref: String,
    pub target_ref: String,
    pub thresholds: BTreeMap<ScoringMode, f64>,
    pub lookback_days: i64,
    pub checked_modes: Vec<ScoringMode>,
}
