//! One-shot repository-history scan: parses a `git log --numstat` stream into
//! per-path commit/churn/contributor/first-commit maps, reconciling renames
//! and filtering to paths alive at HEAD.
//!
//! Global invariants enforced:
//! - No global mutable state; the parser is a pure function over the log text
//!   and the `alive_at_head` set, returning a fresh `AggregateOutput`.
//! - Malformed lines are silently skipped (`ParseAnomaly`); they never fail
//!   the run.
//!
//! State machine: `Between` (outside a commit body) / `InCommit { author,
//! date }`. A commit-header line transitions `Between -> InCommit` (and resets
//! author/date on a subsequent header); numstat lines while `InCommit`
//! attribute to the current commit; blank lines leave the state unchanged.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::git::GitClient;
use crate::types::Config;

/// Result of a single repo-history scan. Every key appears in all four maps
/// *at most*; an absent key is equivalent to zero. Keys are post-rename
/// -reconciled paths that exist at HEAD.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateOutput {
    pub commit_count: HashMap<String, u64>,
    pub churn: HashMap<String, u64>,
    pub contributors: HashMap<String, HashMap<String, u64>>,
    pub first_commit: HashMap<String, DateTime<Utc>>,
}

impl AggregateOutput {
    pub fn commits_for(&self, path: &str) -> u64 {
        self.commit_count.get(path).copied().unwrap_or(0)
    }

    pub fn churn_for(&self, path: &str) -> u64 {
        self.churn.get(path).copied().unwrap_or(0)
    }

    pub fn contributors_for(&self, path: &str) -> &HashMap<String, u64> {
        static EMPTY: std::sync::OnceLock<HashMap<String, u64>> = std::sync::OnceLock::new();
        self.contributors
            .get(path)
            .unwrap_or_else(|| EMPTY.get_or_init(HashMap::new))
    }

    pub fn first_commit_for(&self, path: &str) -> Option<DateTime<Utc>> {
        self.first_commit.get(path).copied()
    }
}

enum ParseState {
    Between,
    InCommit {
        author: String,
        date: Option<DateTime<Utc>>,
    },
}

/// Scan the repository's full commit history over `config`'s window and
/// return per-path aggregates for every file alive at HEAD.
pub fn aggregate(
    git: &dyn GitClient,
    config: &Config,
    token: &CancellationToken,
) -> Result<AggregateOutput> {
    aggregate_at(git, &config.repo_path, config.start_time, config.end_time, token)
}

pub fn aggregate_at(
    git: &dyn GitClient,
    repo: &Path,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    token: &CancellationToken,
) -> Result<AggregateOutput> {
    let alive: HashSet<String> = git
        .list_files_at_ref(repo, "HEAD", token)?
        .into_iter()
        .collect();
    let log_bytes = git.get_activity_log(repo, start, end, token)?;
    let log = String::from_utf8_lossy(&log_bytes);
    Ok(parse_activity_log(&log, &alive))
}

/// Pure parser: no I/O, fully testable against literal log fixtures.
pub fn parse_activity_log(log: &str, alive_at_head: &HashSet<String>) -> AggregateOutput {
    let mut out = AggregateOutput::default();
    let mut state = ParseState::Between;

    for raw_line in log.lines() {
        let line = strip_quotes(raw_line.trim());
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix("--") {
            let mut parts = header.splitn(3, '|');
            let _sha = parts.next().unwrap_or_default();
            let author = parts.next().unwrap_or_default().to_string();
            let date_str = parts.next().unwrap_or_default();
            let date = DateTime::parse_from_rfc3339(date_str.trim())
                .map(|d| d.with_timezone(&Utc))
                .ok();
            state = ParseState::InCommit { author, date };
            continue;
        }

        if let ParseState::InCommit { author, date } = &state {
            if let Some((added, deleted, path_field)) = parse_numstat_line(&line) {
                attribute(&mut out, alive_at_head, &path_field, added, deleted, author, *date);
            }
        }
    }

    out
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '\'' || c == '"')
}

fn parse_numstat_line(line: &str) -> Option<(u64, u64, String)> {
    let mut parts = line.splitn(3, '\t');
    let added_str = parts.next()?;
    let deleted_str = parts.next()?;
    let path_field = parts.next()?;
    if path_field.is_empty() {
        return None;
    }
    let added = if added_str == "-" {
        0
    } else {
        added_str.trim().parse().ok()?
    };
    let deleted = if deleted_str == "-" {
        0
    } else {
        deleted_str.trim().parse().ok()?
    };
    Some((added, deleted, path_field.to_string()))
}

/// Parse a numstat path field into `(old_path, new_path)`. Handles plain
/// `old => new` and the compact `prefix{old => new}suffix` form. Returns
/// `(path, path)` when no rename arrow is present.
fn parse_rename(field: &str) -> (String, String) {
    let Some(arrow) = field.find("=>") else {
        return (field.to_string(), field.to_string());
    };

    if let Some(brace_start) = field[..arrow].find('{') {
        if let Some(brace_end) = field[arrow..].find('}').map(|i| arrow + i) {
            let prefix = &field[..brace_start];
            let inner = &field[brace_start + 1..brace_end];
            let suffix = &field[brace_end + 1..];
            let mut inner_parts = inner.splitn(2, "=>");
            let old_inner = inner_parts.next().unwrap_or_default().trim();
            let new_inner = inner_parts.next().unwrap_or_default().trim();
            return (
                format!("{prefix}{old_inner}{suffix}"),
                format!("{prefix}{new_inner}{suffix}"),
            );
        }
    }

    let mut parts = field.splitn(2, "=>");
    let old_path = parts.next().unwrap_or_default().trim().to_string();
    let new_path = parts.next().unwrap_or_default().trim().to_string();
    (old_path, new_path)
}

fn attribute(
    out: &mut AggregateOutput,
    alive_at_head: &HashSet<String>,
    path_field: &str,
    added: u64,
    deleted: u64,
    author: &str,
    date: Option<DateTime<Utc>>,
) {
    let (old_path, new_path) = parse_rename(path_field);
    let mut targets: Vec<&str> = Vec::with_capacity(2);
    if old_path == new_path {
        targets.push(&old_path);
    } else {
        targets.push(&old_path);
        targets.push(&new_path);
    }

    for target in targets {
        if !alive_at_head.contains(target) {
            continue;
        }
        *out.commit_count.entry(target.to_string()).or_insert(0) += 1;
        *out.churn.entry(target.to_string()).or_insert(0) += added + deleted;
        *out
            .contributors
            .entry(target.to_string())
            .or_default()
            .entry(author.to_string())
            .or_insert(0) += 1;
        if let Some(d) = date {
            out.first_commit
                .entry(target.to_string())
                .and_modify(|existing| {
                    if d < *existing {
                        *existing = d;
                    }
                })
                .or_insert(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alive(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_simple_commit() {
        let log = "--abc123|Alice|2024-01-15T10:00:00+00:00\n10\t2\tsrc/main.rs\n";
        let out = parse_activity_log(log, &alive(&["src/main.rs"]));
        assert_eq!(out.commits_for("src/main.rs"), 1);
        assert_eq!(out.churn_for("src/main.rs"), 12);
        assert_eq!(out.contributors_for("src/main.rs").get("Alice"), Some(&1));
    }

    #[test]
    fn binary_numstat_dash_counts_as_zero() {
        let log = "--abc|Bob|2024-01-01T00:00:00+00:00\n-\t-\tassets/logo.png\n";
        let out = parse_activity_log(log, &alive(&["assets/logo.png"]));
        assert_eq!(out.churn_for("assets/logo.png"), 0);
        assert_eq!(out.commits_for("assets/logo.png"), 1);
    }

    #[test]
    fn rename_attributes_only_to_alive_path() {
        let log = "--a|Carol|2024-02-01T00:00:00+00:00\n5\t1\ta/foo.go => a/bar.go\n";
        let out = parse_activity_log(log, &alive(&["a/bar.go"]));
        assert_eq!(out.commits_for("a/bar.go"), 1);
        assert_eq!(out.commits_for("a/foo.go"), 0);
    }

    #[test]
    fn rename_attributes_to_both_when_both_alive() {
        let log = "--a|Carol|2024-02-01T00:00:00+00:00\n5\t1\ta/foo.go => a/bar.go\n";
        let out = parse_activity_log(log, &alive(&["a/bar.go", "a/foo.go"]));
        assert_eq!(out.commits_for("a/bar.go"), 1);
        assert_eq!(out.commits_for("a/foo.go"), 1);
    }

    #[test]
    fn brace_rename_form() {
        let (old, new) = parse_rename("src/{old.rs => new.rs}");
        assert_eq!(old, "src/old.rs");
        assert_eq!(new, "src/new.rs");
    }

    #[test]
    fn unreconciled_path_not_alive_is_dropped() {
        let log = "--a|Dan|2024-03-01T00:00:00+00:00\n1\t1\tdeleted.rs\n";
        let out = parse_activity_log(log, &alive(&["kept.rs"]));
        assert!(out.commit_count.is_empty());
    }

    #[test]
    fn quoted_and_crlf_lines_tolerated() {
        let log = "'--a|Eve|2024-01-01T00:00:00+00:00'\r\n3\t0\tsrc/lib.rs\r\n";
        let out = parse_activity_log(log, &alive(&["src/lib.rs"]));
        assert_eq!(out.commits_for("src/lib.rs"), 1);
        assert_eq!(out.churn_for("src/lib.rs"), 3);
    }

    #[test]
    fn first_commit_is_earliest_observed() {
        let log = concat!(
            "--a|Ann|2024-06-01T00:00:00+00:00\n1\t0\tsrc/x.rs\n",
            "--b|Ann|2023-01-01T00:00:00+00:00\n1\t0\tsrc/x.rs\n",
        );
        let out = parse_activity_log(log, &alive(&["src/x.rs"]));
        let fc = out.first_commit_for("src/x.rs").unwrap();
        assert_eq!(fc.to_rfc3339(), "2023-01-01T00:00:00+00:00");
    }

    #[test]
    fn malformed_numstat_line_is_skipped() {
        let log = "--a|Ann|2024-01-01T00:00:00+00:00\nnot-a-numstat-line\n";
        let out = parse_activity_log(log, &alive(&["src/x.rs"]));
        assert!(out.commit_count.is_empty());
    }
}
