//! `GitClient`: the narrow capability the core depends on for all repository
//! access. The core never shells out itself; every history read, numstat dump,
//! and ref resolution goes through this trait.
//!
//! `CliGitClient` is the reference binding (shells to the system `git`, no
//! libgit2 dependency) for portability across environments without a build
//! toolchain for native bindings.
//!
//! Global invariants enforced:
//! - Every method is cancellation-aware; callers must check `token` promptly.
//! - A timeout from the underlying `git` process surfaces as a normal
//!   `HotspotError::GitUnavailable`, never a distinct kind.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};

use crate::cancel::CancellationToken;
use crate::error::{HotspotError, Result};

/// Commit-log / numstat bytes in whatever quoting dialect `git log` produced
/// them. The `Aggregator`/`FileBuilder` parsers are responsible for tolerating
/// CRLF and single-quote-wrapped lines (see `aggregator::parse_activity_log`).
pub type ActivityLog = Vec<u8>;

pub trait GitClient: Send + Sync {
    fn list_files_at_ref(
        &self,
        repo: &Path,
        git_ref: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>>;

    fn get_activity_log(
        &self,
        repo: &Path,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        token: &CancellationToken,
    ) -> Result<ActivityLog>;

    fn get_file_activity_log(
        &self,
        repo: &Path,
        path: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        follow: bool,
        token: &CancellationToken,
    ) -> Result<ActivityLog>;

    fn get_file_first_commit_time(
        &self,
        repo: &Path,
        path: &str,
        follow: bool,
        token: &CancellationToken,
    ) -> Result<Option<DateTime<Utc>>>;

    fn get_commit_time(
        &self,
        repo: &Path,
        git_ref: &str,
        token: &CancellationToken,
    ) -> Result<DateTime<Utc>>;

    fn get_changed_files_between_refs(
        &self,
        repo: &Path,
        base: &str,
        target: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>>;

    fn get_repo_hash(&self, repo: &Path, token: &CancellationToken) -> Result<String>;

    fn get_oldest_commit_date_for_path(
        &self,
        repo: &Path,
        path: &str,
        no_later_than: DateTime<Utc>,
        min_commits: usize,
        max_search: chrono::Duration,
        token: &CancellationToken,
    ) -> Result<Option<DateTime<Utc>>>;
}

/// Literal delimiter prefixing each commit header in `get_file_activity_log`
/// output, distinguishing it from the plain `--<sha>|<author>|<date>` header
/// used by `get_activity_log`.
pub const DELIMITER_COMMIT_START: &str = "@@HOTSPOT_COMMIT@@";

/// Shells out to the system `git` binary. No libgit2 dependency.
#[derive(Debug, Clone, Default)]
pub struct CliGitClient;

impl CliGitClient {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, repo: &Path, args: &[&str], token: &CancellationToken) -> Result<Vec<u8>> {
        token.check()?;
        let output = Command::new("git")
            .current_dir(repo)
            .args(args)
            .output()
            .map_err(|e| HotspotError::GitUnavailable(format!("failed to invoke git: {e}")))?;
        token.check()?;
        if !output.status.success() {
            return Err(HotspotError::GitUnavailable(format!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output.stdout)
    }

    fn run_str(&self, repo: &Path, args: &[&str], token: &CancellationToken) -> Result<String> {
        let out = self.run(repo, args, token)?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

impl GitClient for CliGitClient {
    fn list_files_at_ref(
        &self,
        repo: &Path,
        git_ref: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>> {
        let out = self.run_str(repo, &["ls-tree", "-r", "--name-only", git_ref], token)?;
        Ok(out.lines().map(|l| l.trim().to_string()).collect())
    }

    fn get_activity_log(
        &self,
        repo: &Path,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        token: &CancellationToken,
    ) -> Result<ActivityLog> {
        let mut args = vec![
            "log".to_string(),
            "--no-color".to_string(),
            "--numstat".to_string(),
            "--date=iso-strict".to_string(),
            "--pretty=format:--%H|%an|%ad".to_string(),
        ];
        if let Some(s) = start {
            args.push(format!("--since={}", fmt_time(s)));
        }
        if let Some(e) = end {
            args.push(format!("--until={}", fmt_time(e)));
        }
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(repo, &refs, token)
    }

    fn get_file_activity_log(
        &self,
        repo: &Path,
        path: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        follow: bool,
        token: &CancellationToken,
    ) -> Result<ActivityLog> {
        let mut args = vec![
            "log".to_string(),
            "--no-color".to_string(),
            "--numstat".to_string(),
            "--date=iso-strict".to_string(),
            format!("--pretty=format:{DELIMITER_COMMIT_START}%an|%ad"),
        ];
        if follow {
            args.push("--follow".to_string());
        }
        if let Some(s) = start {
            args.push(format!("--since={}", fmt_time(s)));
        }
        if let Some(e) = end {
            args.push(format!("--until={}", fmt_time(e)));
        }
        args.push("--".to_string());
        args.push(path.to_string());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(repo, &refs, token)
    }

    fn get_file_first_commit_time(
        &self,
        repo: &Path,
        path: &str,
        follow: bool,
        token: &CancellationToken,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut args = vec![
            "log".to_string(),
            "--reverse".to_string(),
            "--date=iso-strict".to_string(),
            "--pretty=format:%ad".to_string(),
            "-1".to_string(),
        ];
        if follow {
            args.push("--follow".to_string());
        }
        args.push("--".to_string());
        args.push(path.to_string());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.run_str(repo, &refs, token)?;
        if out.is_empty() {
            return Ok(None);
        }
        parse_iso(&out).map(Some)
    }

    fn get_commit_time(
        &self,
        repo: &Path,
        git_ref: &str,
        token: &CancellationToken,
    ) -> Result<DateTime<Utc>> {
        let out = self.run_str(
            repo,
            &["show", "-s", "--date=iso-strict", "--pretty=format:%ad", git_ref],
            token,
        )?;
        parse_iso(&out)
    }

    fn get_changed_files_between_refs(
        &self,
        repo: &Path,
        base: &str,
        target: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>> {
        let range = format!("{base}...{target}");
        let out = self.run_str(repo, &["diff", "--name-only", &range], token)?;
        Ok(out.lines().map(|l| l.trim().to_string()).collect())
    }

    fn get_repo_hash(&self, repo: &Path, token: &CancellationToken) -> Result<String> {
        match self.run_str(repo, &["rev-parse", "HEAD"], token) {
            Ok(s) => Ok(s),
            Err(_) => Ok(String::new()),
        }
    }

    fn get_oldest_commit_date_for_path(
        &self,
        repo: &Path,
        path: &str,
        no_later_than: DateTime<Utc>,
        min_commits: usize,
        max_search: chrono::Duration,
        token: &CancellationToken,
    ) -> Result<Option<DateTime<Utc>>> {
        let earliest_bound = no_later_than - max_search;
        let out = self.run_str(
            repo,
            &[
                "log",
                "--date=iso-strict",
                "--pretty=format:%ad",
                &format!("--until={}", fmt_time(no_later_than)),
                &format!("--since={}", fmt_time(earliest_bound)),
                "--",
                path,
            ],
            token,
        )?;
        let dates: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
        if dates.len() < min_commits {
            return Ok(None);
        }
        // git log is newest-first; the oldest entry within the bound is last.
        match dates.last() {
            Some(d) => parse_iso(d).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_iso(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| HotspotError::GitUnavailable(format!("bad date {s:?}: {e}")))
}
