//! Sliding-window time-series orchestrator: runs the full pipeline once per
//! point, with a per-point lookback dynamically derived from the path's own
//! history rather than a single fixed window.

use chrono::{DateTime, Duration, Utc};

use crate::aggregator;
use crate::analyzer;
use crate::cancel::CancellationToken;
use crate::folder_roll;
use crate::git::GitClient;
use crate::types::{Config, TimeseriesPoint};

pub const MIN_COMMITS: usize = 5;
pub const MAX_SEARCH_DURATION: Duration = Duration::days(10 * 365);
pub const MIN_LOOKBACK: Duration = Duration::days(7);

pub fn run(
    git: &dyn GitClient,
    config: &Config,
    path: &str,
    is_folder: bool,
    now: DateTime<Utc>,
    interval: Duration,
    num_points: usize,
    token: &CancellationToken,
) -> anyhow::Result<Vec<TimeseriesPoint>> {
    let all_files = git.list_files_at_ref(&config.repo_path, "HEAD", token)?;
    let relevant_files: Vec<String> = if is_folder {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        all_files.into_iter().filter(|f| f.starts_with(&prefix)).collect()
    } else {
        all_files.into_iter().filter(|f| f == path).collect()
    };

    let mut points = Vec::with_capacity(num_points);
    let interval_days = interval.num_days();

    for i in 0..num_points {
        token.check()?;
        let period_end = now - interval.checked_mul(i as i32).unwrap_or(Duration::zero());
        let period_start_candidate = period_end - interval;

        let oldest = git
            .get_oldest_commit_date_for_path(
                &config.repo_path,
                path,
                period_end,
                MIN_COMMITS,
                MAX_SEARCH_DURATION,
                token,
            )
            .ok()
            .flatten();

        let (start, end) = match oldest {
            Some(oldest_commit) => (oldest_commit.max(period_start_candidate), period_end),
            None => (period_end - interval.max(MIN_LOOKBACK), period_end),
        };

        let window_config = config.with_window(Some(start), Some(end));
        let aggregate = aggregator::aggregate_at(git, &config.repo_path, Some(start), Some(end), token)?;
        let results = analyzer::analyze(git, &window_config, &aggregate, &relevant_files, now, token)?;

        let (score, owners) = if is_folder {
            let folders = folder_roll::roll_up(&results, path);
            folders
                .into_iter()
                .find(|f| f.path == path)
                .map(|f| (f.score, f.owners))
                .unwrap_or((0.0, Vec::new()))
        } else {
            results
                .into_iter()
                .find(|f| f.path == path)
                .map(|f| (f.mode_score, f.owners))
                .unwrap_or((0.0, Vec::new()))
        };

        points.push(TimeseriesPoint {
            label: format!("{}-{}d ago", i as i64 * interval_days, (i as i64 + 1) * interval_days),
            start,
            end,
            lookback_days: (end - start).num_days(),
            score,
            owners,
            path: path.to_string(),
            mode: config.mode,
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    #[test]
    fn e5_point_labels() {
        let interval_days = 30i64;
        let labels: Vec<String> = (0..3)
            .map(|i: i64| format!("{}-{}d ago", i * interval_days, (i + 1) * interval_days))
            .collect();
        assert_eq!(labels, vec!["0-30d ago", "30-60d ago", "60-90d ago"]);
    }
}
