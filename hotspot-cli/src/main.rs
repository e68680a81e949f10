//! Hotspot CLI - git-history-driven file and folder hotspot scoring.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use hotspot_core::config::{self, CliOverrides};
use hotspot_core::git::{CliGitClient, GitClient};
use hotspot_core::types::{Config, OutputFormat as CoreOutputFormat, ScoringMode};
use hotspot_core::{cache, cancel::CancellationToken, check, comparator, timeseries};

mod render;
mod store;

use store::SqliteStore;

#[derive(Parser)]
#[command(name = "hotspot")]
#[command(about = "git-history-driven file and folder hotspot scoring")]
#[command(version = env!("HOTSPOT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a repository and rank files/folders by the chosen scoring mode.
    Analyze {
        /// Path to the repository root.
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Scoring mode.
        #[arg(long, value_enum, default_value = "hot")]
        mode: Mode,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Restrict analysis to paths under this prefix.
        #[arg(long, default_value = "")]
        path_filter: String,

        /// Substring exclude patterns; may be repeated.
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Number of analysis workers.
        #[arg(long)]
        workers: Option<usize>,

        /// Max number of results to keep (0 = unlimited for files).
        #[arg(long)]
        top: Option<usize>,

        /// History lookback window, in days.
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Re-analyze the top-ranked files with per-file rename-following history.
        #[arg(long)]
        follow: bool,

        /// Path to an explicit config file (default: auto-discover).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compare a base ref against a target ref.
    Compare {
        /// Path to the repository root.
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Base ref.
        #[arg(long)]
        base: String,

        /// Target ref.
        #[arg(long)]
        target: String,

        /// Scoring mode.
        #[arg(long, value_enum, default_value = "hot")]
        mode: Mode,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Max number of comparison rows to keep (0 = unlimited).
        #[arg(long, default_value_t = 0)]
        top: usize,

        /// History lookback window, in days.
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Path to an explicit config file (default: auto-discover).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Plot a path's score over a sliding window of historical periods.
    Timeseries {
        /// Path to the repository root.
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// File or folder path to track.
        #[arg(long)]
        path: String,

        /// Treat `path` as a folder prefix rather than a single file.
        #[arg(long)]
        folder: bool,

        /// Scoring mode.
        #[arg(long, value_enum, default_value = "hot")]
        mode: Mode,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Width of each period, in days.
        #[arg(long, default_value_t = 30)]
        interval_days: i64,

        /// Number of periods to plot, most recent first.
        #[arg(long, default_value_t = 6)]
        points: usize,
    },
    /// Gate CI on per-mode score thresholds between two refs.
    Check {
        /// Path to the repository root.
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Base ref.
        #[arg(long)]
        base: String,

        /// Target ref.
        #[arg(long)]
        target: String,

        /// Per-mode threshold, e.g. `--threshold hot=75`. May be repeated.
        #[arg(long = "threshold", value_parser = parse_threshold)]
        thresholds: Vec<(ScoringMode, f64)>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// History lookback window, in days.
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Path to an explicit config file (default: auto-discover).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Inspect the resolved configuration.
    #[command(subcommand)]
    Config(ConfigAction),
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis.
    Validate {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(default_value = ".")]
        repo: PathBuf,
    },
    /// Print the resolved configuration (file defaults merged with CLI overrides).
    Show {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(default_value = ".")]
        repo: PathBuf,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Mode {
    Hot,
    Risk,
    Complexity,
    Stale,
}

impl From<Mode> for ScoringMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Hot => ScoringMode::Hot,
            Mode::Risk => ScoringMode::Risk,
            Mode::Complexity => ScoringMode::Complexity,
            Mode::Stale => ScoringMode::Stale,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

impl From<Format> for CoreOutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => CoreOutputFormat::Text,
            Format::Json => CoreOutputFormat::Json,
            Format::Csv => CoreOutputFormat::Csv,
        }
    }
}

fn parse_threshold(s: &str) -> std::result::Result<(ScoringMode, f64), String> {
    let (mode, value) = s.split_once('=').ok_or_else(|| format!("expected mode=value, got {s:?}"))?;
    let mode: ScoringMode = mode.parse().map_err(|e| format!("{e}"))?;
    let value: f64 = value.parse().map_err(|_| format!("not a number: {value:?}"))?;
    Ok((mode, value))
}

fn resolved_config(
    repo: &PathBuf,
    explicit: Option<&PathBuf>,
    overrides: CliOverrides,
) -> Result<config::ResolvedConfig> {
    let raw = config::load(explicit.map(|p| p.as_path()), repo)?;
    config::resolve(&raw, overrides)
}

fn base_config(repo: PathBuf, resolved: &config::ResolvedConfig, format: CoreOutputFormat) -> Config {
    Config {
        repo_path: repo,
        start_time: None,
        end_time: None,
        lookback: chrono::Duration::days(resolved.lookback_days),
        mode: resolved.mode,
        workers: resolved.workers,
        result_limit: resolved.result_limit,
        path_filter: resolved.path_filter.clone(),
        excludes: resolved.excludes.clone(),
        follow: resolved.follow,
        compare_mode: false,
        base_ref: None,
        target_ref: None,
        ts_path: None,
        ts_interval: chrono::Duration::days(30),
        ts_points: 0,
        risk_thresholds: resolved.risk_thresholds.clone(),
        custom_weights: resolved.custom_weights.clone(),
        output: format,
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let git = CliGitClient::new();
    let token = CancellationToken::new();
    let now = chrono::Utc::now();

    match cli.command {
        Commands::Analyze {
            repo,
            mode,
            format,
            path_filter,
            excludes,
            workers,
            top,
            lookback_days,
            follow,
            config: config_path,
        } => {
            let overrides = CliOverrides {
                mode: Some(mode.into()),
                workers,
                result_limit: top,
                path_filter: if path_filter.is_empty() { None } else { Some(path_filter) },
                excludes,
                follow: if follow { Some(true) } else { None },
                lookback_days,
                ..Default::default()
            };
            let resolved = resolved_config(&repo, config_path.as_ref(), overrides)?;
            let config = base_config(repo.clone(), &resolved, format.into());
            let store = SqliteStore::open(&repo)?;

            let pb = spinner("analyzing repository history...");
            let output = hotspot_core::analyze(&git, &store, &config, now, &token)?;
            pb.finish_and_clear();

            println!("{}", render::render_files(&output.files, format.into())?);
            if !output.folders.is_empty() {
                println!("\n{}", render::render_folders(&output.folders, format.into())?);
            }
        }

        Commands::Compare {
            repo,
            base,
            target,
            mode,
            format,
            top,
            lookback_days,
            config: config_path,
        } => {
            let overrides = CliOverrides {
                mode: Some(mode.into()),
                lookback_days,
                ..Default::default()
            };
            let resolved = resolved_config(&repo, config_path.as_ref(), overrides)?;
            let store = SqliteStore::open(&repo)?;

            let base_time = git
                .get_commit_time(&repo, &base, &token)
                .context("failed to resolve base ref")?;
            let target_time = git
                .get_commit_time(&repo, &target, &token)
                .context("failed to resolve target ref")?;
            let lookback = chrono::Duration::days(resolved.lookback_days);

            let mut shared_config = base_config(repo.clone(), &resolved, format.into());
            shared_config.compare_mode = true;
            shared_config.base_ref = Some(base.clone());
            shared_config.target_ref = Some(target.clone());
            let base_window = shared_config.with_window(Some(base_time - lookback), Some(base_time));
            let target_window = shared_config.with_window(Some(target_time - lookback), Some(target_time));

            let pb = spinner("comparing refs...");

            let base_files = git.list_files_at_ref(&repo, &base, &token)?;
            let base_aggregate = cache::AggregateCache::new(&store).get_or_compute(&git, &base_window, now, &token)?;
            let base_output = hotspot_core::analyzer::analyze(&git, &base_window, &base_aggregate, &base_files, now, &token)?;

            let target_files = git.list_files_at_ref(&repo, &target, &token)?;
            let target_aggregate =
                cache::AggregateCache::new(&store).get_or_compute(&git, &target_window, now, &token)?;
            let target_output =
                hotspot_core::analyzer::analyze(&git, &target_window, &target_aggregate, &target_files, now, &token)?;

            pb.finish_and_clear();

            let result = comparator::compare(&base_output, &target_output, top, resolved.mode);
            println!("{}", render::render_comparison(&result, format.into())?);
        }

        Commands::Timeseries {
            repo,
            path,
            folder,
            mode,
            format,
            interval_days,
            points,
        } => {
            let overrides = CliOverrides {
                mode: Some(mode.into()),
                ..Default::default()
            };
            let resolved = resolved_config(&repo, None, overrides)?;
            let config = base_config(repo.clone(), &resolved, format.into());

            let pb = spinner("walking history...");
            let series = timeseries::run(
                &git,
                &config,
                &path,
                folder,
                now,
                chrono::Duration::days(interval_days),
                points,
                &token,
            )?;
            pb.finish_and_clear();

            println!("{}", render::render_timeseries(&series, format.into())?);
        }

        Commands::Check {
            repo,
            base,
            target,
            thresholds,
            format,
            lookback_days,
            config: config_path,
        } => {
            let mut risk_thresholds: HashMap<ScoringMode, f64> = HashMap::new();
            for (mode, value) in thresholds {
                risk_thresholds.insert(mode, value);
            }
            let overrides = CliOverrides {
                lookback_days,
                risk_thresholds,
                ..Default::default()
            };
            let resolved = resolved_config(&repo, config_path.as_ref(), overrides)?;
            let mut config = base_config(repo.clone(), &resolved, format.into());
            config.compare_mode = true;
            config.base_ref = Some(base);
            config.target_ref = Some(target);
            let store = SqliteStore::open(&repo)?;

            let pb = spinner("checking thresholds...");
            let result = check::run(&git, &store, &config, now, &token)?;
            pb.finish_and_clear();

            println!("{}", render::render_check(&result, format.into())?);
            if !result.passed {
                std::process::exit(1);
            }
        }

        Commands::Config(ConfigAction::Validate { path, repo }) => {
            let raw = config::load(path.as_deref(), &repo).context("invalid config file")?;
            config::resolve(&raw, CliOverrides::default())?;
            println!("config is valid");
        }

        Commands::Config(ConfigAction::Show { path, repo }) => {
            let raw = config::load(path.as_deref(), &repo)?;
            let resolved = config::resolve(&raw, CliOverrides::default())?;
            println!("{resolved:#?}");
        }
    }

    Ok(())
}
