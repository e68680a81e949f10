//! Output rendering: text (comfy-table), JSON (serde_json), CSV (csv crate).
//!
//! Global invariant: identical input yields byte-for-byte identical output
//! (no wall-clock timestamps or non-deterministic ordering sneak into a
//! rendered report; ordering is whatever `Ranker`/`Comparator` already fixed).

use anyhow::Result;
use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Table};
use hotspot_core::{CheckResult, ComparisonResult, FileResult, FolderResult, OutputFormat, TimeseriesPoint};

pub fn render_files(files: &[FileResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(files)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record([
                "path", "mode", "score", "commits", "churn", "loc", "contributors", "age_days", "owners",
            ])?;
            for f in files {
                writer.write_record([
                    f.path.as_str(),
                    f.mode.as_str(),
                    &format!("{:.2}", f.mode_score),
                    &f.commits.to_string(),
                    &f.churn.to_string(),
                    &f.lines_of_code.to_string(),
                    &f.unique_contributors.to_string(),
                    &f.age_days.to_string(),
                    &f.owners.join(";"),
                ])?;
            }
            Ok(String::from_utf8(writer.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table.load_preset(UTF8_HORIZONTAL_ONLY).set_header(vec![
                "Path", "Score", "Commits", "Churn", "LOC", "Contributors", "Age (d)", "Owners",
            ]);
            for f in files {
                table.add_row(vec![
                    f.path.clone(),
                    format!("{:.1}", f.mode_score),
                    f.commits.to_string(),
                    f.churn.to_string(),
                    f.lines_of_code.to_string(),
                    f.unique_contributors.to_string(),
                    f.age_days.to_string(),
                    f.owners.join(", "),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_folders(folders: &[FolderResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(folders)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["path", "score", "commits", "churn", "total_loc", "owners"])?;
            for f in folders {
                writer.write_record([
                    f.path.as_str(),
                    &format!("{:.2}", f.score),
                    &f.commits.to_string(),
                    &f.churn.to_string(),
                    &f.total_loc.to_string(),
                    &f.owners.join(";"),
                ])?;
            }
            Ok(String::from_utf8(writer.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_HORIZONTAL_ONLY)
                .set_header(vec!["Folder", "Score", "Commits", "Churn", "Total LOC", "Owners"]);
            for f in folders {
                table.add_row(vec![
                    f.path.clone(),
                    format!("{:.1}", f.score),
                    f.commits.to_string(),
                    f.churn.to_string(),
                    f.total_loc.to_string(),
                    f.owners.join(", "),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_comparison(result: &ComparisonResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["path", "status", "delta_score", "delta_commits", "delta_churn", "ownership_changed"])?;
            for d in &result.details {
                writer.write_record([
                    d.path.as_str(),
                    &format!("{:?}", d.status),
                    &format!("{:.2}", d.delta_score),
                    &d.delta_commits.to_string(),
                    &d.delta_churn.to_string(),
                    &d.ownership_changed.to_string(),
                ])?;
            }
            Ok(String::from_utf8(writer.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table.load_preset(UTF8_HORIZONTAL_ONLY).set_header(vec![
                "Path", "Status", "ΔScore", "ΔCommits", "ΔChurn", "Owners Changed",
            ]);
            for d in &result.details {
                table.add_row(vec![
                    d.path.clone(),
                    format!("{:?}", d.status),
                    format!("{:+.1}", d.delta_score),
                    format!("{:+}", d.delta_commits),
                    format!("{:+}", d.delta_churn),
                    d.ownership_changed.to_string(),
                ]);
            }
            let mut out = table.to_string();
            out.push_str(&format!(
                "\n\nnet score delta: {:+.2}, new: {}, inactive: {}, modified: {}, ownership changes: {}\n",
                result.summary.net_score_delta,
                result.summary.total_new,
                result.summary.total_inactive,
                result.summary.total_modified,
                result.summary.ownership_changes,
            ));
            Ok(out)
        }
    }
}

pub fn render_timeseries(points: &[TimeseriesPoint], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(points)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["label", "path", "score", "owners"])?;
            for p in points {
                writer.write_record([
                    p.label.as_str(),
                    p.path.as_str(),
                    &format!("{:.2}", p.score),
                    &p.owners.join(";"),
                ])?;
            }
            Ok(String::from_utf8(writer.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_HORIZONTAL_ONLY)
                .set_header(vec!["Window", "Score", "Owners"]);
            for p in points {
                table.add_row(vec![p.label.clone(), format!("{:.1}", p.score), p.owners.join(", ")]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_check(result: &CheckResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["path", "mode", "score", "threshold"])?;
            for f in &result.failed_files {
                writer.write_record([
                    f.path.as_str(),
                    f.mode.as_str(),
                    &format!("{:.2}", f.score),
                    &format!("{:.2}", f.threshold),
                ])?;
            }
            Ok(String::from_utf8(writer.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_HORIZONTAL_ONLY)
                .set_header(vec!["Path", "Mode", "Score", "Threshold"]);
            for f in &result.failed_files {
                table.add_row(vec![
                    f.path.clone(),
                    f.mode.to_string(),
                    format!("{:.1}", f.score),
                    format!("{:.1}", f.threshold),
                ]);
            }
            let mut out = table.to_string();
            out.push_str(&format!(
                "\n\n{} ({} files checked, {} failures)\n",
                if result.passed { "PASSED" } else { "FAILED" },
                result.total_files,
                result.failed_files.len(),
            ));
            Ok(out)
        }
    }
}
