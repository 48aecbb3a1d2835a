//! Reports commands - list, download, delete

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use sentry_client::{Report, ReportKind, SentryClient};

use crate::output::{OutputContext, ReportRow};

/// List generated reports, filtered locally
pub async fn reports(
    client: &SentryClient,
    kind: Option<&str>,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let kind = kind.map(parse_kind).transpose()?;

    let all = client.list_reports().await?;
    let filtered = filter_reports(all, kind, search);

    if filtered.is_empty() {
        ctx.info("No reports found");
        return Ok(());
    }

    ctx.print(&report_rows(&filtered));
    Ok(())
}

/// Download a report PDF to a local file
pub async fn download(
    client: &SentryClient,
    filename: &str,
    out: Option<&Path>,
    ctx: &OutputContext,
) -> Result<()> {
    let target = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(filename));

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Downloading {}...", filename));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = client.download_report(filename).await;
    spinner.finish_and_clear();

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Some(message) = e.service_message() {
                ctx.error(message);
                return Ok(());
            }
            return Err(e).context("Download failed");
        }
    };

    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    ctx.success(&format!("Saved {} ({} bytes)", target.display(), bytes.len()));
    Ok(())
}

/// Delete a report after confirmation
pub async fn delete(client: &SentryClient, id: i64, yes: bool, ctx: &OutputContext) -> Result<()> {
    if !yes && !confirm(&format!("Delete report {}? [y/N] ", id))? {
        ctx.info("Aborted");
        return Ok(());
    }

    match client.delete_report(id).await {
        Ok(()) => ctx.success(&format!("Report {} deleted", id)),
        Err(e) => match e.service_message() {
            Some(message) => ctx.error(message),
            None => return Err(e).context("Failed to delete report"),
        },
    }

    Ok(())
}

/// Build display rows for a report list
pub fn report_rows(reports: &[Report]) -> Vec<ReportRow> {
    reports
        .iter()
        .map(|r| ReportRow {
            id: r.id.to_string(),
            timestamp: r.timestamp.clone(),
            kind: r.report_type.to_string(),
            summary: r.summary.clone(),
            pdf_filename: r.pdf_filename.clone(),
        })
        .collect()
}

/// Kind filter and case-insensitive summary search, applied locally
fn filter_reports(
    reports: Vec<Report>,
    kind: Option<ReportKind>,
    search: Option<&str>,
) -> Vec<Report> {
    let needle = search.map(str::to_lowercase);
    reports
        .into_iter()
        .filter(|r| kind.map_or(true, |k| r.report_type == k))
        .filter(|r| {
            needle
                .as_ref()
                .map_or(true, |n| r.summary.to_lowercase().contains(n))
        })
        .collect()
}

fn parse_kind(raw: &str) -> Result<ReportKind> {
    match raw.to_ascii_lowercase().as_str() {
        "upload" => Ok(ReportKind::Upload),
        "camera" => Ok(ReportKind::Camera),
        other => anyhow::bail!("Unknown report kind: {} (expected upload or camera)", other),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
