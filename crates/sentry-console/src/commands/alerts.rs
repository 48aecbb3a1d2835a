//! Alerts command - one-shot listing and watch mode

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sentry_client::{Alert, SentryClient};
use sentry_session::{AlertPoller, DEFAULT_POLL_PERIOD};

use crate::output::{AlertRow, OutputContext, OutputFormat};

/// Show recent alerts, optionally refreshing until interrupted
pub async fn alerts(client: &SentryClient, watch: bool, ctx: &OutputContext) -> Result<()> {
    if !watch {
        let alerts = client.list_alerts().await?;
        if alerts.is_empty() {
            ctx.info("No alerts");
            return Ok(());
        }
        ctx.print(&alert_rows(&alerts));
        return Ok(());
    }

    ctx.info(&format!(
        "Watching alerts every {}s...",
        DEFAULT_POLL_PERIOD.as_secs()
    ));
    ctx.info("Press Ctrl+C to stop");

    let handle = AlertPoller::new(client.clone()).spawn();
    let feed = handle.feed();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut last: Vec<Alert> = Vec::new();
    while running.load(Ordering::SeqCst) {
        let current = feed.snapshot().await;
        if current != last {
            if ctx.format == OutputFormat::Table && !ctx.quiet {
                println!();
                ctx.info(&format!(
                    "Alerts as of {}",
                    chrono::Local::now().format("%H:%M:%S")
                ));
            }
            ctx.print(&alert_rows(&current));
            last = current;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    handle.stop();
    ctx.info("\nStopped");

    Ok(())
}

/// Build display rows for an alert list
pub fn alert_rows(alerts: &[Alert]) -> Vec<AlertRow> {
    alerts
        .iter()
        .map(|a| AlertRow {
            timestamp: a.timestamp.clone(),
            severity: a.severity.to_string(),
            message: a.message.clone(),
        })
        .collect()
}
