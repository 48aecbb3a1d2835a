//! Camera commands - start, stop, report

use std::sync::Arc;

use anyhow::{Context, Result};
use sentry_client::{CameraOrigin, SentryClient};
use sentry_session::{NullPlayback, SessionController, GENERIC_REPORT_FAILURE};

use crate::output::OutputContext;

/// Start a live camera session
pub async fn start(
    client: &SentryClient,
    device: Option<u32>,
    url: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let origin = match (device, url) {
        (_, Some(address)) => CameraOrigin::Stream(address.to_string()),
        (Some(index), None) => CameraOrigin::Device(index),
        (None, None) => CameraOrigin::Device(0),
    };

    ctx.info(&format!("Starting camera session ({})...", origin));

    // A fresh controller gives the address validation and payload shaping;
    // the session itself lives on the service side between invocations
    let controller = SessionController::new(client.clone(), Arc::new(NullPlayback));
    match controller.start_camera(origin).await {
        Ok(_) => {
            ctx.success("Camera session active");
            ctx.info(&format!("Live feed: {}", client.video_feed_url()?));
        }
        Err(e) => ctx.error(&e.to_string()),
    }

    Ok(())
}

/// Stop the live camera session
pub async fn stop(client: &SentryClient, ctx: &OutputContext) -> Result<()> {
    // Straight to the service; only it knows whether a session is open
    client
        .stop_camera()
        .await
        .context("Failed to stop camera session")?;

    ctx.success("Camera session stopped");
    Ok(())
}

/// Generate a report for the running camera session
pub async fn report(client: &SentryClient, ctx: &OutputContext) -> Result<()> {
    ctx.info("Requesting camera report...");

    match client.generate_camera_report().await {
        Ok(status) => ctx.success(&status),
        Err(e) => match e.service_message() {
            Some(message) => ctx.error(message),
            None => {
                tracing::warn!(error = %e, "Report request failed");
                ctx.error(GENERIC_REPORT_FAILURE);
            }
        },
    }

    Ok(())
}
