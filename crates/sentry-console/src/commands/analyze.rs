//! Analyze command - upload a video file for analysis

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use sentry_client::SentryClient;
use sentry_session::{
    AnalysisResult, NullPlayback, SelectOutcome, SessionController, UploadedVideo,
};

use crate::output::OutputContext;

/// Analyze a video file and print the outcome
pub async fn analyze(client: &SentryClient, file: &Path, ctx: &OutputContext) -> Result<()> {
    let video = UploadedVideo::from_path(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let size = video.len();

    let controller = SessionController::new(client.clone(), Arc::new(NullPlayback));
    match controller.select_upload_file(video).await? {
        SelectOutcome::NotVideo => {
            ctx.error(&format!("{} is not a video file", file.display()));
            return Ok(());
        }
        SelectOutcome::Loaded => {
            ctx.info(&format!("Uploading {} ({} bytes)...", file.display(), size));
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Analyzing...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = controller.analyze_upload().await;
    spinner.finish_and_clear();

    match result? {
        AnalysisResult::Completed {
            status,
            events_found,
        } => {
            ctx.success(&status);
            ctx.info(&format!("Events found: {}", events_found));
        }
        AnalysisResult::Failed { message } => ctx.error(&message),
    }

    Ok(())
}
