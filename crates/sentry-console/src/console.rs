//! Interactive session console
//!
//! Keeps one session controller and one alert poller alive across commands,
//! so the session semantics (idempotent start, busy-source rejection, stale
//! result discarding) apply the way they do in a long-lived control surface.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use indicatif::ProgressBar;
use sentry_client::{CameraOrigin, SentryClient};
use sentry_session::{
    AlertFeed, AlertPoller, AnalysisResult, PlaybackAdapter, SelectOutcome, SessionController,
    SessionSnapshot, SessionState, StartOutcome, StopOutcome, UploadedVideo,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::commands::alerts::alert_rows;
use crate::commands::reports::report_rows;
use crate::output::OutputContext;

/// Playback adapter that reports bindings on the terminal
#[derive(Default)]
struct TerminalPlayback {
    playing: AtomicBool,
}

#[async_trait]
impl PlaybackAdapter for TerminalPlayback {
    async fn bind_live_feed(&self, feed: Url) {
        self.playing.store(false, Ordering::SeqCst);
        println!("{} {}", "Live feed:".cyan(), feed);
    }

    async fn bind_media(&self, media: Url) {
        self.playing.store(false, Ordering::SeqCst);
        println!("{} {}", "Staged media:".cyan(), media);
    }

    async fn unbind(&self) {
        self.playing.store(false, Ordering::SeqCst);
        println!("{}", "Playback unbound".dimmed());
    }

    async fn toggle(&self) -> bool {
        // fetch_xor returns the previous value
        !self.playing.fetch_xor(true, Ordering::SeqCst)
    }
}

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Start(CameraOrigin),
    Stop,
    Select(PathBuf),
    Analyze,
    Report,
    Toggle,
    Alerts,
    Reports,
    Status,
    Health,
    Help,
    Quit,
}

/// Run the interactive console until quit, EOF or Ctrl+C
pub async fn run(client: SentryClient, ctx: &OutputContext) -> Result<()> {
    let controller = SessionController::new(client.clone(), Arc::new(TerminalPlayback::default()));
    let poller = AlertPoller::new(client.clone()).spawn();
    let feed = poller.feed();

    ctx.info("Sentry console. Type 'help' for commands, 'quit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("sentry> ");
        std::io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_line(line) {
                    Some(ConsoleCommand::Quit) => break,
                    Some(command) => dispatch(command, &controller, &client, &feed, ctx).await?,
                    None => ctx.error(&format!("Unrecognized: '{}'. Type 'help'.", line)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    poller.stop();
    if controller.state().await == SessionState::CameraActive {
        controller.stop_camera().await;
        // Give the detached stop request a moment to reach the service
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    ctx.info("Bye.");

    Ok(())
}

async fn dispatch(
    command: ConsoleCommand,
    controller: &SessionController,
    client: &SentryClient,
    feed: &AlertFeed,
    ctx: &OutputContext,
) -> Result<()> {
    match command {
        ConsoleCommand::Start(origin) => match controller.start_camera(origin).await {
            Ok(StartOutcome::Started) => ctx.success("Camera session active."),
            Ok(StartOutcome::AlreadyPending) => ctx.info("Still connecting, hold on."),
            Ok(StartOutcome::AlreadyActive) => ctx.info("Camera is already active."),
            Err(e) => ctx.error(&e.to_string()),
        },

        ConsoleCommand::Stop => match controller.stop_camera().await {
            StopOutcome::Stopped => ctx.success("Camera session stopped."),
            StopOutcome::NotActive => ctx.info("No camera session to stop."),
        },

        ConsoleCommand::Select(path) => match UploadedVideo::from_path(&path).await {
            Ok(video) => {
                let name = video.file_name().to_string();
                match controller.select_upload_file(video).await {
                    Ok(SelectOutcome::Loaded) => {
                        ctx.success(&format!("Loaded {}. Type 'analyze' to run analysis.", name));
                    }
                    Ok(SelectOutcome::NotVideo) => {
                        ctx.warn(&format!("{} is not a video file, ignored.", name));
                    }
                    Err(e) => ctx.error(&e.to_string()),
                }
            }
            Err(e) => ctx.error(&format!("Could not read {}: {}", path.display(), e)),
        },

        ConsoleCommand::Analyze => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Analyzing...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            let result = controller.analyze_upload().await;
            spinner.finish_and_clear();

            match result {
                Ok(AnalysisResult::Completed {
                    status,
                    events_found,
                }) => {
                    ctx.success(&status);
                    ctx.info(&format!("Events found: {}", events_found));
                }
                Ok(AnalysisResult::Failed { message }) => ctx.error(&message),
                Err(e) => ctx.error(&e.to_string()),
            }
        }

        ConsoleCommand::Report => match controller.generate_camera_report().await {
            Ok(message) => ctx.success(&message),
            Err(e) => ctx.error(&e.to_string()),
        },

        ConsoleCommand::Toggle => match controller.toggle_playback().await {
            Ok(true) => ctx.info("Playing."),
            Ok(false) => ctx.info("Paused."),
            Err(e) => ctx.error(&e.to_string()),
        },

        ConsoleCommand::Alerts => {
            let alerts = feed.snapshot().await;
            if alerts.is_empty() {
                ctx.info("No alerts yet.");
            } else {
                ctx.print(&alert_rows(&alerts));
            }
        }

        ConsoleCommand::Reports => match client.list_reports().await {
            Ok(reports) if reports.is_empty() => ctx.info("No reports found."),
            Ok(reports) => ctx.print(&report_rows(&reports)),
            Err(e) => ctx.error(&e.to_string()),
        },

        ConsoleCommand::Status => render_status(&controller.snapshot().await, ctx),

        ConsoleCommand::Health => match client.health().await {
            Ok(status) => {
                let message = status.message.unwrap_or_else(|| "-".to_string());
                ctx.print_kv(&[("Status", status.status), ("Message", message)]);
            }
            Err(e) => ctx.error(&format!("Service unreachable: {}", e)),
        },

        ConsoleCommand::Help => print_help(ctx),

        // Handled by the loop
        ConsoleCommand::Quit => {}
    }

    Ok(())
}

fn render_status(snapshot: &SessionSnapshot, ctx: &OutputContext) {
    let file = snapshot.file_name.clone().unwrap_or_else(|| "-".to_string());
    let analysis = snapshot
        .analysis
        .as_ref()
        .map(|r| r.message().to_string())
        .unwrap_or_else(|| "-".to_string());

    ctx.print_kv(&[
        ("State", snapshot.state.to_string()),
        ("Source", snapshot.source.to_string()),
        ("File", file),
        ("Connecting", snapshot.connecting.to_string()),
        ("Playing", snapshot.is_playing.to_string()),
        ("Last analysis", analysis),
    ]);
}

fn print_help(ctx: &OutputContext) {
    ctx.info("Commands:");
    ctx.info("  start [INDEX|ADDRESS]  start a camera session (default: device 0)");
    ctx.info("  stop                   stop the camera session");
    ctx.info("  select PATH            load a video file as the active source");
    ctx.info("  analyze                analyze the loaded video");
    ctx.info("  report                 generate a report for the camera session");
    ctx.info("  play | pause           toggle playback of the loaded video");
    ctx.info("  alerts                 show the latest alert snapshot");
    ctx.info("  reports                list generated reports");
    ctx.info("  status                 show the session state");
    ctx.info("  health                 check service health");
    ctx.info("  quit                   leave the console");
}

/// Parse one input line; `None` means unrecognized or incomplete
fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let rest = line[verb.len()..].trim();

    match verb.to_ascii_lowercase().as_str() {
        "start" => {
            if rest.is_empty() {
                Some(ConsoleCommand::Start(CameraOrigin::Device(0)))
            } else if let Ok(index) = rest.parse::<u32>() {
                Some(ConsoleCommand::Start(CameraOrigin::Device(index)))
            } else {
                Some(ConsoleCommand::Start(CameraOrigin::Stream(rest.to_string())))
            }
        }
        "stop" => Some(ConsoleCommand::Stop),
        "select" | "load" => {
            if rest.is_empty() {
                None
            } else {
                Some(ConsoleCommand::Select(PathBuf::from(rest)))
            }
        }
        "analyze" => Some(ConsoleCommand::Analyze),
        "report" => Some(ConsoleCommand::Report),
        "play" | "pause" | "toggle" => Some(ConsoleCommand::Toggle),
        "alerts" => Some(ConsoleCommand::Alerts),
        "reports" => Some(ConsoleCommand::Reports),
        "status" => Some(ConsoleCommand::Status),
        "health" => Some(ConsoleCommand::Health),
        "help" | "?" => Some(ConsoleCommand::Help),
        "quit" | "exit" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}
