//! Test utilities for sentry-client
//!
//! Provides an in-process mock of the Sentry analysis service plus a test
//! server wrapper that shuts down when dropped. Tests script the mock's
//! replies, point a real client at it and assert on what was hit.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::{Alert, Report, Result, SentryClient};

/// What the mock answers to `POST /api/process-video`
#[derive(Debug, Clone)]
pub enum AnalysisReply {
    /// 200 with a well-formed body
    Completed { status: String, events_found: u64 },
    /// Structured error with the given status code
    Error { code: u16, message: String },
    /// 200 with a body that does not match the documented shape
    Malformed,
}

impl Default for AnalysisReply {
    fn default() -> Self {
        Self::Completed {
            status: "Analysis complete. 0 events detected.".into(),
            events_found: 0,
        }
    }
}

/// Scripted reply for one `GET /api/alerts` hit
#[derive(Debug, Clone)]
pub struct AlertsReply {
    /// Delay before answering
    pub delay: Duration,
    /// Alert list to answer with
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Default)]
struct MockState {
    camera_running: bool,
    start_delay: Duration,
    start_failure: Option<(u16, String)>,
    analysis_delay: Duration,
    analysis_reply: AnalysisReply,
    report_reply: Option<(u16, String)>,
    alerts: Vec<Alert>,
    alert_script: Vec<AlertsReply>,
    alerts_failing: bool,
    reports: Vec<Report>,
    report_files: HashMap<String, Vec<u8>>,
    start_hits: usize,
    stop_hits: usize,
    analyze_hits: usize,
    report_hits: usize,
    alert_hits: usize,
    last_start_source: Option<Value>,
    last_upload: Option<(String, usize)>,
}

/// In-process stand-in for the Sentry analysis service
///
/// Handlers mimic the real endpoints. Knobs let tests script failures,
/// delays and canned payloads; counters record what was hit.
#[derive(Clone, Default)]
pub struct MockSentryService {
    state: Arc<Mutex<MockState>>,
}

impl MockSentryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the axum router serving the mocked API surface
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health))
            .route("/api/start_camera", post(start_camera))
            .route("/api/stop_camera", post(stop_camera))
            .route("/api/video_feed", get(video_feed))
            .route("/api/process-video", post(process_video))
            .route("/api/generate-camera-report", post(generate_camera_report))
            .route("/api/alerts", get(alerts))
            .route("/api/reports", get(reports))
            .route("/api/download-report/{filename}", get(download_report))
            .route("/api/reports/{id}", delete(delete_report))
            .with_state(self.clone())
    }

    // -------------------------------------------------------------------------
    // Scripting knobs
    // -------------------------------------------------------------------------

    /// Answer every camera start with the given error until cleared
    pub async fn fail_start_with(&self, code: u16, message: &str) {
        self.state.lock().await.start_failure = Some((code, message.to_string()));
    }

    /// Sleep this long before answering a camera start
    pub async fn delay_start(&self, delay: Duration) {
        self.state.lock().await.start_delay = delay;
    }

    /// Answer every analysis upload with the given reply
    pub async fn set_analysis_reply(&self, reply: AnalysisReply) {
        self.state.lock().await.analysis_reply = reply;
    }

    /// Sleep this long before answering an analysis upload
    pub async fn delay_analysis(&self, delay: Duration) {
        self.state.lock().await.analysis_delay = delay;
    }

    /// Answer camera-report requests with the given code and status message
    pub async fn set_report_reply(&self, code: u16, message: &str) {
        self.state.lock().await.report_reply = Some((code, message.to_string()));
    }

    /// Default alert list served when no script entry is pending
    pub async fn set_alerts(&self, alerts: Vec<Alert>) {
        self.state.lock().await.alerts = alerts;
    }

    /// Queue per-hit alert replies, consumed front to back
    pub async fn script_alerts(&self, replies: Vec<AlertsReply>) {
        self.state.lock().await.alert_script = replies;
    }

    /// Make the alerts endpoint answer 500 until cleared
    pub async fn fail_alerts(&self, failing: bool) {
        self.state.lock().await.alerts_failing = failing;
    }

    /// Seed a report record
    pub async fn add_report(&self, report: Report) {
        self.state.lock().await.reports.push(report);
    }

    /// Seed a downloadable report file
    pub async fn put_report_file(&self, filename: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .await
            .report_files
            .insert(filename.to_string(), bytes);
    }

    // -------------------------------------------------------------------------
    // Observations
    // -------------------------------------------------------------------------

    pub async fn start_hits(&self) -> usize {
        self.state.lock().await.start_hits
    }

    pub async fn stop_hits(&self) -> usize {
        self.state.lock().await.stop_hits
    }

    pub async fn analyze_hits(&self) -> usize {
        self.state.lock().await.analyze_hits
    }

    pub async fn report_hits(&self) -> usize {
        self.state.lock().await.report_hits
    }

    pub async fn alert_hits(&self) -> usize {
        self.state.lock().await.alert_hits
    }

    /// Whether the mock believes a camera session is open
    pub async fn camera_running(&self) -> bool {
        self.state.lock().await.camera_running
    }

    /// Raw `source` value of the last start request
    pub async fn last_start_source(&self) -> Option<Value> {
        self.state.lock().await.last_start_source.clone()
    }

    /// File name and byte length of the last analysis upload
    pub async fn last_upload(&self) -> Option<(String, usize)> {
        self.state.lock().await.last_upload.clone()
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "Sentry AI is running"}))
}

async fn start_camera(
    State(svc): State<MockSentryService>,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let mut state = svc.state.lock().await;
        state.start_hits += 1;
        state.last_start_source = body.get("source").cloned();
        state.start_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut state = svc.state.lock().await;
    if let Some((code, message)) = state.start_failure.clone() {
        return error_response(code, &message);
    }
    state.camera_running = true;
    Json(json!({"status": "Camera started"})).into_response()
}

async fn stop_camera(State(svc): State<MockSentryService>) -> Json<Value> {
    let mut state = svc.state.lock().await;
    state.stop_hits += 1;
    state.camera_running = false;
    Json(json!({"status": "Camera stopped"}))
}

async fn video_feed() -> Response {
    (
        [(header::CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame")],
        "--frame\r\n",
    )
        .into_response()
}

async fn process_video(
    State(svc): State<MockSentryService>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            upload = Some((file_name, len));
        }
    }
    if upload.is_none() {
        return error_response(400, "No file part in the request");
    }

    let (reply, delay) = {
        let mut state = svc.state.lock().await;
        state.analyze_hits += 1;
        state.last_upload = upload;
        (state.analysis_reply.clone(), state.analysis_delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match reply {
        AnalysisReply::Completed {
            status,
            events_found,
        } => Json(json!({"status": status, "events_found": events_found})).into_response(),
        AnalysisReply::Error { code, message } => error_response(code, &message),
        AnalysisReply::Malformed => Json(json!({"unexpected": true})).into_response(),
    }
}

async fn generate_camera_report(State(svc): State<MockSentryService>) -> Response {
    let mut state = svc.state.lock().await;
    state.report_hits += 1;
    match state.report_reply.clone() {
        Some((code, message)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            // This endpoint reports failures under "status", not "error"
            (status, Json(json!({"status": message}))).into_response()
        }
        None => Json(json!({"status": "Report generated."})).into_response(),
    }
}

async fn alerts(State(svc): State<MockSentryService>) -> Response {
    let reply = {
        let mut state = svc.state.lock().await;
        state.alert_hits += 1;
        if state.alerts_failing {
            return error_response(500, "Alert buffer unavailable");
        }
        if state.alert_script.is_empty() {
            AlertsReply {
                delay: Duration::ZERO,
                alerts: state.alerts.clone(),
            }
        } else {
            state.alert_script.remove(0)
        }
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    Json(reply.alerts).into_response()
}

async fn reports(State(svc): State<MockSentryService>) -> Json<Vec<Report>> {
    let state = svc.state.lock().await;
    Json(state.reports.clone())
}

async fn download_report(
    State(svc): State<MockSentryService>,
    Path(filename): Path<String>,
) -> Response {
    let state = svc.state.lock().await;
    match state.report_files.get(&filename) {
        Some(bytes) => (
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes.clone(),
        )
            .into_response(),
        None => error_response(404, "Report file not found."),
    }
}

async fn delete_report(State(svc): State<MockSentryService>, Path(id): Path<i64>) -> Response {
    let mut state = svc.state.lock().await;
    let before = state.reports.len();
    state.reports.retain(|r| r.id != id);
    if state.reports.len() < before {
        Json(json!({"status": "Report deleted"})).into_response()
    } else {
        error_response(404, "Report not found")
    }
}

fn error_response(code: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": message}))).into_response()
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: SentryClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve a mock service and build a client pointed at it
    ///
    /// # Example
    ///
    /// ```ignore
    /// let service = MockSentryService::new();
    /// let server = TestServer::start(&service).await?;
    ///
    /// server.client.start_camera(&CameraOrigin::Device(0)).await?;
    /// assert_eq!(service.start_hits().await, 1);
    /// ```
    pub async fn start(service: &MockSentryService) -> Result<Self> {
        Self::start_with_timeout(service.router(), Duration::from_secs(5), Duration::from_secs(2))
            .await
    }

    /// Serve an arbitrary router with custom client timeouts
    pub async fn start_with_timeout(
        router: Router,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = SentryClient::with_config(&base_url, timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &SentryClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_format() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let url = format!("http://{}", addr);
        assert_eq!(url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_wait_for_immediate_condition() {
        let hit = tokio_test::block_on(wait_for(|| async { true }, Duration::from_millis(50)));
        assert!(hit);
    }
}
