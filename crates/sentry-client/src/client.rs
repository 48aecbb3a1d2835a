//! Sentry service HTTP client implementation

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, SentryClientError};
use crate::types::*;

/// URL-encode a file name for use in a path segment.
///
/// Report filenames carrying a directory prefix like `"output/report.pdf"`
/// must form a single path segment rather than being split across two
/// segments by the literal `/`.
fn encode_path_segment(name: &str) -> String {
    name.replace('/', "%2F")
}

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sentry analysis service REST client
///
/// One method per remote operation. Cloning is cheap; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct SentryClient {
    client: Client,
    base_url: Url,
}

impl SentryClient {
    /// Create a new client with default timeouts
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the service (e.g., "http://localhost:5000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    ///
    /// The request timeout also bounds how long a camera start can take
    /// before the attempt fails; callers tracking a connecting phase are
    /// guaranteed an answer within it.
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // Health Check
    // =========================================================================

    /// Check service health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.base_url.join("/api/health")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Camera Session Operations
    // =========================================================================

    /// Ask the service to open a live camera session
    ///
    /// The origin is sent as the `source` field: a JSON number for a capture
    /// device, a JSON string for a network stream.
    #[instrument(skip(self))]
    pub async fn start_camera(&self, origin: &CameraOrigin) -> Result<()> {
        let url = self.base_url.join("/api/start_camera")?;
        debug!("Starting camera session ({}) via {}", origin, url);

        let request = StartCameraRequest {
            source: origin.clone(),
        };
        let response = self.client.post(url).json(&request).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Ask the service to close the live camera session
    #[instrument(skip(self))]
    pub async fn stop_camera(&self) -> Result<()> {
        let url = self.base_url.join("/api/stop_camera")?;
        let response = self.client.post(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Locator of the live MJPEG feed served while a camera session is open
    ///
    /// The feed itself is consumed by a playback adapter, not by this client.
    pub fn video_feed_url(&self) -> Result<Url> {
        self.base_url.join("/api/video_feed").map_err(Into::into)
    }

    /// Trigger report generation for the running camera session
    ///
    /// Returns the service status message. This endpoint reports failures
    /// under the same `status` field it uses on success, so a structured
    /// error carries that text as its message.
    #[instrument(skip(self))]
    pub async fn generate_camera_report(&self) -> Result<String> {
        let url = self.base_url.join("/api/generate-camera-report")?;
        let response = self.client.post(url).send().await?;
        self.handle_response::<ReportAck>(response)
            .await
            .map(|ack| ack.status)
    }

    // =========================================================================
    // Video Analysis
    // =========================================================================

    /// Upload a video file for analysis
    ///
    /// Sends the bytes as the multipart `file` field and waits until the
    /// service has finished analyzing. A success body missing `status` or
    /// `events_found` is reported as a decode failure, never as a partial
    /// result.
    #[instrument(skip(self, bytes))]
    pub async fn analyze_video(
        &self,
        file_name: &str,
        media_type: &str,
        bytes: Bytes,
    ) -> Result<AnalysisReport> {
        let url = self.base_url.join("/api/process-video")?;
        debug!("Uploading {} ({} bytes) for analysis", file_name, bytes.len());

        let part = Part::stream(reqwest::Body::from(bytes))
            .file_name(file_name.to_string())
            .mime_str(media_type)
            .map_err(|e| SentryClientError::InvalidMediaType(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    /// Fetch the current alert snapshot
    ///
    /// The service answers with its most recent alerts, newest first; list
    /// size is owned by the service.
    #[instrument(skip(self))]
    pub async fn list_alerts(&self) -> Result<Vec<Alert>> {
        let url = self.base_url.join("/api/alerts")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Report Records
    // =========================================================================

    /// List all generated reports
    #[instrument(skip(self))]
    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        let url = self.base_url.join("/api/reports")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Download a generated report PDF
    #[instrument(skip(self))]
    pub async fn download_report(&self, pdf_filename: &str) -> Result<Bytes> {
        let url = self.base_url.join(&format!(
            "/api/download-report/{}",
            encode_path_segment(pdf_filename)
        ))?;

        let response = self.client.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.bytes().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Delete a report record and its PDF by id
    #[instrument(skip(self))]
    pub async fn delete_report(&self, id: i64) -> Result<()> {
        let url = self.base_url.join(&format!("/api/reports/{}", id))?;
        let response = self.client.delete(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SentryClientError::Decode(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    /// Extract error from failed response
    async fn extract_error(&self, response: reqwest::Response) -> SentryClientError {
        let status = response.status();
        self.extract_error_from_status(response, status).await
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> SentryClientError {
        // Try to parse the error body; most endpoints use "error", the
        // camera-report endpoint uses "status".
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body
                .error
                .or(body.status)
                .unwrap_or_else(|| format!("HTTP {}", status)),
            Err(_) => format!("HTTP {}", status),
        };

        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SentryClientError::Timeout,
            _ => SentryClientError::service_error(status.as_u16(), message),
        }
    }
}
