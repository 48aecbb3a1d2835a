//! Request and response types for the Sentry service API

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Camera Session Types
// =============================================================================

/// Where a live camera session reads its frames from.
///
/// Serialized untagged: a capture device index becomes a JSON number, a
/// network stream address a JSON string, matching what the service expects
/// in the `source` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraOrigin {
    /// Local capture device by index (0 is the default webcam)
    Device(u32),
    /// Network stream address (RTSP/HTTP)
    Stream(String),
}

impl fmt::Display for CameraOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraOrigin::Device(index) => write!(f, "device {}", index),
            CameraOrigin::Stream(address) => write!(f, "{}", address),
        }
    }
}

/// Body of `POST /api/start_camera`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCameraRequest {
    pub source: CameraOrigin,
}

// =============================================================================
// Alert Types
// =============================================================================

/// Alert severity (wire field `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Error => write!(f, "error"),
        }
    }
}

/// A single live-monitoring alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub severity: AlertSeverity,
    pub message: String,
    /// Wall-clock time as formatted by the service
    pub timestamp: String,
}

// =============================================================================
// Report Types
// =============================================================================

/// What kind of session produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Upload,
    Camera,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Upload => write!(f, "upload"),
            ReportKind::Camera => write!(f, "camera"),
        }
    }
}

/// A generated analysis report record
///
/// Lifecycle is fully owned by the service; the client only lists, downloads
/// and deletes these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub timestamp: String,
    pub report_type: ReportKind,
    pub summary: String,
    pub pdf_filename: String,
}

// =============================================================================
// Analysis Types
// =============================================================================

/// Successful answer of `POST /api/process-video`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub status: String,
    pub events_found: u64,
}

/// Answer of `POST /api/generate-camera-report`
///
/// The endpoint uses the `status` field for both success and failure bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAck {
    pub status: String,
}

// =============================================================================
// Health Types
// =============================================================================

/// Answer of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Error Body
// =============================================================================

/// Error body shape used across endpoints. Most put the message under
/// `error`; the camera-report endpoint answers failures under `status`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
