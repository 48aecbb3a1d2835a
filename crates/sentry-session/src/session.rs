//! Source session state machine
//!
//! Owns which video source is active and whether a session-changing request
//! is in flight. All remote calls go through the Sentry client; the playback
//! adapter is retargeted on every transition. The lock around the session
//! value is held only across local mutation, never across a remote await.

use std::fmt;
use std::sync::Arc;

use sentry_client::{CameraOrigin, SentryClient, SentryClientError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::playback::PlaybackAdapter;
use crate::upload::{PlaybackLocator, UploadedVideo};

/// Message stored when analysis fails without a structured service answer
pub const GENERIC_ANALYSIS_FAILURE: &str = "An unexpected error occurred.";

/// Message surfaced when report generation fails without a structured answer
pub const GENERIC_REPORT_FAILURE: &str = "Error generating report.";

/// Fallback for a failed webcam start without a service message
const WEBCAM_START_FAILURE: &str = "Failed to start webcam.";
/// Fallback for a failed stream start without a service message
const STREAM_START_FAILURE: &str = "Failed to connect to stream.";

/// Observable session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CameraActive,
    UploadLoaded,
    UploadAnalyzing,
    UploadAnalyzed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::CameraActive => write!(f, "camera active"),
            SessionState::UploadLoaded => write!(f, "upload loaded"),
            SessionState::UploadAnalyzing => write!(f, "upload analyzing"),
            SessionState::UploadAnalyzed => write!(f, "upload analyzed"),
        }
    }
}

/// Which source family owns the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    None,
    Camera,
    Upload,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::None => write!(f, "none"),
            SourceKind::Camera => write!(f, "camera"),
            SourceKind::Upload => write!(f, "upload"),
        }
    }
}

/// Terminal outcome of an upload analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    /// The service answered with a well-formed report
    Completed { status: String, events_found: u64 },
    /// The service reported an error, or the request itself failed
    Failed { message: String },
}

impl AnalysisResult {
    /// Operator-facing text of either outcome
    pub fn message(&self) -> &str {
        match self {
            AnalysisResult::Completed { status, .. } => status,
            AnalysisResult::Failed { message } => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisResult::Failed { .. })
    }
}

/// Outcome of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Camera session opened
    Started,
    /// A start was already connecting; nothing was sent
    AlreadyPending,
    /// The camera was already active; nothing was sent
    AlreadyActive,
}

/// Outcome of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Session closed locally, stop request dispatched
    Stopped,
    /// No camera session to stop; nothing was sent
    NotActive,
}

/// Outcome of selecting a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// File staged and session replaced
    Loaded,
    /// Not a video; selection ignored
    NotVideo,
}

/// Upload analysis phase
#[derive(Debug)]
enum UploadPhase {
    Loaded,
    Analyzing,
    Analyzed(AnalysisResult),
}

/// The active source with its parameters. The enum keeps camera origin and
/// uploaded file mutually exclusive; replacing an upload drops its staging
/// locator.
enum ActiveSource {
    Idle,
    Camera {
        origin: CameraOrigin,
    },
    Upload {
        video: UploadedVideo,
        locator: PlaybackLocator,
        phase: UploadPhase,
    },
}

struct Inner {
    source: ActiveSource,
    connecting: bool,
    is_playing: bool,
    /// Bumped whenever the upload is replaced. In-flight analyses carry the
    /// value they started with; their result is dropped on mismatch.
    analysis_seq: u64,
}

impl Inner {
    fn state(&self) -> SessionState {
        match &self.source {
            ActiveSource::Idle => SessionState::Idle,
            ActiveSource::Camera { .. } => SessionState::CameraActive,
            ActiveSource::Upload { phase, .. } => match phase {
                UploadPhase::Loaded => SessionState::UploadLoaded,
                UploadPhase::Analyzing => SessionState::UploadAnalyzing,
                UploadPhase::Analyzed(_) => SessionState::UploadAnalyzed,
            },
        }
    }

    fn source_kind(&self) -> SourceKind {
        match &self.source {
            ActiveSource::Idle => SourceKind::None,
            ActiveSource::Camera { .. } => SourceKind::Camera,
            ActiveSource::Upload { .. } => SourceKind::Upload,
        }
    }
}

/// Cheap copy of the observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub source: SourceKind,
    /// A start or stop request is between dispatch and answer
    pub connecting: bool,
    /// Mirror of the adapter-reported playing flag; carries no authority
    pub is_playing: bool,
    pub file_name: Option<String>,
    pub analysis: Option<AnalysisResult>,
}

/// Coordinates the video source session against the remote service
pub struct SessionController {
    client: SentryClient,
    playback: Arc<dyn PlaybackAdapter>,
    inner: RwLock<Inner>,
}

impl SessionController {
    pub fn new(client: SentryClient, playback: Arc<dyn PlaybackAdapter>) -> Self {
        Self {
            client,
            playback,
            inner: RwLock::new(Inner {
                source: ActiveSource::Idle,
                connecting: false,
                is_playing: false,
                analysis_seq: 0,
            }),
        }
    }

    /// The client this controller talks through
    pub fn client(&self) -> &SentryClient {
        &self.client
    }

    /// Current observable state
    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state()
    }

    /// Copy of everything a view needs to render the session
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            state: inner.state(),
            source: inner.source_kind(),
            connecting: inner.connecting,
            is_playing: inner.is_playing,
            file_name: match &inner.source {
                ActiveSource::Upload { video, .. } => Some(video.file_name().to_string()),
                _ => None,
            },
            analysis: match &inner.source {
                ActiveSource::Upload {
                    phase: UploadPhase::Analyzed(result),
                    ..
                } => Some(result.clone()),
                _ => None,
            },
        }
    }

    /// Open a live camera session
    ///
    /// No-op while a start is already connecting or the camera is already
    /// active; rejected while an upload session is loaded. A network origin
    /// with an empty address fails before any request is sent. On failure
    /// the session stays where it was and the error carries the service
    /// message, or a per-origin fallback when there is none.
    pub async fn start_camera(&self, origin: CameraOrigin) -> Result<StartOutcome, SessionError> {
        if let CameraOrigin::Stream(address) = &origin {
            if address.trim().is_empty() {
                return Err(SessionError::EmptyStreamAddress);
            }
        }

        {
            let mut inner = self.inner.write().await;
            if inner.connecting {
                debug!("Start ignored, a connection attempt is already running");
                return Ok(StartOutcome::AlreadyPending);
            }
            match inner.source {
                ActiveSource::Camera { .. } => {
                    debug!("Start ignored, camera already active");
                    return Ok(StartOutcome::AlreadyActive);
                }
                ActiveSource::Upload { .. } => {
                    return Err(SessionError::SourceBusy(SourceKind::Upload));
                }
                ActiveSource::Idle => {}
            }
            inner.connecting = true;
        }

        let result = self.client.start_camera(&origin).await;

        let mut inner = self.inner.write().await;
        inner.connecting = false;
        match result {
            Ok(()) => {
                let feed = self.client.video_feed_url()?;
                info!(origin = %origin, "Camera session active");
                // The camera wins even if an upload was selected while the
                // request was in flight; that upload's staging file is
                // released by the replacement.
                inner.source = ActiveSource::Camera { origin };
                inner.is_playing = false;
                drop(inner);

                self.playback.bind_live_feed(feed).await;
                Ok(StartOutcome::Started)
            }
            Err(e) => {
                warn!(error = %e, "Camera start failed");
                Err(SessionError::StartFailed(start_failure_message(&origin, &e)))
            }
        }
    }

    /// Close the live camera session
    ///
    /// The local transition is optimistic: state moves to idle and the
    /// adapter is unbound immediately, then the stop request is dispatched
    /// fire-and-forget. A failed stop is logged, never surfaced. From any
    /// state without a camera session this is a no-op that sends nothing.
    pub async fn stop_camera(&self) -> StopOutcome {
        {
            let mut inner = self.inner.write().await;
            match inner.source {
                ActiveSource::Camera { .. } => {}
                _ => {
                    debug!("Stop ignored, no camera session");
                    return StopOutcome::NotActive;
                }
            }
            inner.connecting = false;
            inner.source = ActiveSource::Idle;
            inner.is_playing = false;
        }
        self.playback.unbind().await;
        info!("Camera session stopped");

        // Best-effort remote stop; the caller does not wait for it
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.stop_camera().await {
                warn!(error = %e, "Failed to stop camera session on the service");
            }
        });

        StopOutcome::Stopped
    }

    /// Stage an uploaded file as the active source
    ///
    /// Valid from any state; a file that is not a video is ignored without
    /// touching the session. Loading replaces the previous source and
    /// discards any prior analysis result. The service is not told about a
    /// replaced camera session; it keeps running remotely until stopped.
    pub async fn select_upload_file(
        &self,
        video: UploadedVideo,
    ) -> Result<SelectOutcome, SessionError> {
        if !video.is_video() {
            debug!(file = %video.file_name(), "Selection ignored, not a video");
            return Ok(SelectOutcome::NotVideo);
        }

        let locator = PlaybackLocator::stage(&video)?;
        let media = locator.url().clone();
        let file_name = video.file_name().to_string();

        {
            let mut inner = self.inner.write().await;
            inner.analysis_seq = inner.analysis_seq.wrapping_add(1);
            inner.source = ActiveSource::Upload {
                video,
                locator,
                phase: UploadPhase::Loaded,
            };
            inner.is_playing = false;
        }
        self.playback.bind_media(media).await;
        info!(file = %file_name, "Upload session loaded");

        Ok(SelectOutcome::Loaded)
    }

    /// Run analysis for the loaded upload
    ///
    /// Requires a loaded or previously analyzed upload with no analysis in
    /// flight. The attempt always ends in the analyzed state with a result:
    /// a structured service error is stored verbatim, anything else folds to
    /// the generic failure message. A completion arriving after the upload
    /// was replaced is dropped instead of resurrecting a cleared result.
    pub async fn analyze_upload(&self) -> Result<AnalysisResult, SessionError> {
        let (file_name, media_type, bytes, seq) = {
            let mut inner = self.inner.write().await;
            let seq = inner.analysis_seq;
            match &mut inner.source {
                ActiveSource::Upload { video, phase, .. } => {
                    if matches!(phase, UploadPhase::Analyzing) {
                        return Err(SessionError::AnalysisInFlight);
                    }
                    // Entering the analyzing phase clears any prior result
                    *phase = UploadPhase::Analyzing;
                    (
                        video.file_name().to_string(),
                        video.media_type().to_string(),
                        video.bytes().clone(),
                        seq,
                    )
                }
                _ => return Err(SessionError::NoUploadLoaded),
            }
        };

        debug!(file = %file_name, "Analysis started");
        let outcome = self.client.analyze_video(&file_name, &media_type, bytes).await;

        let result = match outcome {
            Ok(report) => {
                info!(file = %file_name, events = report.events_found, "Analysis completed");
                AnalysisResult::Completed {
                    status: report.status,
                    events_found: report.events_found,
                }
            }
            Err(e) if !e.is_transport() => {
                warn!(error = %e, "Service rejected the analysis");
                AnalysisResult::Failed {
                    message: e
                        .service_message()
                        .unwrap_or(GENERIC_ANALYSIS_FAILURE)
                        .to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Analysis request failed");
                AnalysisResult::Failed {
                    message: GENERIC_ANALYSIS_FAILURE.to_string(),
                }
            }
        };

        let mut inner = self.inner.write().await;
        if inner.analysis_seq != seq {
            debug!(file = %file_name, "Dropping analysis result for a replaced upload");
            return Ok(result);
        }
        if let ActiveSource::Upload { phase, .. } = &mut inner.source {
            *phase = UploadPhase::Analyzed(result.clone());
        }
        Ok(result)
    }

    /// Generate a report for the running camera session
    ///
    /// Every remote outcome folds into the returned status message, exactly
    /// as the service phrases it when it answers at all; session state never
    /// changes. Only a missing camera session is an error.
    pub async fn generate_camera_report(&self) -> Result<String, SessionError> {
        {
            let inner = self.inner.read().await;
            if !matches!(inner.source, ActiveSource::Camera { .. }) {
                return Err(SessionError::CameraNotActive);
            }
        }

        match self.client.generate_camera_report().await {
            Ok(status) => Ok(status),
            Err(e) if !e.is_transport() => {
                warn!(error = %e, "Service answered the report request with an error");
                Ok(e.service_message()
                    .unwrap_or(GENERIC_REPORT_FAILURE)
                    .to_string())
            }
            Err(e) => {
                warn!(error = %e, "Report request failed");
                Ok(GENERIC_REPORT_FAILURE.to_string())
            }
        }
    }

    /// Toggle playback of the loaded upload
    ///
    /// Delegates to the adapter and mirrors what it reports; the stored
    /// flag carries no authority over actual playback.
    pub async fn toggle_playback(&self) -> Result<bool, SessionError> {
        {
            let inner = self.inner.read().await;
            if !matches!(inner.source, ActiveSource::Upload { .. }) {
                return Err(SessionError::NoUploadLoaded);
            }
        }

        let playing = self.playback.toggle().await;
        let mut inner = self.inner.write().await;
        inner.is_playing = playing;
        Ok(playing)
    }
}

/// Service-provided message when one exists, per-origin fallback otherwise
fn start_failure_message(origin: &CameraOrigin, error: &SentryClientError) -> String {
    match error.service_message() {
        Some(message) => message.to_string(),
        None => match origin {
            CameraOrigin::Device(_) => WEBCAM_START_FAILURE.to_string(),
            CameraOrigin::Stream(_) => STREAM_START_FAILURE.to_string(),
        },
    }
}
