//! Error types for session operations

use thiserror::Error;

use crate::session::SourceKind;

/// Errors surfaced by session operations
///
/// Remote analysis and report failures fold into their operation's result
/// instead; these variants cover client-side validation, violated
/// preconditions and failed camera starts. Every message is ready to show
/// to the operator.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Network origin with nothing to connect to
    #[error("Please enter a stream address first.")]
    EmptyStreamAddress,

    /// A different source family owns the session
    #[error("Stop the active {0} session first.")]
    SourceBusy(SourceKind),

    /// Operation needs a loaded upload
    #[error("No uploaded video to work with.")]
    NoUploadLoaded,

    /// An analysis request is already running
    #[error("Analysis is already in progress.")]
    AnalysisInFlight,

    /// Operation needs a running camera session
    #[error("Camera is not active.")]
    CameraNotActive,

    /// Camera start failed; carries the service message or a fallback
    #[error("{0}")]
    StartFailed(String),

    /// Staging the upload for playback failed
    #[error("Could not stage upload for playback: {0}")]
    Staging(#[from] std::io::Error),

    /// Request could not be formed
    #[error(transparent)]
    Client(#[from] sentry_client::SentryClientError),
}
