//! Source session coordination for the Sentry control surface
//!
//! The [`SessionController`] owns the single notion of which video source is
//! active (live camera, network stream or uploaded file), sequences the
//! asynchronous start/stop/analyze/report operations against the remote
//! service and retargets a [`PlaybackAdapter`] on every transition. The
//! [`AlertPoller`] refreshes the alert snapshot in the background,
//! independent of session state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sentry_client::{CameraOrigin, SentryClient};
//! use sentry_session::{NullPlayback, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SentryClient::new("http://localhost:5000")?;
//!     let controller = SessionController::new(client, Arc::new(NullPlayback));
//!
//!     controller.start_camera(CameraOrigin::Device(0)).await?;
//!     let status = controller.generate_camera_report().await?;
//!     println!("{}", status);
//!     controller.stop_camera().await;
//!     Ok(())
//! }
//! ```

mod error;
mod playback;
mod poller;
mod session;
mod upload;

pub use error::SessionError;
pub use playback::{NullPlayback, PlaybackAdapter};
pub use poller::{AlertFeed, AlertPoller, AlertPollerHandle, DEFAULT_POLL_PERIOD};
pub use session::{
    AnalysisResult, SelectOutcome, SessionController, SessionSnapshot, SessionState, SourceKind,
    StartOutcome, StopOutcome, GENERIC_ANALYSIS_FAILURE, GENERIC_REPORT_FAILURE,
};
pub use upload::{PlaybackLocator, UploadedVideo};
