//! Sentry Service Client Library
//!
//! Provides a typed HTTP client for the remote Sentry video-analysis service.
//!
//! # Example
//!
//! ```rust,no_run
//! use sentry_client::{CameraOrigin, SentryClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SentryClient::new("http://localhost:5000")?;
//!
//!     // Open a live session on the default webcam
//!     client.start_camera(&CameraOrigin::Device(0)).await?;
//!
//!     // Current alert snapshot, most recent first
//!     let alerts = client.list_alerts().await?;
//!     println!("{} alerts", alerts.len());
//!
//!     client.stop_camera().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-process mock of the service:
//!
//! ```rust,ignore
//! use sentry_client::testing::{MockSentryService, TestServer};
//!
//! let service = MockSentryService::new();
//! let server = TestServer::start(&service).await?;
//!
//! server.client.start_camera(&CameraOrigin::Device(0)).await?;
//! assert_eq!(service.start_hits().await, 1);
//! ```

mod client;
mod error;
pub mod testing;
mod types;

pub use client::SentryClient;
pub use error::{Result, SentryClientError};
pub use types::*;
