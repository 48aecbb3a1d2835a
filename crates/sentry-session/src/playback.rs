//! Playback adapter seam
//!
//! The session controller drives whatever renders the active source through
//! this trait: a continuous live feed for camera sessions, a seekable media
//! file for uploads.

use async_trait::async_trait;
use url::Url;

/// Renders the active video source
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Bind to the continuous live feed of a camera session.
    /// Replaces any existing binding.
    async fn bind_live_feed(&self, feed: Url);

    /// Bind to a seekable local media file. Replaces any existing binding.
    async fn bind_media(&self, media: Url);

    /// Drop the current binding, if any.
    async fn unbind(&self);

    /// Toggle play/pause and report whether playback is now running.
    /// Meaningful for media bindings; live feeds simply keep running.
    async fn toggle(&self) -> bool;
}

/// Adapter that renders nothing, for headless use
#[derive(Debug, Default)]
pub struct NullPlayback;

#[async_trait]
impl PlaybackAdapter for NullPlayback {
    async fn bind_live_feed(&self, _feed: Url) {}

    async fn bind_media(&self, _media: Url) {}

    async fn unbind(&self) {}

    async fn toggle(&self) -> bool {
        false
    }
}
