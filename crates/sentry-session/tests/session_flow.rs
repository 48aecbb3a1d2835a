//! Integration tests driving the session controller against the mock service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use sentry_client::testing::{wait_for, AnalysisReply, MockSentryService, TestServer};
use sentry_client::CameraOrigin;
use sentry_session::{
    AnalysisResult, PlaybackAdapter, SelectOutcome, SessionController, SessionError, SessionState,
    SourceKind, StartOutcome, StopOutcome, UploadedVideo, GENERIC_ANALYSIS_FAILURE,
    GENERIC_REPORT_FAILURE,
};
use serde_json::json;
use tokio::sync::Mutex;
use url::Url;

/// One adapter call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    LiveFeed(Url),
    Media(Url),
    Unbound,
}

/// Playback adapter that records every binding it receives
#[derive(Default)]
struct RecordingPlayback {
    log: Mutex<Vec<Binding>>,
    playing: Mutex<bool>,
}

impl RecordingPlayback {
    async fn log(&self) -> Vec<Binding> {
        self.log.lock().await.clone()
    }
}

#[async_trait]
impl PlaybackAdapter for RecordingPlayback {
    async fn bind_live_feed(&self, feed: Url) {
        self.log.lock().await.push(Binding::LiveFeed(feed));
    }

    async fn bind_media(&self, media: Url) {
        self.log.lock().await.push(Binding::Media(media));
    }

    async fn unbind(&self) {
        self.log.lock().await.push(Binding::Unbound);
    }

    async fn toggle(&self) -> bool {
        let mut playing = self.playing.lock().await;
        *playing = !*playing;
        *playing
    }
}

async fn harness() -> (
    MockSentryService,
    TestServer,
    Arc<RecordingPlayback>,
    SessionController,
) {
    let service = MockSentryService::new();
    let server = TestServer::start(&service)
        .await
        .expect("failed to start test server");
    let playback = Arc::new(RecordingPlayback::default());
    let controller = SessionController::new(server.client.clone(), playback.clone());
    (service, server, playback, controller)
}

fn video(name: &str) -> UploadedVideo {
    UploadedVideo::new(name, Bytes::from_static(b"frames"))
}

// =============================================================================
// Camera start
// =============================================================================

#[tokio::test]
async fn start_camera_binds_live_feed() {
    let (service, server, playback, controller) = harness().await;

    let outcome = controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    assert_eq!(outcome, StartOutcome::Started);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::CameraActive);
    assert_eq!(snapshot.source, SourceKind::Camera);
    assert!(!snapshot.connecting);

    assert_eq!(service.last_start_source().await, Some(json!(0)));

    let expected = format!("{}/api/video_feed", server.base_url());
    let log = playback.log().await;
    assert!(matches!(log.last(), Some(Binding::LiveFeed(url)) if url.as_str() == expected));
}

#[tokio::test]
async fn empty_stream_address_fails_fast() {
    let (service, _server, _playback, controller) = harness().await;

    let err = controller
        .start_camera(CameraOrigin::Stream("   ".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::EmptyStreamAddress));
    assert_eq!(err.to_string(), "Please enter a stream address first.");
    assert_eq!(service.start_hits().await, 0);
    assert_eq!(controller.state().await, SessionState::Idle);
}

#[tokio::test]
async fn start_failure_surfaces_service_message_and_returns_to_idle() {
    let (service, _server, _playback, controller) = harness().await;
    service.fail_start_with(500, "Could not open video source.").await;

    let err = controller
        .start_camera(CameraOrigin::Stream("rtsp://cam.local/stream".into()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Could not open video source.");

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(!snapshot.connecting);

    // The guard is released, so a retry sends another request
    let _ = controller
        .start_camera(CameraOrigin::Stream("rtsp://cam.local/stream".into()))
        .await;
    assert_eq!(service.start_hits().await, 2);
}

#[tokio::test]
async fn start_failure_without_service_message_uses_origin_fallback() {
    let (_service, server, _playback, controller) = harness().await;
    server.shutdown().await;

    let err = controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to start webcam.");

    let err = controller
        .start_camera(CameraOrigin::Stream("rtsp://cam.local/stream".into()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to connect to stream.");

    assert_eq!(controller.state().await, SessionState::Idle);
}

#[tokio::test]
async fn concurrent_start_sends_one_request() {
    let (service, _server, _playback, controller) = harness().await;
    service.delay_start(Duration::from_millis(150)).await;

    let first = controller.start_camera(CameraOrigin::Device(0));
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.start_camera(CameraOrigin::Device(0)).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), StartOutcome::Started);
    assert_eq!(second.unwrap(), StartOutcome::AlreadyPending);
    assert_eq!(service.start_hits().await, 1);
}

#[tokio::test]
async fn start_when_camera_active_is_a_no_op() {
    let (service, _server, _playback, controller) = harness().await;

    let first = controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    let second = controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();

    assert_eq!(first, StartOutcome::Started);
    assert_eq!(second, StartOutcome::AlreadyActive);
    assert_eq!(service.start_hits().await, 1);
    assert_eq!(controller.state().await, SessionState::CameraActive);
}

#[tokio::test]
async fn start_rejected_while_upload_loaded() {
    let (service, _server, _playback, controller) = harness().await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    let err = controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::SourceBusy(SourceKind::Upload)));
    assert_eq!(err.to_string(), "Stop the active upload session first.");
    assert_eq!(service.start_hits().await, 0);
    assert_eq!(controller.state().await, SessionState::UploadLoaded);
}

#[tokio::test]
async fn start_success_overrides_mid_flight_selection() {
    let (service, _server, playback, controller) = harness().await;
    service.delay_start(Duration::from_millis(200)).await;

    let start = controller.start_camera(CameraOrigin::Device(0));
    let select = async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        controller.select_upload_file(video("clip.mp4")).await
    };
    let (started, selected) = tokio::join!(start, select);

    assert_eq!(started.unwrap(), StartOutcome::Started);
    assert_eq!(selected.unwrap(), SelectOutcome::Loaded);
    assert_eq!(controller.state().await, SessionState::CameraActive);

    // The replaced upload's staging file is gone and the adapter ends up
    // on the live feed
    let log = playback.log().await;
    let staged = log
        .iter()
        .rev()
        .find_map(|binding| match binding {
            Binding::Media(url) => Some(url.to_file_path().unwrap()),
            _ => None,
        })
        .expect("media binding recorded");
    assert!(!staged.exists());
    assert!(matches!(log.last(), Some(Binding::LiveFeed(_))));
}

// =============================================================================
// Camera stop
// =============================================================================

#[tokio::test]
async fn stop_from_idle_issues_no_request() {
    let (service, _server, _playback, controller) = harness().await;

    assert_eq!(controller.stop_camera().await, StopOutcome::NotActive);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.stop_hits().await, 0);
}

#[tokio::test]
async fn stop_transitions_immediately_and_sends_in_background() {
    let (service, _server, playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();

    assert_eq!(controller.stop_camera().await, StopOutcome::Stopped);
    assert_eq!(controller.state().await, SessionState::Idle);

    let service_clone = service.clone();
    assert!(
        wait_for(
            || async { service_clone.stop_hits().await == 1 },
            Duration::from_secs(2),
        )
        .await
    );
    assert!(!service.camera_running().await);
    assert!(matches!(playback.log().await.last(), Some(Binding::Unbound)));
}

#[tokio::test]
async fn stop_failure_is_swallowed() {
    let (_service, server, _playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    server.shutdown().await;

    assert_eq!(controller.stop_camera().await, StopOutcome::Stopped);
    assert_eq!(controller.state().await, SessionState::Idle);

    // The failed remote stop must not resurrect the session
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state().await, SessionState::Idle);
}

// =============================================================================
// Upload selection
// =============================================================================

#[tokio::test]
async fn select_video_loads_upload_session() {
    let (_service, _server, playback, controller) = harness().await;

    let outcome = controller
        .select_upload_file(video("clip.mp4"))
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Loaded);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::UploadLoaded);
    assert_eq!(snapshot.source, SourceKind::Upload);
    assert_eq!(snapshot.file_name.as_deref(), Some("clip.mp4"));
    assert!(snapshot.analysis.is_none());

    // The adapter is pointed at the staged copy
    let log = playback.log().await;
    assert!(matches!(log.last(), Some(Binding::Media(url)) if url.scheme() == "file"));
}

#[tokio::test]
async fn non_video_selection_is_ignored() {
    let (_service, _server, playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();

    let outcome = controller
        .select_upload_file(video("notes.txt"))
        .await
        .unwrap();

    assert_eq!(outcome, SelectOutcome::NotVideo);
    assert_eq!(controller.state().await, SessionState::CameraActive);
    assert!(matches!(
        playback.log().await.last(),
        Some(Binding::LiveFeed(_))
    ));
}

#[tokio::test]
async fn select_over_camera_replaces_without_stopping_remotely() {
    let (service, _server, _playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();

    controller
        .select_upload_file(video("clip.mp4"))
        .await
        .unwrap();

    assert_eq!(controller.state().await, SessionState::UploadLoaded);

    // No stop request goes out; the remote session is left running
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.stop_hits().await, 0);
    assert!(service.camera_running().await);
}

#[tokio::test]
async fn superseding_an_upload_releases_its_staging_file() {
    let (_service, _server, playback, controller) = harness().await;

    controller
        .select_upload_file(video("first.mp4"))
        .await
        .unwrap();
    let staged = match playback.log().await.last() {
        Some(Binding::Media(url)) => url.to_file_path().unwrap(),
        other => panic!("expected a media binding, got {:?}", other),
    };
    assert!(staged.exists());

    controller
        .select_upload_file(video("second.mp4"))
        .await
        .unwrap();
    assert!(!staged.exists());
}

// =============================================================================
// Upload analysis
// =============================================================================

#[tokio::test]
async fn analyze_stores_completed_result() {
    let (service, _server, _playback, controller) = harness().await;
    service
        .set_analysis_reply(AnalysisReply::Completed {
            status: "Analysis complete. 3 events detected.".into(),
            events_found: 3,
        })
        .await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    let result = controller.analyze_upload().await.unwrap();

    assert_eq!(
        result,
        AnalysisResult::Completed {
            status: "Analysis complete. 3 events detected.".into(),
            events_found: 3,
        }
    );
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::UploadAnalyzed);
    assert_eq!(snapshot.analysis, Some(result));
    assert_eq!(service.last_upload().await, Some(("clip.mp4".into(), 6)));
}

#[tokio::test]
async fn analyze_keeps_structured_error_verbatim() {
    let (service, _server, _playback, controller) = harness().await;
    service
        .set_analysis_reply(AnalysisReply::Error {
            code: 422,
            message: "Could not decode the video stream.".into(),
        })
        .await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    let result = controller.analyze_upload().await.unwrap();

    assert_eq!(
        result,
        AnalysisResult::Failed {
            message: "Could not decode the video stream.".into(),
        }
    );
    assert_eq!(controller.state().await, SessionState::UploadAnalyzed);
}

#[tokio::test]
async fn analyze_transport_failure_uses_generic_message() {
    let (_service, server, _playback, controller) = harness().await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();
    server.shutdown().await;

    let result = controller.analyze_upload().await.unwrap();

    assert_eq!(
        result,
        AnalysisResult::Failed {
            message: GENERIC_ANALYSIS_FAILURE.into(),
        }
    );
    assert_eq!(controller.state().await, SessionState::UploadAnalyzed);
}

#[tokio::test]
async fn analyze_malformed_body_counts_as_transport_failure() {
    let (service, _server, _playback, controller) = harness().await;
    service.set_analysis_reply(AnalysisReply::Malformed).await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    let result = controller.analyze_upload().await.unwrap();

    assert_eq!(
        result,
        AnalysisResult::Failed {
            message: GENERIC_ANALYSIS_FAILURE.into(),
        }
    );
    assert_eq!(controller.state().await, SessionState::UploadAnalyzed);
}

#[tokio::test]
async fn analyze_without_upload_is_rejected() {
    let (service, _server, _playback, controller) = harness().await;

    let err = controller.analyze_upload().await.unwrap_err();
    assert!(matches!(err, SessionError::NoUploadLoaded));

    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    let err = controller.analyze_upload().await.unwrap_err();
    assert!(matches!(err, SessionError::NoUploadLoaded));

    assert_eq!(service.analyze_hits().await, 0);
}

#[tokio::test]
async fn analyze_while_analyzing_is_rejected() {
    let (service, _server, _playback, controller) = harness().await;
    service.delay_analysis(Duration::from_millis(200)).await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    let first = controller.analyze_upload();
    let second = async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        controller.analyze_upload().await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(
        second.unwrap_err(),
        SessionError::AnalysisInFlight
    ));
    assert_eq!(service.analyze_hits().await, 1);
}

#[tokio::test]
async fn analysis_in_flight_clears_previous_result() {
    let (service, _server, _playback, controller) = harness().await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();
    controller.analyze_upload().await.unwrap();
    assert!(controller.snapshot().await.analysis.is_some());

    service.delay_analysis(Duration::from_millis(200)).await;
    let rerun = controller.analyze_upload();
    let probe = async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        controller.snapshot().await
    };
    let (rerun, mid_flight) = tokio::join!(rerun, probe);

    rerun.unwrap();
    assert_eq!(mid_flight.state, SessionState::UploadAnalyzing);
    assert!(mid_flight.analysis.is_none());
}

#[tokio::test]
async fn reanalysis_runs_again_from_analyzed() {
    let (service, _server, _playback, controller) = harness().await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    controller.analyze_upload().await.unwrap();
    controller.analyze_upload().await.unwrap();

    assert_eq!(service.analyze_hits().await, 2);
    assert_eq!(controller.state().await, SessionState::UploadAnalyzed);
}

#[tokio::test]
async fn stale_analysis_result_is_discarded_after_new_selection() {
    let (service, _server, _playback, controller) = harness().await;
    service
        .set_analysis_reply(AnalysisReply::Completed {
            status: "Analysis complete. 9 events detected.".into(),
            events_found: 9,
        })
        .await;
    service.delay_analysis(Duration::from_millis(200)).await;
    controller.select_upload_file(video("first.mp4")).await.unwrap();

    let analysis = controller.analyze_upload();
    let replace = async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        controller.select_upload_file(video("second.mp4")).await
    };
    let (result, replaced) = tokio::join!(analysis, replace);

    // The caller still gets its own outcome
    assert_eq!(
        result.unwrap().message(),
        "Analysis complete. 9 events detected."
    );
    assert_eq!(replaced.unwrap(), SelectOutcome::Loaded);

    // The fresh upload is untouched by the stale completion
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::UploadLoaded);
    assert_eq!(snapshot.file_name.as_deref(), Some("second.mp4"));
    assert!(snapshot.analysis.is_none());
}

// =============================================================================
// Playback toggle
// =============================================================================

#[tokio::test]
async fn toggle_mirrors_adapter_state() {
    let (_service, _server, _playback, controller) = harness().await;
    controller.select_upload_file(video("clip.mp4")).await.unwrap();

    assert!(controller.toggle_playback().await.unwrap());
    assert!(controller.snapshot().await.is_playing);

    assert!(!controller.toggle_playback().await.unwrap());
    assert!(!controller.snapshot().await.is_playing);
}

#[tokio::test]
async fn toggle_requires_upload_session() {
    let (_service, _server, _playback, controller) = harness().await;

    let err = controller.toggle_playback().await.unwrap_err();
    assert!(matches!(err, SessionError::NoUploadLoaded));

    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    let err = controller.toggle_playback().await.unwrap_err();
    assert!(matches!(err, SessionError::NoUploadLoaded));
}

// =============================================================================
// Camera report
// =============================================================================

#[tokio::test]
async fn camera_report_returns_status_message() {
    let (_service, _server, _playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();

    let message = controller.generate_camera_report().await.unwrap();

    assert_eq!(message, "Report generated.");
    assert_eq!(controller.state().await, SessionState::CameraActive);
}

#[tokio::test]
async fn camera_report_requires_active_camera() {
    let (service, _server, _playback, controller) = harness().await;

    let err = controller.generate_camera_report().await.unwrap_err();
    assert!(matches!(err, SessionError::CameraNotActive));
    assert_eq!(err.to_string(), "Camera is not active.");

    controller.select_upload_file(video("clip.mp4")).await.unwrap();
    let err = controller.generate_camera_report().await.unwrap_err();
    assert!(matches!(err, SessionError::CameraNotActive));

    assert_eq!(service.report_hits().await, 0);
}

#[tokio::test]
async fn camera_report_folds_service_error_into_message() {
    let (service, _server, _playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    service.set_report_reply(404, "No events to report.").await;

    let message = controller.generate_camera_report().await.unwrap();

    assert_eq!(message, "No events to report.");
    assert_eq!(controller.state().await, SessionState::CameraActive);
}

#[tokio::test]
async fn camera_report_transport_failure_uses_generic_message() {
    let (_service, server, _playback, controller) = harness().await;
    controller
        .start_camera(CameraOrigin::Device(0))
        .await
        .unwrap();
    server.shutdown().await;

    let message = controller.generate_camera_report().await.unwrap();

    assert_eq!(message, GENERIC_REPORT_FAILURE);
    assert_eq!(controller.state().await, SessionState::CameraActive);
}
