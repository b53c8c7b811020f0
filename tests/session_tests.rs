// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle tests against the virtual camera

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use camera_preview::backends::camera::types::{
    AeMode, AfMode, CaptureRequest, ControlMode, HardwareLevel, PreviewSurface, RequestTemplate,
    Resolution, SessionId, TargetKind,
};
use camera_preview::backends::virtual_camera::{
    CaptureBehavior, CloseEvent, ConfigureBehavior, OpenBehavior, VirtualCameraConfig,
    VirtualCameraService,
};
use camera_preview::session::{Notice, notice_channel};
use camera_preview::{
    CaptureError, Config, ImageWriter, SessionError, SessionManager, SessionSnapshot, SessionState,
};
use tokio::sync::{mpsc, watch};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    service: VirtualCameraService,
    manager: SessionManager,
    notices: mpsc::UnboundedReceiver<Notice>,
    snapshots: watch::Receiver<SessionSnapshot>,
    photos: tempfile::TempDir,
}

impl Harness {
    fn new(config: VirtualCameraConfig) -> Self {
        let service = VirtualCameraService::new(config);
        let photos = tempfile::tempdir().unwrap();
        let (notice_tx, notices) = notice_channel();
        let manager = SessionManager::new(
            Arc::new(service.clone()),
            Config::default(),
            ImageWriter::new(photos.path()),
            notice_tx,
        );
        let snapshots = manager.subscribe();
        Self {
            service,
            manager,
            notices,
            snapshots,
            photos,
        }
    }

    fn open(&mut self) -> Result<(), SessionError> {
        self.manager
            .open(PreviewSurface::new(7), 1920, 1080, true)
            .map(|_| ())
    }

    async fn wait_for_state(&mut self, state: SessionState) -> SessionSnapshot {
        tokio::time::timeout(WAIT, self.snapshots.wait_for(|s| s.state == state))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
            .unwrap()
            .clone()
    }

    async fn next_notice(&mut self) -> Notice {
        tokio::time::timeout(WAIT, self.notices.recv())
            .await
            .expect("timed out waiting for a notice")
            .expect("notice channel closed")
    }

    async fn wait_until(&self, mut condition: impl FnMut(&VirtualCameraService) -> bool) {
        tokio::time::timeout(WAIT, async {
            while !condition(&self.service) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for the camera");
    }

    fn photo_count(&self) -> usize {
        std::fs::read_dir(self.photos.path()).map_or(0, |dir| dir.count())
    }
}

fn is_photo_name(name: &str) -> bool {
    let Some(stamp) = name
        .strip_prefix("IMG_")
        .and_then(|rest| rest.strip_suffix(".jpg"))
    else {
        return false;
    };
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

#[tokio::test]
async fn test_open_reaches_active_with_preview_request() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    let configuration = h.manager.open(PreviewSurface::new(7), 1920, 1080, true).unwrap();
    assert_eq!(configuration.preview_size, Resolution::new(1280, 720));
    assert_eq!(configuration.still_size, Resolution::new(640, 480));

    let snapshot = h.wait_for_state(SessionState::Active).await;
    assert!(snapshot.capture_ready());
    assert_eq!(snapshot.preview_size(), Some(Resolution::new(1280, 720)));

    assert_eq!(
        h.service.configured_outputs(),
        vec![
            (TargetKind::PreviewSurface, Resolution::new(1280, 720)),
            (TargetKind::StillImage, Resolution::new(640, 480)),
        ]
    );

    let requests = h.service.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].repeating);
    let request = &requests[0].request;
    assert_eq!(request, &CaptureRequest::preview());
    assert_eq!(request.template, RequestTemplate::Preview);
    assert_eq!(request.af_mode, Some(AfMode::ContinuousPicture));
    assert_eq!(request.ae_mode, Some(AeMode::On));
    assert_eq!(request.control_mode, Some(ControlMode::Auto));
}

#[tokio::test]
async fn test_capture_rejected_when_closed() {
    let h = Harness::new(VirtualCameraConfig::default());
    assert_eq!(h.manager.state(), SessionState::Closed);
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(h.service.still_requests(), 0);
}

#[tokio::test]
async fn test_capture_rejected_while_opening() {
    let mut h = Harness::new(VirtualCameraConfig {
        open: OpenBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    assert_eq!(h.manager.state(), SessionState::Opening);
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));

    h.wait_until(|s| s.open_attempts() == 1).await;
    assert!(h.service.release_open());
    h.wait_for_state(SessionState::Active).await;
    assert_eq!(h.service.still_requests(), 0);
}

#[tokio::test]
async fn test_capture_rejected_while_configuring() {
    let mut h = Harness::new(VirtualCameraConfig {
        configure: ConfigureBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Configuring).await;
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(h.service.still_requests(), 0);

    assert!(h.service.release_configure());
    h.wait_for_state(SessionState::Active).await;
}

#[tokio::test]
async fn test_capture_rejected_after_failure() {
    let mut h = Harness::new(VirtualCameraConfig {
        open: OpenBehavior::Error(3),
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Failed(SessionError::DeviceOpenError(3)))
        .await;
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));
    assert_eq!(h.service.still_requests(), 0);
    assert_eq!(
        h.next_notice().await,
        Notice::SessionFailed(SessionError::DeviceOpenError(3))
    );
}

#[tokio::test]
async fn test_capture_saves_timestamped_jpeg() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.manager.capture().unwrap();
    let notice = h.next_notice().await;
    let Notice::PhotoSaved(path) = &notice else {
        panic!("expected a saved photo, got {notice:?}");
    };

    assert!(path.is_absolute());
    assert_eq!(path.parent(), Some(h.photos.path()));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(is_photo_name(name), "unexpected file name {name}");
    assert!(notice.message().contains(&path.display().to_string()));

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let still = image::load_from_memory(&bytes).unwrap();
    assert_eq!((still.width(), still.height()), (640, 480));

    let stills: Vec<_> = h
        .service
        .requests()
        .into_iter()
        .filter(|r| !r.repeating)
        .collect();
    assert_eq!(stills.len(), 1);
    assert_eq!(stills[0].request, CaptureRequest::still_capture());

    // Preview keeps running and the next capture is accepted
    assert!(h.manager.snapshot().state.is_active());
    tokio::time::timeout(WAIT, h.snapshots.wait_for(|s| s.capture_ready()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.manager.capture(), Ok(()));
}

#[tokio::test]
async fn test_second_capture_is_in_progress() {
    let mut h = Harness::new(VirtualCameraConfig {
        capture: CaptureBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    assert_eq!(h.manager.capture(), Ok(()));
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureInProgress));

    h.wait_until(|s| s.still_requests() == 1).await;
    assert_eq!(h.service.deliver_held_captures(), 1);
    assert!(matches!(h.next_notice().await, Notice::PhotoSaved(_)));

    assert_eq!(h.manager.capture(), Ok(()));
    h.wait_until(|s| s.still_requests() == 2).await;
}

#[tokio::test]
async fn test_device_capture_failure_is_reported() {
    let mut h = Harness::new(VirtualCameraConfig {
        capture: CaptureBehavior::Fail("sensor timeout".into()),
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.manager.capture().unwrap();
    let notice = h.next_notice().await;
    assert_eq!(notice, Notice::CaptureFailed("Capture failed".into()));
    assert!(notice.is_transient());
    assert_eq!(h.photo_count(), 0);

    // Session survives a failed still
    assert!(h.manager.snapshot().state.is_active());
    assert_eq!(h.manager.capture(), Ok(()));
}

#[tokio::test]
async fn test_save_failure_is_reported() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    // A file where the photo directory should be
    let blocked = h.photos.path().join("blocked");
    std::fs::write(&blocked, b"x").unwrap();
    let (notice_tx, notices) = notice_channel();
    h.manager = SessionManager::new(
        Arc::new(h.service.clone()),
        Config::default(),
        ImageWriter::new(&blocked),
        notice_tx,
    );
    h.notices = notices;
    h.snapshots = h.manager.subscribe();

    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;
    h.manager.capture().unwrap();

    match h.next_notice().await {
        Notice::CaptureFailed(message) => {
            assert!(message.starts_with("Failed to save photo"), "{message}")
        }
        other => panic!("expected a save failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dispose_discards_outstanding_capture() {
    let mut h = Harness::new(VirtualCameraConfig {
        capture: CaptureBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;
    h.manager.capture().unwrap();
    h.wait_until(|s| s.still_requests() == 1).await;

    h.manager.close().await;
    assert_eq!(h.manager.state(), SessionState::Closed);
    h.wait_until(|s| s.closes().len() == 3).await;
    assert_eq!(
        h.service.closes(),
        vec![
            CloseEvent::Session(SessionId(1)),
            CloseEvent::Device(SessionId(1)),
            CloseEvent::Sink(SessionId(1)),
        ]
    );

    assert_eq!(h.service.deliver_held_captures(), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.photo_count(), 0);
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_dispose_right_after_capture_writes_nothing() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.manager.capture().unwrap();
    h.manager.close().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.photo_count(), 0);
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_close_releases_session_then_device_then_sink() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.manager.close().await;
    h.wait_until(|s| s.closes().len() == 3).await;
    assert_eq!(
        h.service.closes(),
        vec![
            CloseEvent::Session(SessionId(1)),
            CloseEvent::Device(SessionId(1)),
            CloseEvent::Sink(SessionId(1)),
        ]
    );
}

#[tokio::test]
async fn test_device_opened_after_close_is_released() {
    let mut h = Harness::new(VirtualCameraConfig {
        open: OpenBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_until(|s| s.open_attempts() == 1).await;

    h.manager.close().await;
    assert!(!h.service.release_open());
    assert!(h.service.closes().contains(&CloseEvent::Device(SessionId(1))));
    assert_eq!(h.manager.state(), SessionState::Closed);
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_session_configured_after_close_is_released() {
    let mut h = Harness::new(VirtualCameraConfig {
        configure: ConfigureBehavior::Hold,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Configuring).await;

    h.manager.close().await;
    assert!(!h.service.release_configure());
    let closes = h.service.closes();
    assert!(closes.contains(&CloseEvent::Device(SessionId(1))));
    assert!(closes.contains(&CloseEvent::Session(SessionId(1))));
    assert_eq!(h.service.requests().len(), 0);
}

#[tokio::test]
async fn test_dispose_is_synchronous_for_observers() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.manager.dispose();
    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.state, SessionState::Closed);
    assert_eq!(snapshot.session, None);
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));

    h.wait_until(|s| s.closes().len() == 3).await;
}

#[tokio::test]
async fn test_reopen_disposes_previous_session() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    h.open().unwrap();
    let snapshot = h.wait_for_state(SessionState::Active).await;
    assert_eq!(snapshot.session, Some(SessionId(2)));

    h.wait_until(|s| s.closes().len() == 3).await;
    assert_eq!(
        h.service.closes(),
        vec![
            CloseEvent::Session(SessionId(1)),
            CloseEvent::Device(SessionId(1)),
            CloseEvent::Sink(SessionId(1)),
        ]
    );
    assert_eq!(h.service.open_attempts(), 2);
}

#[tokio::test]
async fn test_legacy_device_never_opens() {
    let mut h = Harness::new(VirtualCameraConfig {
        hardware_level: HardwareLevel::Legacy,
        ..Default::default()
    });
    assert_eq!(h.open(), Err(SessionError::UnsupportedDevice));
    assert_eq!(
        h.manager.state(),
        SessionState::Failed(SessionError::UnsupportedDevice)
    );
    assert_eq!(h.service.open_attempts(), 0);

    let notice = h.next_notice().await;
    assert_eq!(notice, Notice::DeviceUnsupported);
    assert_eq!(notice.message(), "Camera2 API is not supported on this device");
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_no_camera_is_unsupported() {
    let mut h = Harness::new(VirtualCameraConfig {
        camera_ids: Vec::new(),
        ..Default::default()
    });
    assert_eq!(h.open(), Err(SessionError::UnsupportedDevice));
    assert_eq!(h.next_notice().await, Notice::DeviceUnsupported);
}

#[tokio::test]
async fn test_permission_denied_fails_without_opening() {
    let h = Harness::new(VirtualCameraConfig::default());
    let mut manager = h.manager;
    let result = manager.open(PreviewSurface::new(1), 1920, 1080, false);
    assert_eq!(result, Err(SessionError::PermissionDenied));
    assert_eq!(
        manager.state(),
        SessionState::Failed(SessionError::PermissionDenied)
    );
    assert_eq!(h.service.open_attempts(), 0);
}

#[tokio::test]
async fn test_empty_size_lists_fail() {
    let mut h = Harness::new(VirtualCameraConfig {
        still_sizes: Vec::new(),
        ..Default::default()
    });
    assert_eq!(
        h.open(),
        Err(SessionError::NoSupportedSizes(TargetKind::StillImage))
    );
    assert_eq!(h.service.open_attempts(), 0);
}

#[tokio::test]
async fn test_configure_failure() {
    let mut h = Harness::new(VirtualCameraConfig {
        configure: ConfigureBehavior::Fail,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Failed(SessionError::SessionConfigurationFailed))
        .await;
    assert_eq!(
        h.next_notice().await,
        Notice::SessionFailed(SessionError::SessionConfigurationFailed)
    );
    assert!(h.service.closes().contains(&CloseEvent::Device(SessionId(1))));
}

#[tokio::test]
async fn test_disconnect_while_active() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    assert!(h.service.disconnect());
    h.wait_for_state(SessionState::Failed(SessionError::DeviceDisconnected))
        .await;
    h.wait_until(|s| s.closes().len() == 3).await;
    assert_eq!(
        h.service.closes(),
        vec![
            CloseEvent::Session(SessionId(1)),
            CloseEvent::Device(SessionId(1)),
            CloseEvent::Sink(SessionId(1)),
        ]
    );
    assert_eq!(h.manager.capture(), Err(CaptureError::CaptureNotReady));
}

#[tokio::test]
async fn test_device_error_while_active() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;

    assert!(h.service.raise_device_error(4));
    h.wait_for_state(SessionState::Failed(SessionError::DeviceOpenError(4)))
        .await;
    assert_eq!(h.next_notice().await.message(), "Camera error: 4");
}

#[tokio::test]
async fn test_disconnect_during_open() {
    let mut h = Harness::new(VirtualCameraConfig {
        open: OpenBehavior::Disconnect,
        ..Default::default()
    });
    h.open().unwrap();
    h.wait_for_state(SessionState::Failed(SessionError::DeviceDisconnected))
        .await;
    // No device was handed over, so there is nothing to close
    assert!(h.service.closes().is_empty());
    assert_eq!(h.next_notice().await.message(), "Camera disconnected");
}

#[tokio::test]
async fn test_writer_output_is_only_file() {
    let mut h = Harness::new(VirtualCameraConfig::default());
    h.open().unwrap();
    h.wait_for_state(SessionState::Active).await;
    h.manager.capture().unwrap();
    let Notice::PhotoSaved(path) = h.next_notice().await else {
        panic!("expected a saved photo");
    };
    assert_eq!(h.photo_count(), 1);
    assert!(Path::new(&path).exists());
}
