// SPDX-License-Identifier: GPL-3.0-only

//! Device callbacks as messages
//!
//! The camera service never calls back into the session directly. It posts
//! [`DeviceEvent`]s through an [`EventSink`], and the session worker drains
//! them one at a time on its own task. Each session has its own channel.
//! Once the session is gone its sink refuses every event, and any device or
//! capture session a refused event carries is closed on the spot.

use tokio::sync::mpsc;
use tracing::debug;

use super::types::SessionId;
use super::{CameraDevice, CaptureSession};

/// A callback from the camera service
pub enum DeviceEvent {
    /// The device finished opening
    Opened(Box<dyn CameraDevice>),
    /// The device was disconnected
    Disconnected,
    /// The device reported an error (platform error code)
    Error(i32),
    /// The capture session is configured and accepts requests
    Configured(Box<dyn CaptureSession>),
    /// The capture session could not be configured
    ConfigureFailed,
    /// A one-shot capture request finished on the device side
    CaptureCompleted,
    /// A one-shot capture request failed
    CaptureFailed(String),
}

impl DeviceEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Opened(_) => "opened",
            DeviceEvent::Disconnected => "disconnected",
            DeviceEvent::Error(_) => "error",
            DeviceEvent::Configured(_) => "configured",
            DeviceEvent::ConfigureFailed => "configure_failed",
            DeviceEvent::CaptureCompleted => "capture_completed",
            DeviceEvent::CaptureFailed(_) => "capture_failed",
        }
    }

    /// Close the device or capture session carried by an event nobody will
    /// handle
    pub fn release(self) {
        match self {
            DeviceEvent::Opened(mut device) => {
                debug!(device = device.id(), "Closing device opened for a closed session");
                device.close();
            }
            DeviceEvent::Configured(mut session) => {
                debug!("Closing capture session configured for a closed session");
                session.close();
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Error(code) => write!(f, "DeviceEvent::Error({})", code),
            DeviceEvent::CaptureFailed(reason) => {
                write!(f, "DeviceEvent::CaptureFailed({:?})", reason)
            }
            other => write!(f, "DeviceEvent::{}", other.name()),
        }
    }
}

/// Create the callback channel for one session
pub fn event_channel(session: SessionId) -> (EventSink, mpsc::UnboundedReceiver<DeviceEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { session, tx }, rx)
}

/// Callback handle given to the camera service
#[derive(Clone, Debug)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl EventSink {
    /// Session this sink reports for
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Post an event; returns false if the session is already gone
    ///
    /// A refused event is released, so a late device or capture session is
    /// closed rather than leaked.
    pub fn post(&self, event: DeviceEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(
                    session = %self.session,
                    event = event.name(),
                    "Dropping callback for closed session"
                );
                event.release();
                false
            }
        }
    }

    pub fn opened(&self, device: Box<dyn CameraDevice>) -> bool {
        self.post(DeviceEvent::Opened(device))
    }

    pub fn disconnected(&self) -> bool {
        self.post(DeviceEvent::Disconnected)
    }

    pub fn error(&self, code: i32) -> bool {
        self.post(DeviceEvent::Error(code))
    }

    pub fn configured(&self, session: Box<dyn CaptureSession>) -> bool {
        self.post(DeviceEvent::Configured(session))
    }

    pub fn configure_failed(&self) -> bool {
        self.post(DeviceEvent::ConfigureFailed)
    }

    pub fn capture_completed(&self) -> bool {
        self.post(DeviceEvent::CaptureCompleted)
    }

    pub fn capture_failed(&self, reason: impl Into<String>) -> bool {
        self.post(DeviceEvent::CaptureFailed(reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::backends::camera::types::{BackendResult, OutputTarget};

    struct TrackedDevice {
        closed: Arc<AtomicBool>,
    }

    impl CameraDevice for TrackedDevice {
        fn id(&self) -> &str {
            "tracked"
        }

        fn create_capture_session(
            &mut self,
            _outputs: Vec<OutputTarget>,
            _events: EventSink,
        ) -> BackendResult<()> {
            Ok(())
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_delivered_device_stays_open() {
        let closed = Arc::new(AtomicBool::new(false));
        let (events, mut rx) = event_channel(SessionId(1));

        assert!(events.opened(Box::new(TrackedDevice {
            closed: Arc::clone(&closed)
        })));
        assert!(matches!(rx.try_recv(), Ok(DeviceEvent::Opened(_))));
        assert!(!closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_refused_device_is_closed() {
        let closed = Arc::new(AtomicBool::new(false));
        let (events, rx) = event_channel(SessionId(1));
        drop(rx);

        assert!(!events.opened(Box::new(TrackedDevice {
            closed: Arc::clone(&closed)
        })));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_refused_plain_event_is_dropped() {
        let (events, rx) = event_channel(SessionId(2));
        drop(rx);
        assert!(!events.error(5));
        assert_eq!(events.session(), SessionId(2));
    }
}
