//! Camera session with a periodic detection thread.
//!
//! The detection thread wakes every `stability.interval_ms`, checks the
//! cancellation token and the camera state, skips its body while a capture
//! runs, and otherwise
//! grabs a frame and feeds [`Scanner::tick`]. Captures are one-shot and only
//! allowed while locked. The camera is closed on every exit path: `stop`,
//! `suspend`, a failing grab, and `Drop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use hexscan_core::Frame;
use hexscan_localize::DetectionState;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::history::HistoryStore;
use crate::scanner::{CaptureError, ScanResult, ScanStatus, Scanner};

/// Frame source failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera available")]
    NotFound,
    #[error("camera stream interrupted")]
    Disconnected,
    #[error("camera error: {0}")]
    Other(String),
}

/// A camera or any other producer of RGB frames.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), CameraError>;

    fn grab(&mut self) -> Result<Frame, CameraError>;

    /// Release the device. Called on every exit path; must be idempotent.
    fn close(&mut self);
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CameraStatus {
    #[default]
    Closed,
    Streaming,
    /// Stopped for a visibility change; `resume` restarts it.
    Suspended,
    /// Opening or grabbing failed. Cleared by a successful `start`.
    Unavailable { reason: String },
}

impl CameraStatus {
    pub fn hint(&self) -> &str {
        match self {
            Self::Closed => "Camera off",
            Self::Streaming => "Camera running",
            Self::Suspended => "Paused",
            Self::Unavailable { .. } => "Camera unavailable, retry to reconnect",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub camera: CameraStatus,
    pub detection: ScanStatus,
}

struct Shared {
    scanner: Mutex<Scanner>,
    source: Mutex<Box<dyn FrameSource>>,
    history: Mutex<Box<dyn HistoryStore>>,
    camera: Mutex<CameraStatus>,
    busy: AtomicBool,
    interval: Duration,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn set_camera(&self, status: CameraStatus) {
        let mut cur = lock(&self.camera);
        if *cur != status {
            log::info!("camera {:?} -> {:?}", *cur, status);
            *cur = status;
        }
    }

    fn close_source(&self) {
        lock(&self.source).close();
    }

    /// Camera stream lost: release the device and drop the lock.
    fn stream_failed(&self, e: &CameraError) {
        log::warn!("frame grab failed: {e}");
        self.close_source();
        lock(&self.scanner).reset_detection();
        self.set_camera(CameraStatus::Unavailable {
            reason: e.to_string(),
        });
    }

    /// One detection tick. Returns `false` when the loop should end.
    fn tick(&self) -> bool {
        if *lock(&self.camera) != CameraStatus::Streaming {
            return false;
        }
        if self.busy.load(Ordering::Acquire) {
            return true;
        }
        let grabbed = lock(&self.source).grab();
        match grabbed {
            Ok(frame) => {
                lock(&self.scanner).tick(&frame.image.view(), frame.timestamp_ms);
                true
            }
            Err(e) => {
                self.stream_failed(&e);
                false
            }
        }
    }
}

/// Clears the busy flag on every exit path of a capture.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Worker {
    cancel: Arc<AtomicBool>,
    wake: Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the camera for the lifetime of a scanning view.
pub struct CaptureSession {
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl CaptureSession {
    pub fn new(
        scanner: Scanner,
        source: Box<dyn FrameSource>,
        history: Box<dyn HistoryStore>,
    ) -> Self {
        let interval = Duration::from_millis(scanner.config().stability.interval_ms.max(1));
        Self {
            shared: Arc::new(Shared {
                scanner: Mutex::new(scanner),
                source: Mutex::new(source),
                history: Mutex::new(history),
                camera: Mutex::new(CameraStatus::Closed),
                busy: AtomicBool::new(false),
                interval,
            }),
            worker: None,
        }
    }

    /// Open the camera and start periodic detection from `Searching`.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            return Ok(());
        }
        self.join_worker();
        if let Err(e) = lock(&self.shared.source).open() {
            log::warn!("camera open failed: {e}");
            self.shared.set_camera(CameraStatus::Unavailable {
                reason: e.to_string(),
            });
            return Err(e.into());
        }
        lock(&self.shared.scanner).reset_detection();
        self.shared.set_camera(CameraStatus::Streaming);

        let cancel = Arc::new(AtomicBool::new(false));
        let (wake, sleep) = mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let token = Arc::clone(&cancel);
        let handle = std::thread::spawn(move || loop {
            if token.load(Ordering::Acquire) || !shared.tick() {
                break;
            }
            match sleep.recv_timeout(shared.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        self.worker = Some(Worker {
            cancel,
            wake,
            handle,
        });
        Ok(())
    }

    /// Stop detection and release the camera.
    pub fn stop(&mut self) {
        self.halt(CameraStatus::Closed);
    }

    /// App hidden or backgrounded: halt everything and release the camera.
    pub fn suspend(&mut self) {
        self.halt(CameraStatus::Suspended);
    }

    /// Reacquire the camera; detection restarts from `Searching`.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        self.start()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            camera: lock(&self.shared.camera).clone(),
            detection: lock(&self.shared.scanner).status(),
        }
    }

    /// Run `f` with exclusive access to the scanner (roster edits etc.).
    pub fn with_scanner<R>(&self, f: impl FnOnce(&mut Scanner) -> R) -> R {
        f(&mut lock(&self.shared.scanner))
    }

    /// Grab one frame and analyse it. Only allowed while locked. The busy
    /// flag is held from before the state check until return, and detection
    /// ticks skip their body while it is set. A failing grab ends the
    /// stream. The record is appended to the history, whose failures are
    /// logged and otherwise ignored.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn trigger_capture(&self) -> Result<ScanResult, CaptureError> {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::Busy);
        }
        let _guard = BusyGuard(&self.shared.busy);

        let camera = lock(&self.shared.camera).clone();
        if camera != CameraStatus::Streaming {
            return Err(CaptureError::CameraUnavailable(camera.hint().to_string()));
        }
        let state = lock(&self.shared.scanner).state();
        if state != DetectionState::Locked {
            return Err(CaptureError::NotLocked(state));
        }

        let grabbed = lock(&self.shared.source).grab();
        let frame = match grabbed {
            Ok(frame) => frame,
            Err(e) => {
                self.shared.stream_failed(&e);
                return Err(e.into());
            }
        };
        let result = lock(&self.shared.scanner)
            .analyze(&frame.image.view(), frame.timestamp_ms)?;
        if let Err(e) = lock(&self.shared.history).append(result.record.clone()) {
            log::warn!("match not saved to history: {e}");
        }
        Ok(result)
    }

    fn halt(&mut self, status: CameraStatus) {
        if let Some(w) = self.worker.take() {
            w.cancel.store(true, Ordering::Release);
            let _ = w.wake.send(());
            if w.handle.join().is_err() {
                log::warn!("detection thread panicked");
            }
        }
        self.shared.close_source();
        lock(&self.shared.scanner).reset_detection();
        let unavailable = matches!(*lock(&self.shared.camera), CameraStatus::Unavailable { .. });
        if !unavailable || status == CameraStatus::Suspended {
            self.shared.set_camera(status);
        }
    }

    /// Reap a worker that ended on its own (grab failure).
    fn join_worker(&mut self) {
        if let Some(w) = self.worker.take() {
            let _ = w.handle.join();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.halt(CameraStatus::Closed);
    }
}
