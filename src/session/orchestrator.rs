//! Session orchestrator: the single state machine behind both capture
//! sources, the worker and the result display.
//!
//! Pure with respect to the UI: every input returns an [`Action`] telling
//! the caller what to do (open a window, submit an image, show a result).
//! That keeps the transition rules testable without an egui context or a
//! live worker.
//!
//! Rules enforced here:
//! - at most one capture session exists at any time;
//! - a trigger while a result or error is displayed dismisses it and starts
//!   fresh;
//! - a repeated same-source trigger restarts/refocuses the active capture
//!   instead of stacking a second one;
//! - triggers during processing, and cross-source triggers during an active
//!   capture, are ignored;
//! - worker events only advance the pipeline when it is actually processing.

use crate::engine::WorkerEvent;

use super::state::{CaptureSession, SessionPhase, SessionState, SourceKind};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What the UI should do in response to an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Freeze the displays and open the selection overlays.
    StartScreenCapture,
    /// Start (or reuse) the upload server and show the QR prompt.
    StartMobileBridge,
    /// Bring the already-open editor window to the foreground.
    RefocusEditor,
    /// Open (or reload) the editor with this upload.
    OpenEditor(Vec<u8>),
    /// Hand an image to the inference worker.
    Submit(Vec<u8>),
    /// Show recognized LaTeX on the widget.
    ShowResult(String),
    /// Show a failure message on the widget.
    ShowError(String),
    /// Close whatever capture window is open.
    DismissCapture,
    /// Nothing to do.
    None,
}

// ---------------------------------------------------------------------------
// EngineStatus
// ---------------------------------------------------------------------------

/// Worker-reported engine health, shown on the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Initializing,
    Ready,
    Offline,
}

// ---------------------------------------------------------------------------
// SessionOrchestrator
// ---------------------------------------------------------------------------

pub struct SessionOrchestrator {
    state: SessionState,
    session: Option<CaptureSession>,
    next_session_id: u64,
    engine_status: EngineStatus,
}

impl Default for SessionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionOrchestrator {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
            next_session_id: 1,
            engine_status: EngineStatus::Initializing,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.engine_status
    }

    // -- capture triggers ---------------------------------------------------

    /// A capture hotkey was pressed.
    pub fn handle_trigger(&mut self, kind: SourceKind) -> Action {
        if self.state.accepts_new_capture() {
            return self.begin_session(kind);
        }

        match (&self.state, kind) {
            // Same-source re-trigger: restart the overlay with a fresh frame.
            (SessionState::CaptureActive(SourceKind::Screen), SourceKind::Screen) => {
                log::debug!("session: restarting screen capture");
                Action::StartScreenCapture
            }
            // Same-source re-trigger on the bridge: refocus the editor if one
            // is open, otherwise just re-show the QR prompt.
            (SessionState::CaptureActive(SourceKind::Mobile), SourceKind::Mobile) => {
                let editing = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.phase == SessionPhase::Editing);
                if editing {
                    log::debug!("session: refocusing open editor");
                    Action::RefocusEditor
                } else {
                    Action::StartMobileBridge
                }
            }
            _ => {
                log::debug!(
                    "session: ignoring {kind:?} trigger while {}",
                    self.state.label()
                );
                Action::None
            }
        }
    }

    fn begin_session(&mut self, kind: SourceKind) -> Action {
        // Starting over an on-screen result or error dismisses it.
        if self.state != SessionState::Idle {
            log::debug!("session: dismissing {} for a new capture", self.state.label());
        }

        let id = self.next_session_id;
        self.next_session_id += 1;
        self.session = Some(CaptureSession::new(id, kind));
        self.state = SessionState::CaptureActive(kind);
        log::info!("session: #{id} started ({kind:?})");

        match kind {
            SourceKind::Screen => Action::StartScreenCapture,
            SourceKind::Mobile => Action::StartMobileBridge,
        }
    }

    // -- capture source events ----------------------------------------------

    /// The upload server delivered a photo.
    ///
    /// The server stays bound for the application's lifetime, so uploads may
    /// arrive with no bridge session active; those adopt a fresh session and
    /// open the editor directly.  Uploads during a screen capture or while
    /// processing are dropped.
    pub fn on_upload_received(&mut self, bytes: Vec<u8>) -> Action {
        match &self.state {
            SessionState::CaptureActive(SourceKind::Mobile) => {
                if let Some(session) = &mut self.session {
                    session.phase = SessionPhase::Editing;
                }
                log::info!("session: upload received, opening editor");
                Action::OpenEditor(bytes)
            }
            state if state.accepts_new_capture() => {
                let action = self.begin_session(SourceKind::Mobile);
                debug_assert_eq!(action, Action::StartMobileBridge);
                if let Some(session) = &mut self.session {
                    session.phase = SessionPhase::Editing;
                }
                log::info!("session: unsolicited upload adopted into a new session");
                Action::OpenEditor(bytes)
            }
            _ => {
                log::warn!(
                    "session: dropping upload received while {}",
                    self.state.label()
                );
                Action::None
            }
        }
    }

    /// The user dismissed the overlay, QR prompt or editor.
    pub fn on_capture_cancelled(&mut self) -> Action {
        if let Some(session) = self.session.take() {
            log::info!("session: #{} cancelled", session.id);
        }
        self.state = SessionState::Idle;
        Action::DismissCapture
    }

    /// A capture source failed to start or crashed (display enumeration,
    /// server bind, image decode).
    pub fn on_capture_failed(&mut self, message: String) -> Action {
        if let Some(session) = self.session.take() {
            log::error!("session: #{} failed: {message}", session.id);
        }
        self.state = SessionState::Error;
        Action::ShowError(message)
    }

    /// A capture source produced a final image.
    pub fn on_captured(&mut self, bytes: Vec<u8>) -> Action {
        let Some(session) = self.session.take() else {
            log::warn!("session: capture completion with no live session, dropping");
            return Action::None;
        };

        log::info!("session: #{} captured {} bytes", session.id, bytes.len());
        self.state = SessionState::Processing;
        Action::Submit(bytes)
    }

    // -- worker events -------------------------------------------------------

    pub fn on_worker_event(&mut self, event: WorkerEvent) -> Action {
        match event {
            WorkerEvent::Ready => {
                log::info!("session: engine ready");
                self.engine_status = EngineStatus::Ready;
                Action::None
            }
            WorkerEvent::InitFailed(e) => {
                self.engine_status = EngineStatus::Offline;
                self.session = None;
                self.state = SessionState::Error;
                Action::ShowError(e.to_string())
            }
            WorkerEvent::Recognized(latex) => {
                if self.state != SessionState::Processing {
                    log::warn!("session: dropping stale result");
                    return Action::None;
                }
                self.state = SessionState::Displaying;
                Action::ShowResult(latex)
            }
            WorkerEvent::Failed(e) => {
                if self.state != SessionState::Processing {
                    log::warn!("session: dropping stale failure: {e}");
                    return Action::None;
                }
                self.state = SessionState::Error;
                Action::ShowError(e.to_string())
            }
        }
    }

    // -- widget ---------------------------------------------------------------

    /// The user closed the result/error display.
    pub fn dismiss(&mut self) {
        if matches!(self.state, SessionState::Displaying | SessionState::Error) {
            self.state = SessionState::Idle;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
