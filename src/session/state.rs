//! Session and pipeline state types.
//!
//! A [`CaptureSession`] exists only between trigger and hand-off to the
//! worker (or cancellation); the orchestrator holds at most one in an
//! `Option`, which is what enforces the single-session rule.

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Which capture source a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Fullscreen overlay snip.
    Screen,
    /// Phone upload through the bridge.
    Mobile,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// How far a live session has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the user (overlay drag, or phone upload).
    AwaitingInput,
    /// A mobile upload arrived and is being cropped/rotated.
    Editing,
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// One in-flight capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: u64,
    pub source: SourceKind,
    pub phase: SessionPhase,
}

impl CaptureSession {
    pub fn new(id: u64, source: SourceKind) -> Self {
        Self {
            id,
            source,
            phase: SessionPhase::AwaitingInput,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The pipeline state shown on the floating widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing happening; hotkeys armed.
    Idle,
    /// A capture UI is up for the given source.
    CaptureActive(SourceKind),
    /// An image was handed to the worker; waiting for LaTeX.
    Processing,
    /// A result is on screen.
    Displaying,
    /// A failure message is on screen.
    Error,
}

impl SessionState {
    /// States where a new capture may begin (possibly after dismissing what
    /// is on screen).
    pub fn accepts_new_capture(&self) -> bool {
        matches!(self, Self::Idle | Self::Displaying | Self::Error)
    }

    /// Short status label for the widget.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::CaptureActive(SourceKind::Screen) => "Select a region...",
            Self::CaptureActive(SourceKind::Mobile) => "Waiting for phone...",
            Self::Processing => "Recognizing...",
            Self::Displaying => "Done",
            Self::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_awaits_input() {
        let session = CaptureSession::new(1, SourceKind::Screen);
        assert_eq!(session.phase, SessionPhase::AwaitingInput);
        assert_eq!(session.source, SourceKind::Screen);
    }

    #[test]
    fn terminal_and_idle_states_accept_new_captures() {
        assert!(SessionState::Idle.accepts_new_capture());
        assert!(SessionState::Displaying.accepts_new_capture());
        assert!(SessionState::Error.accepts_new_capture());

        assert!(!SessionState::Processing.accepts_new_capture());
        assert!(!SessionState::CaptureActive(SourceKind::Screen).accepts_new_capture());
        assert!(!SessionState::CaptureActive(SourceKind::Mobile).accepts_new_capture());
    }

    #[test]
    fn labels_are_distinct_per_state() {
        let labels = [
            SessionState::Idle.label(),
            SessionState::CaptureActive(SourceKind::Screen).label(),
            SessionState::CaptureActive(SourceKind::Mobile).label(),
            SessionState::Processing.label(),
            SessionState::Displaying.label(),
            SessionState::Error.label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
