//! Event bridge — marshals externally-originated triggers into the UI loop.
//!
//! # Design
//!
//! Hotkey callbacks run on an OS-managed `rdev` thread and upload requests
//! run on the HTTP listener's tokio task.  Neither may touch session or
//! window state directly: everything the UI owns is mutated only inside the
//! egui update loop.  Producers therefore enqueue a [`TriggerEvent`] on a
//! `tokio::sync::mpsc` channel and the UI drains it with `try_recv` each
//! frame.
//!
//! The channel preserves enqueue order and buffers events sent before the
//! UI loop starts, so no trigger is lost during the startup race.  Each
//! trigger is delivered independently; nothing is coalesced.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use texsnip::bridge::{HotkeyListener, TriggerEvent};
//!
//! let (tx, mut rx) = mpsc::channel(32);
//! let _listener = HotkeyListener::start(rdev::Key::F2, rdev::Key::F3, tx);
//!
//! // In the UI update loop:
//! // while let Ok(event) = rx.try_recv() { ... }
//! ```

pub mod hotkey;

pub use hotkey::{parse_key, HotkeyListener};

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

/// Events that cross from an external thread into the UI context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// The screen-snip hotkey was pressed.
    ScreenSnip,
    /// The mobile-bridge hotkey was pressed.
    MobileBridge,
    /// The upload server received an image from a phone.
    MobileUpload(Vec<u8>),
}

/// Sending half of the event bridge, cloned into every producer.
pub type TriggerSender = tokio::sync::mpsc::Sender<TriggerEvent>;

/// Receiving half, owned exclusively by the UI loop.
pub type TriggerReceiver = tokio::sync::mpsc::Receiver<TriggerEvent>;
