//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.  This is safe and
//! expected — rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::{TriggerEvent, TriggerSender};

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle.  Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that watches two global keys and forwards
    /// [`TriggerEvent::ScreenSnip`] / [`TriggerEvent::MobileBridge`] on `tx`
    /// whenever the corresponding key is pressed.
    ///
    /// Key releases are ignored — a capture session is a one-shot trigger,
    /// not push-to-hold.  The background thread uses `blocking_send` so it
    /// works correctly from a non-async context.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(snip_key: rdev::Key, mobile_key: rdev::Key, tx: TriggerSender) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    if let rdev::EventType::KeyPress(k) = event.event_type {
                        let trigger = if k == snip_key {
                            Some(TriggerEvent::ScreenSnip)
                        } else if k == mobile_key {
                            Some(TriggerEvent::MobileBridge)
                        } else {
                            None
                        };

                        if let Some(trigger) = trigger {
                            log::debug!("hotkey: forwarding {trigger:?}");
                            let _ = tx.blocking_send(trigger);
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports the function keys plus a handful of keys that make sense as
/// capture triggers.  Returns `None` for unrecognised names so callers can
/// fall back to a default and warn the user.
///
/// # Examples
///
/// ```
/// use texsnip::bridge::parse_key;
///
/// assert_eq!(parse_key("F2"), Some(rdev::Key::F2));
/// assert_eq!(parse_key("PrintScreen"), Some(rdev::Key::PrintScreen));
/// assert_eq!(parse_key("Ctrl+Q"), None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    match key_str {
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),
        "PrintScreen" => Some(rdev::Key::PrintScreen),
        "ScrollLock" => Some(rdev::Key::ScrollLock),
        "Pause" => Some(rdev::Key::Pause),
        "Insert" => Some(rdev::Key::Insert),
        "Home" => Some(rdev::Key::Home),
        "End" => Some(rdev::Key::End),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_function_keys() {
        assert_eq!(parse_key("F1"), Some(rdev::Key::F1));
        assert_eq!(parse_key("F2"), Some(rdev::Key::F2));
        assert_eq!(parse_key("F12"), Some(rdev::Key::F12));
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!(parse_key("PrintScreen"), Some(rdev::Key::PrintScreen));
        assert_eq!(parse_key("Insert"), Some(rdev::Key::Insert));
        assert_eq!(parse_key("Pause"), Some(rdev::Key::Pause));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key("Ctrl+Shift+S"), None);
    }
}
