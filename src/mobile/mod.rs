//! Phone capture source: upload server, QR prompt and the crop/rotate editor.
//!
//! ```text
//! hotkey ──▶ MobileSource::start() ──▶ QR prompt (URL of the upload page)
//!                                          │  phone POSTs a photo
//!                                          ▼
//!                                     EditBuffer (crop / rotate)
//!                                          │  confirm
//!                                          ▼
//!                                     CaptureOutcome::Captured(png)
//! ```
//!
//! The HTTP listener stays bound for the application's lifetime once
//! started; later bridge sessions reuse it and only the windows come and go.

pub mod editor;
pub mod qr;
pub mod server;

use thiserror::Error;

pub use editor::{EditBuffer, Rotation};
pub use qr::qr_color_image;
pub use server::BridgeServer;

// ---------------------------------------------------------------------------
// BridgeError
// ---------------------------------------------------------------------------

/// Errors from the phone-upload bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind upload server on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    #[error("failed to render QR code: {0}")]
    Qr(String),
}

// ---------------------------------------------------------------------------
// MobileSource
// ---------------------------------------------------------------------------

/// What the UI should do after a bridge trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileStart {
    /// Fresh bridge session: show the QR prompt with this URL.
    ShowQr(String),
    /// An editor is already open; bring it to the foreground instead.
    RefocusEditor,
}

/// The phone capture source.  Owns the upload server and, while a photo is
/// being edited, the edit buffer.
pub struct MobileSource {
    server: BridgeServer,
    editor: Option<EditBuffer>,
}

impl MobileSource {
    pub fn new(server: BridgeServer) -> Self {
        Self {
            server,
            editor: None,
        }
    }

    /// Handle the bridge hotkey.  Starts (or reuses) the upload server and
    /// says whether to show the QR prompt or re-foreground an open editor.
    pub fn start(&mut self) -> Result<MobileStart, BridgeError> {
        if self.editor.is_some() {
            return Ok(MobileStart::RefocusEditor);
        }
        let url = self.server.start()?;
        Ok(MobileStart::ShowQr(url))
    }

    /// Open the editor for an uploaded photo, replacing any previous one.
    pub fn open_editor(
        &mut self,
        bytes: &[u8],
        min_selection_px: f32,
    ) -> Result<(), crate::capture::CaptureError> {
        self.editor = Some(EditBuffer::from_bytes(bytes, min_selection_px)?);
        Ok(())
    }

    pub fn editor(&mut self) -> Option<&mut EditBuffer> {
        self.editor.as_mut()
    }

    pub fn editor_open(&self) -> bool {
        self.editor.is_some()
    }

    /// Close the editor (confirm or cancel); the server stays up.
    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn bridge_url(&self) -> Option<&str> {
        self.server.url()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn source() -> MobileSource {
        let (tx, _rx) = mpsc::channel(8);
        MobileSource::new(BridgeServer::new(0, tokio::runtime::Handle::current(), tx))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn first_start_shows_qr_with_stable_url() {
        let mut source = source();

        let first = source.start().expect("start");
        let MobileStart::ShowQr(url) = first else {
            panic!("expected a QR prompt");
        };

        // A second trigger with no editor open repeats the same URL.
        assert_eq!(source.start().unwrap(), MobileStart::ShowQr(url));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn trigger_with_open_editor_refocuses() {
        let mut source = source();
        source.start().expect("start");

        let img = image::DynamicImage::new_rgba8(32, 32);
        let png = crate::capture::encode_png(&img).unwrap();
        source.open_editor(&png, 5.0).expect("open editor");

        assert_eq!(source.start().unwrap(), MobileStart::RefocusEditor);

        source.close_editor();
        assert!(matches!(source.start().unwrap(), MobileStart::ShowQr(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn server_survives_editor_lifecycle() {
        let mut source = source();
        source.start().expect("start");
        let url = source.bridge_url().unwrap().to_string();

        let img = image::DynamicImage::new_rgba8(16, 16);
        let png = crate::capture::encode_png(&img).unwrap();
        source.open_editor(&png, 5.0).expect("open editor");
        source.close_editor();

        assert_eq!(source.bridge_url(), Some(url.as_str()));
    }
}
