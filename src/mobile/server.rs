//! Embedded HTTP listener for phone uploads.
//!
//! Serves a minimal upload page on `GET /` and accepts a multipart photo on
//! `POST /`.  Received bytes are forwarded to the UI through the event
//! bridge; the server never touches session state itself.
//!
//! Binding happens synchronously on the caller's thread with a std listener
//! so `start` can report bind failures immediately, then the listener is
//! handed to a tokio task for serving.  `start` is idempotent: while the
//! server is running, repeated calls return the same URL without rebinding.

use std::net::{TcpListener, UdpSocket};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use tokio::task::JoinHandle;

use crate::bridge::{TriggerEvent, TriggerSender};

use super::BridgeError;

/// Largest accepted upload.  Phone photos are a few MB; this leaves headroom.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Self-contained upload page; no external assets so it renders on any phone
/// browser without internet access.
const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>texsnip upload</title>
<style>
  body { font-family: sans-serif; background: #1e1e2e; color: #cdd6f4;
         display: flex; flex-direction: column; align-items: center;
         justify-content: center; min-height: 90vh; margin: 0; }
  h1 { font-size: 1.3em; }
  input[type=file] { margin: 1.5em 0; }
  button { font-size: 1.1em; padding: 0.6em 2em; border: none;
           border-radius: 8px; background: #89b4fa; color: #1e1e2e; }
</style>
</head>
<body>
<h1>Send a photo of your equation</h1>
<form method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept="image/*" capture="environment" required>
  <br>
  <button type="submit">Upload</button>
</form>
</body>
</html>
"#;

// ---------------------------------------------------------------------------
// BridgeServer
// ---------------------------------------------------------------------------

/// Lifecycle handle for the upload listener.
pub struct BridgeServer {
    configured_port: u16,
    tx: TriggerSender,
    runtime: tokio::runtime::Handle,
    server: Option<JoinHandle<()>>,
    url: Option<String>,
    local_port: Option<u16>,
}

impl BridgeServer {
    /// `port == 0` binds an ephemeral port (the advertised URL always carries
    /// the real one).
    pub fn new(port: u16, runtime: tokio::runtime::Handle, tx: TriggerSender) -> Self {
        Self {
            configured_port: port,
            tx,
            runtime,
            server: None,
            url: None,
            local_port: None,
        }
    }

    /// Start the listener if it is not already running and return the URL a
    /// phone on the same network should open.
    pub fn start(&mut self) -> Result<String, BridgeError> {
        if let (Some(url), Some(server)) = (&self.url, &self.server) {
            if !server.is_finished() {
                log::debug!("bridge: already serving at {url}");
                return Ok(url.clone());
            }
        }

        let bind_err = |e: std::io::Error| BridgeError::Bind {
            port: self.configured_port,
            source: e,
        };

        let listener = TcpListener::bind(("0.0.0.0", self.configured_port)).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_port = listener.local_addr().map_err(bind_err)?.port();

        let tx = self.tx.clone();
        let server = self.runtime.spawn(async move {
            let listener = match tokio::net::TcpListener::from_std(listener) {
                Ok(l) => l,
                Err(e) => {
                    log::error!("bridge: failed to register listener with tokio: {e}");
                    return;
                }
            };

            let app = Router::new()
                .route("/", get(upload_page).post(receive_upload))
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .with_state(tx);

            if let Err(e) = axum::serve(listener, app).await {
                log::error!("bridge: server exited with error: {e}");
            }
        });

        let host = lan_ip().unwrap_or_else(|| {
            log::warn!("bridge: could not determine LAN address, advertising loopback");
            "127.0.0.1".to_string()
        });
        let url = format!("http://{host}:{local_port}/");
        log::info!("bridge: serving uploads at {url}");

        self.server = Some(server);
        self.url = Some(url.clone());
        self.local_port = Some(local_port);
        Ok(url)
    }

    /// Port actually bound, once running.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Stop serving.  Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
            log::info!("bridge: stopped");
        }
        self.url = None;
        self.local_port = None;
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// Accept the first non-empty `file` part and forward it to the UI.
async fn receive_upload(
    State(tx): State<TriggerSender>,
    mut multipart: Multipart,
) -> (StatusCode, &'static str) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }

        match field.bytes().await {
            Ok(bytes) if !bytes.is_empty() => {
                log::info!("bridge: received upload ({} bytes)", bytes.len());
                if tx
                    .send(TriggerEvent::MobileUpload(bytes.to_vec()))
                    .await
                    .is_err()
                {
                    log::warn!("bridge: UI receiver gone, dropping upload");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "application closed");
                }
                return (StatusCode::OK, "OK");
            }
            Ok(_) => {
                log::warn!("bridge: rejected empty file part");
                return (StatusCode::BAD_REQUEST, "empty file");
            }
            Err(e) => {
                log::warn!("bridge: failed to read upload body: {e}");
                return (StatusCode::BAD_REQUEST, "unreadable upload");
            }
        }
    }

    (StatusCode::BAD_REQUEST, "missing file field")
}

// ---------------------------------------------------------------------------
// LAN address discovery
// ---------------------------------------------------------------------------

/// Find the address a phone on the same network can reach us at.
///
/// Opens a UDP socket "towards" a public address; no packet is sent, the OS
/// just picks the outbound interface, whose address we read back.
fn lan_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
