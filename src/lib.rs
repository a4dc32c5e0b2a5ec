//! texsnip — grab a math expression from the screen or a phone photo and
//! turn it into LaTeX.
//!
//! # Pipeline
//!
//! ```text
//! hotkeys / phone upload          (bridge)
//!        │
//!        ▼
//! screen overlay | QR + editor    (capture, mobile)
//!        │  PNG bytes
//!        ▼
//! SessionOrchestrator             (session)
//!        │  Submit
//!        ▼
//! InferenceWorker → LaTeX         (engine)
//!        │
//!        ▼
//! floating widget + clipboard     (app)
//! ```
//!
//! All UI windows are viewports of a single egui context owned by
//! [`app::TexsnipApp`]; background work (HTTP server, recognition requests)
//! runs on a tokio runtime and communicates over mpsc channels.

pub mod app;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod engine;
pub mod mobile;
pub mod session;
