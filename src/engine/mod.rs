//! Recognition engine abstraction and the background inference worker.
//!
//! [`RecognitionEngine`] is the seam between the pipeline and whatever turns
//! an equation image into LaTeX.  Production uses [`http::HttpEngine`], a
//! client for a local recognition HTTP service; tests swap in [`MockEngine`].

pub mod http;
pub mod worker;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpEngine;
pub use worker::{InferenceWorker, WorkerCommand, WorkerEvent};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors from recognition.  `Clone` because worker events carry them across
/// a channel and the UI may display them after the worker moved on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Initialization has not completed (or failed); submissions are refused.
    #[error("recognition engine is not initialized")]
    NotReady,

    /// An empty image payload was submitted.
    #[error("empty image submitted for recognition")]
    EmptyInput,

    /// The recognition service could not be reached.
    #[error("recognition service unreachable: {0}")]
    Unreachable(String),

    /// The request failed after reaching the service.
    #[error("recognition request failed: {0}")]
    Request(String),

    /// The service did not answer within the configured timeout.
    #[error("recognition timed out")]
    Timeout,

    /// The service answered with something we could not interpret.
    #[error("unexpected recognition response: {0}")]
    Parse(String),

    /// The service answered successfully but produced no LaTeX.
    #[error("recognition produced an empty result")]
    EmptyResult,

    /// The configuration names an engine this build does not provide.
    #[error("invalid engine configuration: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// RecognitionEngine
// ---------------------------------------------------------------------------

/// A LaTeX recognizer for equation images.
///
/// Implementations must be `Send + Sync` so the worker can hold them across
/// `.await` points.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognize the equation in a PNG image and return its LaTeX.
    async fn recognize(&self, image: &[u8]) -> Result<String, EngineError>;
}

// Compile-time check that the trait stays object-safe.
const _: fn() = || {
    fn assert_object_safe(_: &dyn RecognitionEngine) {}
};

/// Build the engine named in the configuration.
pub async fn create_engine(
    config: &crate::config::EngineConfig,
) -> Result<std::sync::Arc<dyn RecognitionEngine>, EngineError> {
    match config.kind.as_str() {
        "http" => Ok(std::sync::Arc::new(HttpEngine::connect(config).await?)),
        other => Err(EngineError::Config(format!("unknown engine kind {other:?}"))),
    }
}

// ---------------------------------------------------------------------------
// MockEngine (tests)
// ---------------------------------------------------------------------------

/// Scripted engine for worker and orchestrator tests.
#[cfg(test)]
pub struct MockEngine {
    response: Result<String, EngineError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockEngine {
    pub fn ok(latex: &str) -> Self {
        Self {
            response: Ok(latex.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn err(error: EngineError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn recognize(&self, _image: &[u8]) -> Result<String, EngineError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}
