//! HTTP client for a local recognition service.
//!
//! The service contract:
//!
//! - `GET  {base_url}/health` — liveness probe used during initialization.
//! - `POST {base_url}/api/recognize` with `{"image": "<base64 png>",
//!   "format": "png"}` — returns `{"latex": "..."}`.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

use super::{EngineError, RecognitionEngine};

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    latex: String,
}

// ---------------------------------------------------------------------------
// HttpEngine
// ---------------------------------------------------------------------------

/// Client for the recognition service named in [`EngineConfig`].
#[derive(Debug)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    /// Build the client and probe the service's health endpoint.
    ///
    /// This is the slow, fallible part of engine initialization; it runs on
    /// the worker task, never on the UI thread.
    pub async fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        let health = client
            .get(format!("{base_url}/health"))
            .send()
            .await
            .map_err(request_error)?;
        if !health.status().is_success() {
            return Err(EngineError::Unreachable(format!(
                "health probe returned {}",
                health.status()
            )));
        }

        log::info!("engine: connected to recognition service at {base_url}");
        Ok(Self { client, base_url })
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for HttpEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String, EngineError> {
        if image.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let response = self
            .client
            .post(format!("{}/api/recognize", self.base_url))
            .json(&RecognizeRequest {
                image: &encoded,
                format: "png",
            })
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(EngineError::Request(format!(
                "service returned {}",
                response.status()
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let latex = parsed.latex.trim().to_string();
        if latex.is_empty() {
            return Err(EngineError::EmptyResult);
        }

        log::debug!("engine: recognized {} chars of LaTeX", latex.len());
        Ok(latex)
    }
}

/// Classify a transport error into the engine error taxonomy.
fn request_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout
    } else if e.is_connect() {
        EngineError::Unreachable(e.to_string())
    } else {
        EngineError::Request(e.to_string())
    }
}
