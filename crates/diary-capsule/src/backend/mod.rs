//! Generative text backends.
//!
//! The engine only sees [`GenerativeBackend`]: one prompt in, one string
//! out, and an error that says whether retrying could help.

mod api;
mod mock;

pub use api::{ApiBackend, ApiBackendConfig};
pub use mock::{MockBackend, MockCall};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use diary_types::CapsuleSettings;

/// Classified backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Quota or rate limit hit (HTTP 429, RESOURCE_EXHAUSTED). Worth retrying.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network failure, timeout or server-side error.
    #[error("Transient backend error: {0}")]
    Transient(String),

    /// Bad request, bad credentials or an unusable response.
    #[error("Permanent backend error: {0}")]
    Permanent(String),
}

impl BackendError {
    /// True if the error signals rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: String) -> Self {
        let detail = format!("HTTP {}: {}", status, body);
        if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
            BackendError::RateLimited(detail)
        } else if status == 408 || status >= 500 {
            BackendError::Transient(detail)
        } else {
            BackendError::Permanent(detail)
        }
    }

    /// Classify a transport-level failure.
    pub fn from_request(err: &reqwest::Error) -> Self {
        if err.is_decode() || err.is_builder() {
            BackendError::Permanent(err.to_string())
        } else {
            BackendError::Transient(err.to_string())
        }
    }
}

/// A generative text model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate text for a prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Build the configured backend once at startup.
///
/// Returns `Ok(None)` when no API key is set: the capsule feature is then
/// unavailable and the engine answers with a fixed message.
pub fn build_backend(
    settings: &CapsuleSettings,
) -> Result<Option<Arc<dyn GenerativeBackend>>, BackendError> {
    let Some(config) = ApiBackendConfig::from_settings(settings) else {
        tracing::warn!("Capsule API key is not set, capsule generation is unavailable");
        return Ok(None);
    };

    let backend = ApiBackend::new(config)?;
    tracing::info!(
        provider = ?settings.provider,
        model = %backend.model(),
        "Generative backend ready"
    );
    Ok(Some(Arc::new(backend)))
}
