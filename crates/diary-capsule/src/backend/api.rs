//! HTTP backends for Gemini and OpenAI-compatible endpoints.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use diary_types::{CapsuleSettings, Provider};

use super::{BackendError, GenerativeBackend};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for an HTTP backend.
#[derive(Debug, Clone)]
pub struct ApiBackendConfig {
    /// API flavour
    pub provider: Provider,

    /// API base URL
    pub base_url: String,

    /// Model to use (e.g., "gemini-1.5-flash", "gpt-4o-mini")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,
}

impl ApiBackendConfig {
    /// Config for the Gemini API.
    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::Gemini,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(30),
        }
    }

    /// Config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::OpenAi,
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the config at another base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from settings. Returns `None` when no API key is set.
    pub fn from_settings(settings: &CapsuleSettings) -> Option<Self> {
        let api_key = settings.api_key.as_deref().filter(|k| !k.is_empty())?;

        let config = match settings.provider {
            Provider::Gemini => Self::gemini(api_key, settings.model.clone()),
            Provider::OpenAi => Self::openai(api_key, settings.model.clone()),
        }
        .with_timeout(Duration::from_secs(settings.timeout_secs));

        Some(match settings.api_base_url.as_deref() {
            Some(url) => config.with_base_url(url),
            None => config,
        })
    }
}

/// HTTP generative backend.
///
/// Built once at startup and shared by handle; the underlying connection
/// pool is reused across capsules.
pub struct ApiBackend {
    client: Client,
    config: ApiBackendConfig,
}

impl ApiBackend {
    /// Create a new HTTP backend.
    pub fn new(config: ApiBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Permanent(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Model identifier in use.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Make a Gemini `generateContent` request.
    async fn make_gemini_request(&self, prompt: &str) -> Result<String, BackendError> {
        #[derive(Serialize)]
        struct GeminiRequest<'a> {
            contents: Vec<GeminiContent<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiContent<'a> {
            parts: Vec<GeminiPart<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiPart<'a> {
            text: &'a str,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<GeminiCandidate>,
            prompt_feedback: Option<GeminiPromptFeedback>,
        }

        #[derive(Deserialize)]
        struct GeminiCandidate {
            content: Option<GeminiResponseContent>,
        }

        #[derive(Deserialize)]
        struct GeminiResponseContent {
            #[serde(default)]
            parts: Vec<GeminiResponsePart>,
        }

        #[derive(Deserialize)]
        struct GeminiResponsePart {
            #[serde(default)]
            text: String,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiPromptFeedback {
            block_reason: Option<String>,
        }

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_request(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, body));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Permanent(format!("Failed to parse response: {}", e)))?;

        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Permanent(format!("Prompt blocked: {}", reason)));
        }

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| BackendError::Permanent("No candidates in response".to_string()))
    }

    /// Make an OpenAI-compatible chat completions request.
    async fn make_openai_request(&self, prompt: &str) -> Result<String, BackendError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            #[serde(default)]
            content: Option<String>,
        }

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_request(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, body));
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Permanent(format!("Failed to parse response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Permanent("No choices in response".to_string()))
    }
}

#[async_trait]
impl GenerativeBackend for ApiBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Sending capsule prompt"
        );

        match self.config.provider {
            Provider::Gemini => self.make_gemini_request(prompt).await,
            Provider::OpenAi => self.make_openai_request(prompt).await,
        }
    }
}
