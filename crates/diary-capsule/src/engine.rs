//! Summary generation engine.
//!
//! Drives one capsule generation: prompt, backend call, rate-limit retries
//! and degradation to a template sentence. `generate` never fails; every
//! anomaly ends as a [`diary_types::CapsuleSource::Fallback`] summary.

use backoff::backoff::Backoff;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use diary_types::{CapsuleSettings, CapsuleSummary};

use crate::aggregate::AggregateContext;
use crate::backend::{BackendError, GenerativeBackend};
use crate::fallback::{FallbackSynthesizer, EMPTY_DAY_MESSAGE};
use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;

/// Summary returned when no backend is configured.
pub const UNAVAILABLE_MESSAGE: &str =
    "Daily capsules are not available right now. Please try again later.";

/// Generates capsule summaries from an aggregate.
#[derive(Clone)]
pub struct CapsuleGenerator {
    backend: Option<Arc<dyn GenerativeBackend>>,
    policy: RetryPolicy,
    prompt: PromptBuilder,
    fallback: FallbackSynthesizer,
}

impl CapsuleGenerator {
    /// Create a generator with default policy, prompt and fallback.
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
            prompt: PromptBuilder::new(),
            fallback: FallbackSynthesizer::new(),
        }
    }

    /// Create a generator configured from settings.
    pub fn from_settings(
        backend: Option<Arc<dyn GenerativeBackend>>,
        settings: &CapsuleSettings,
    ) -> Self {
        Self::new(backend)
            .with_policy(RetryPolicy::from_settings(settings))
            .with_prompt(PromptBuilder::new().name_tracks(settings.name_tracks))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackSynthesizer) -> Self {
        self.fallback = fallback;
        self
    }

    /// True if a backend is configured.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Prompt that would be sent for an aggregate.
    pub fn prompt_for(&self, aggregate: &AggregateContext) -> String {
        self.prompt.build(aggregate)
    }

    /// Generate a summary.
    ///
    /// Rate-limited calls are retried after the policy's backoff; any other
    /// error, an exhausted policy or cancellation during a wait degrades to
    /// the fallback sentence. A call already in flight is allowed to finish.
    pub async fn generate(
        &self,
        aggregate: &AggregateContext,
        cancel: &CancellationToken,
    ) -> CapsuleSummary {
        let Some(backend) = &self.backend else {
            warn!("No generative backend configured");
            return CapsuleSummary::fallback(UNAVAILABLE_MESSAGE);
        };

        if aggregate.is_empty() {
            return CapsuleSummary::fallback(EMPTY_DAY_MESSAGE);
        }

        let prompt = self.prompt.build(aggregate);
        let mut backoff = self.policy.backoff();

        for attempt in 1..=self.policy.max_attempts() {
            if cancel.is_cancelled() {
                info!(attempt, "Capsule generation cancelled");
                break;
            }

            debug!(attempt, "Calling generative backend");
            match dispatch(backend.clone(), prompt.clone()).await {
                Ok(text) => match normalize_summary(&text) {
                    Some(text) => {
                        info!(attempt, "Capsule summary generated");
                        return CapsuleSummary::generated(text);
                    }
                    None => {
                        warn!(attempt, "Backend returned an empty summary");
                        break;
                    }
                },
                Err(e) if e.is_rate_limited() => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            error = %e,
                            attempt,
                            retry_in_ms = delay.as_millis(),
                            "Backend rate limited, retrying"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                info!(attempt, "Capsule generation cancelled during backoff");
                                break;
                            }
                        }
                    }
                    None => {
                        warn!(error = %e, attempt, "Backend rate limited, retries exhausted");
                        break;
                    }
                },
                Err(e) => {
                    warn!(error = %e, attempt, "Backend call failed, using fallback");
                    break;
                }
            }
        }

        CapsuleSummary::fallback(self.fallback.synthesize_from(aggregate))
    }
}

impl std::fmt::Debug for CapsuleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleGenerator")
            .field("available", &self.is_available())
            .field("policy", &self.policy)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Run one backend call as its own task.
async fn dispatch(
    backend: Arc<dyn GenerativeBackend>,
    prompt: String,
) -> Result<String, BackendError> {
    let handle = tokio::spawn(async move { backend.generate_text(&prompt).await });
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(BackendError::Transient(format!("backend task failed: {}", e))),
    }
}

/// Clean model output into a capsule sentence.
///
/// Strips `*`, surrounding whitespace and quotes, and terminates the text
/// with a period if it has no closing punctuation. `None` if nothing is left.
pub fn normalize_summary(raw: &str) -> Option<String> {
    let cleaned = raw.replace('*', "");
    let cleaned = cleaned
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '\u{201c}' || c == '\u{201d}')
        .trim();

    if cleaned.is_empty() {
        return None;
    }

    let mut text = cleaned.to_string();
    if !text.ends_with(['.', '!', '?', '\u{2026}', '\u{3002}']) {
        text.push('.');
    }
    Some(text)
}
