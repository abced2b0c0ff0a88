//! Mock backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{BackendError, GenerativeBackend};

/// One recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    /// Prompt that was sent
    pub prompt: String,
    /// When the call started (tokio clock, so paused-time tests see virtual time)
    pub at: Instant,
}

/// Backend that replays scripted responses.
///
/// Scripted results are consumed in order; once the script is empty every
/// call returns the default result. Useful for testing without making API
/// calls.
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    default: Result<String, BackendError>,
    delay: Duration,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    /// Mock that always answers with a short, well-formed summary.
    pub fn new() -> Self {
        Self::always("It was a calm day, softly carried along by music.")
    }

    /// Mock that always returns `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::with_default(Ok(text.into()))
    }

    /// Mock that always fails with `error`.
    pub fn failing(error: BackendError) -> Self {
        Self::with_default(Err(error))
    }

    /// Mock that replays `script`, then falls back to `default`.
    pub fn scripted(
        script: Vec<Result<String, BackendError>>,
        default: Result<String, BackendError>,
    ) -> Self {
        let mock = Self::with_default(default);
        *lock(&mock.script) = script.into();
        mock
    }

    /// Delay every call by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_default(default: Result<String, BackendError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Prompt of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.calls).last().map(|c| c.prompt.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        lock(&self.calls).push(MockCall {
            prompt: prompt.to_string(),
            at: Instant::now(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = lock(&self.script).pop_front();
        next.unwrap_or_else(|| self.default.clone())
    }
}
