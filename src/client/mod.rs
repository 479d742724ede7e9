//! AI client capability — the seam between the pipeline and an upstream
//! text-generation service.
//!
//! The pipeline only ever talks to the [`AiClient`] trait. `GeminiClient`
//! binds it to the Gemini REST API; additional providers are added by
//! implementing the same trait. [`MockAiClient`] is the scripted test double
//! used throughout the crate's tests.

pub mod gemini;
pub mod gemini_types;
pub mod retry;

pub use gemini::GeminiClient;
pub use retry::{with_retry, RetryPolicy};

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::{HealthStatus, ServiceHealth};

// ═══════════════════════════════════════════════════════════
// Request / response
// ═══════════════════════════════════════════════════════════

/// A single generation request. Immutable, constructed per call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Sampling randomness; the client applies its own default when absent.
    pub temperature: Option<f32>,
    /// Output token budget; the client applies its own default when absent.
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting reported by the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Metadata attached to a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub processing_time_ms: u64,
    /// Opaque id assigned by the upstream service, when it provides one.
    pub request_id: Option<String>,
}

/// A successful generation: raw text plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub text: String,
    pub metadata: GenerationMetadata,
}

// ═══════════════════════════════════════════════════════════
// Error taxonomy
// ═══════════════════════════════════════════════════════════

/// Classified AI service failure. Classification happens once, at the HTTP
/// boundary, and is carried through the retry loop unchanged.
#[derive(Debug, Clone, Error)]
pub enum AiClientError {
    #[error("AI service rate limit exceeded (retry after {retry_after_secs}s)")]
    RateLimit { retry_after_secs: u64 },

    #[error("AI service API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI service request timed out after {0:?}")]
    Timeout(Duration),

    #[error("AI service network error: {0}")]
    Network(String),

    #[error("AI service unknown error: {0}")]
    Unknown(String),
}

impl AiClientError {
    /// Whether the backoff schedule should use the slower rate-limit tier.
    ///
    /// Besides the 429 classification, upstream sometimes reports quota
    /// exhaustion inside an otherwise generic error body.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimit { .. } => true,
            Self::Api { message, .. } | Self::Network(message) | Self::Unknown(message) => {
                let lower = message.to_lowercase();
                lower.contains("rate limit") || lower.contains("quota exceeded")
            }
            Self::Timeout(_) => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Capability trait
// ═══════════════════════════════════════════════════════════

/// Capability interface over a text-generation provider.
///
/// Implementations hold no per-request mutable state, so one instance may be
/// shared across concurrent callers without locking.
pub trait AiClient: Send + Sync {
    /// Run one generation exchange. Retry, timeout and error classification
    /// are the implementation's responsibility.
    fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Generation, AiClientError>> + Send;

    /// Probe the service with a minimal request. Never propagates errors.
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;

    /// Human-readable provider/model descriptor.
    fn model_info(&self) -> String;
}

/// Probe a client and report its availability as a [`ServiceHealth`].
pub async fn service_status(client: &impl AiClient) -> ServiceHealth {
    let started = std::time::Instant::now();
    let healthy = client.is_healthy().await;

    ServiceHealth {
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        last_checked: chrono::Utc::now(),
        response_time_ms: Some(started.elapsed().as_millis() as u64),
        error: None,
    }
}

// ═══════════════════════════════════════════════════════════
// MockAiClient — scripted test double
// ═══════════════════════════════════════════════════════════

/// Scripted AI client for testing.
///
/// Pops queued outcomes in order and falls back to a fixed response once the
/// script is exhausted. Cloning shares the script and the call counter, so a
/// test can keep a handle after injecting the client into the pipeline.
#[derive(Clone)]
pub struct MockAiClient {
    inner: Arc<MockInner>,
}

struct MockInner {
    script: Mutex<VecDeque<Result<String, AiClientError>>>,
    fallback: String,
    calls: AtomicUsize,
    healthy: bool,
    model: String,
}

impl MockAiClient {
    /// Client that always answers with `response`.
    pub fn healthy(response: &str) -> Self {
        Self::with_health(response, true)
    }

    /// Client whose health probe reports failure.
    pub fn unhealthy() -> Self {
        Self::with_health("", false)
    }

    fn with_health(response: &str, healthy: bool) -> Self {
        Self {
            inner: Arc::new(MockInner {
                script: Mutex::new(VecDeque::new()),
                fallback: response.to_string(),
                calls: AtomicUsize::new(0),
                healthy,
                model: "mock-model".to_string(),
            }),
        }
    }

    /// Queue an outcome ahead of the fallback response.
    pub fn push_ok(self, response: &str) -> Self {
        self.inner
            .script
            .lock()
            .expect("mock script lock")
            .push_back(Ok(response.to_string()));
        self
    }

    /// Queue a failure ahead of the fallback response.
    pub fn push_err(self, error: AiClientError) -> Self {
        self.inner
            .script
            .lock()
            .expect("mock script lock")
            .push_back(Err(error));
        self
    }

    /// How many times `generate_content` was invoked.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl AiClient for MockAiClient {
    async fn generate_content(
        &self,
        _request: &GenerationRequest,
    ) -> Result<Generation, AiClientError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .inner
            .script
            .lock()
            .expect("mock script lock")
            .pop_front();

        let text = match scripted {
            Some(outcome) => outcome?,
            None => self.inner.fallback.clone(),
        };

        Ok(Generation {
            text,
            metadata: GenerationMetadata {
                model: self.inner.model.clone(),
                usage: None,
                processing_time_ms: 0,
                request_id: None,
            },
        })
    }

    async fn is_healthy(&self) -> bool {
        self.inner.healthy
    }

    fn model_info(&self) -> String {
        self.inner.model.clone()
    }
}
