//! Gemini binding of the [`AiClient`] capability.
//!
//! Translates a [`GenerationRequest`] into the generateContent wire shape,
//! bounds each attempt with a hard timeout (the in-flight call is cancelled
//! when it elapses), and classifies failures once at this boundary.

use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use super::gemini_types::{
    default_safety_settings, extract_text, GeminiContent, GeminiErrorResponse,
    GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiResponse,
};
use super::retry::{with_retry, RetryPolicy};
use super::{AiClient, AiClientError, Generation, GenerationMetadata, GenerationRequest, TokenUsage};
use crate::config::{AiConfig, ConfigError};

/// Sampling temperature applied when the request does not set one.
const DEFAULT_TEMPERATURE: f32 = 0.8;
/// Output token budget applied when the request does not set one.
const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Retry-after fallback when the 429 response does not carry the header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// AI client bound to the Gemini generateContent REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    config: AiConfig,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Validates that an API key and endpoint URL are present; a client
    /// without either cannot function, so construction fails.
    pub fn new(config: AiConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        let retry = RetryPolicy::with_max_attempts(config.max_retries);

        Ok(Self {
            http,
            config,
            retry,
        })
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn build_request(&self, request: &GenerationRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
                role: None,
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                top_k: 40,
                top_p: 0.95,
            }),
            safety_settings: Some(default_safety_settings()),
        }
    }

    /// One bounded attempt: send, classify, extract.
    async fn attempt(&self, request: &GenerationRequest) -> Result<Generation, AiClientError> {
        let started = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}?key={}", self.config.api_url, self.config.api_key);

        let send = self.http.post(&url).json(&body).send();
        let response = match tokio::time::timeout(self.config.timeout, send).await {
            Ok(sent) => sent.map_err(|e| classify_transport_error(e, self.config.timeout))?,
            Err(_) => return Err(AiClientError::Timeout(self.config.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_error_status(status, &body_text, retry_after));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiClientError::Unknown(format!("Failed to parse Gemini response: {e}")))?;

        let text = extract_text(&parsed)
            .ok_or_else(|| AiClientError::Unknown("No text content in Gemini response".into()))?;

        Ok(Generation {
            text,
            metadata: GenerationMetadata {
                model: self.config.model.clone(),
                usage: parsed.usage_metadata.map(|usage| TokenUsage {
                    prompt_tokens: usage.prompt_token_count,
                    completion_tokens: usage.candidates_token_count,
                    total_tokens: usage.total_token_count,
                }),
                processing_time_ms: started.elapsed().as_millis() as u64,
                request_id: parsed.response_id,
            },
        })
    }
}

impl AiClient for GeminiClient {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<Generation, AiClientError> {
        with_retry(&self.retry, || self.attempt(request)).await
    }

    async fn is_healthy(&self) -> bool {
        let probe = GenerationRequest::new("Test").with_max_tokens(10);
        match self.generate_content(&probe).await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Gemini health check failed");
                false
            }
        }
    }

    fn model_info(&self) -> String {
        format!("Gemini ({})", self.config.model)
    }
}

fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> AiClientError {
    if error.is_timeout() {
        AiClientError::Timeout(timeout)
    } else if error.is_connect() {
        AiClientError::Network(error.to_string())
    } else {
        AiClientError::Unknown(error.to_string())
    }
}

/// Classify a non-success HTTP status: 429 is rate limiting (with a
/// retry-after hint), other 4xx are API errors, anything else is unknown.
fn classify_error_status(status: StatusCode, body: &str, retry_after: Option<u64>) -> AiClientError {
    let message = serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| truncate(body, 200).to_string());

    match status.as_u16() {
        429 => AiClientError::RateLimit {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        code if (400..500).contains(&code) => AiClientError::Api {
            status: code,
            message,
        },
        code => AiClientError::Unknown(format!("Gemini API Error ({code}): {message}")),
    }
}

fn parse_retry_after(header: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    header?.to_str().ok()?.trim().parse().ok()
}

fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AiConfig {
        AiConfig::new("test-key")
    }

    #[test]
    fn construction_requires_api_key() {
        let result = GeminiClient::new(AiConfig::new(""));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn construction_requires_api_url() {
        let mut config = test_config();
        config.api_url = String::new();
        assert!(matches!(
            GeminiClient::new(config),
            Err(ConfigError::MissingApiUrl)
        ));
    }

    #[test]
    fn model_info_names_provider_and_model() {
        let client = GeminiClient::new(test_config()).unwrap();
        assert_eq!(client.model_info(), "Gemini (gemini-1.5-flash)");
    }

    #[test]
    fn retry_policy_follows_configured_max_retries() {
        let mut config = test_config();
        config.max_retries = 5;
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(client.retry.max_attempts, 5);
    }

    #[test]
    fn request_defaults_applied_when_unset() {
        let client = GeminiClient::new(test_config()).unwrap();
        let wire = client.build_request(&GenerationRequest::new("prompt"));
        let config = wire.generation_config.unwrap();
        assert!((config.temperature - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.max_output_tokens, 1000);
        assert_eq!(config.top_k, 40);
    }

    #[test]
    fn request_overrides_win_over_defaults() {
        let client = GeminiClient::new(test_config()).unwrap();
        let request = GenerationRequest::new("prompt")
            .with_temperature(0.7)
            .with_max_tokens(250);
        let wire = client.build_request(&request);
        let config = wire.generation_config.unwrap();
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.max_output_tokens, 250);
    }

    #[test]
    fn status_429_classifies_as_rate_limit_with_hint() {
        let error = classify_error_status(StatusCode::TOO_MANY_REQUESTS, "{}", Some(30));
        assert!(matches!(
            error,
            AiClientError::RateLimit {
                retry_after_secs: 30
            }
        ));

        let fallback = classify_error_status(StatusCode::TOO_MANY_REQUESTS, "{}", None);
        assert!(matches!(
            fallback,
            AiClientError::RateLimit {
                retry_after_secs: 60
            }
        ));
    }

    #[test]
    fn status_4xx_classifies_as_api_error_with_upstream_message() {
        let body = r#"{"error": {"code": 400, "message": "Invalid argument", "status": "INVALID_ARGUMENT"}}"#;
        let error = classify_error_status(StatusCode::BAD_REQUEST, body, None);
        match error {
            AiClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid argument");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn status_5xx_classifies_as_unknown() {
        let error = classify_error_status(StatusCode::INTERNAL_SERVER_ERROR, "oops", None);
        assert!(matches!(error, AiClientError::Unknown(_)));
    }

    #[test]
    fn unparseable_error_body_is_truncated_verbatim() {
        let long_body = "x".repeat(500);
        let error = classify_error_status(StatusCode::BAD_REQUEST, &long_body, None);
        match error {
            AiClientError::Api { message, .. } => assert_eq!(message.len(), 200),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_header_parses() {
        use reqwest::header::HeaderValue;
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("42"))),
            Some(42)
        );
        assert_eq!(
            parse_retry_after(Some(&HeaderValue::from_static("soon"))),
            None
        );
        assert_eq!(parse_retry_after(None), None);
    }
}
