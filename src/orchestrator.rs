//! Treatment report orchestration.
//!
//! Sequences prompt building, the AI client call and response parsing, and
//! turns every failure mode into a structured result the service layer can
//! hand to the treatment workflow. The AI client is a single shared handle,
//! initialized at most once; holding no per-request state, it is safe to use
//! from concurrent callers.

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::client::{
    service_status, AiClient, AiClientError, GeminiClient, GenerationRequest,
};
use crate::config::{AiConfig, ConfigError};
use crate::parser::{clean_report, parse_report};
use crate::prompt::{build_treatment_prompt, validate_prompt_length};
use crate::types::{ClinicalContext, HealthStatus, ServiceHealth, StructuredReport};

/// Diagnosis vocabulary that demands an accompanying warnings list.
pub const RISKY_DIAGNOSIS_KEYWORDS: &[&str] = &[
    "şiddetli", "kronik", "ciddi", "tehlikeli", "acil", "hemen", "derhal",
];

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Generation parameters and batch pacing.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Pause between sequential batch items, to respect upstream rate limits.
    pub batch_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            batch_delay: Duration::from_millis(1000),
        }
    }
}

/// Timing and shape metadata gathered while generating a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub processing_time_ms: u64,
    pub prompt_length: usize,
    pub response_length: usize,
    /// Parser confidence, 0..=100.
    pub confidence: u8,
    pub model: String,
}

/// A parsed, cleaned report with its generation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub report: StructuredReport,
    pub metadata: ReportMetadata,
}

/// Structured pipeline failure. Timing metadata is attached when the failure
/// happened after the clock started ticking against the upstream service.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ReportFailure {
    pub message: String,
    pub metadata: Option<ReportMetadata>,
}

impl ReportFailure {
    /// Failure before any upstream work — no metadata to attach.
    fn early(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            metadata: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("AI Client initialization failed: {0}")]
    Initialization(String),
}

/// One item of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: Result<GeneratedReport, ReportFailure>,
}

type ClientFactory<C> = Box<dyn Fn() -> Result<C, ConfigError> + Send + Sync>;

// ═══════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════

/// Pipeline driver: prompt → length gate → client → parse → clean.
pub struct ReportOrchestrator<C: AiClient = GeminiClient> {
    client: OnceCell<C>,
    factory: Option<ClientFactory<C>>,
    settings: OrchestratorSettings,
}

impl ReportOrchestrator<GeminiClient> {
    /// Lazy construction: the config is captured now, the client is built and
    /// validated on first use.
    pub fn from_config(config: AiConfig) -> Self {
        Self {
            client: OnceCell::new(),
            factory: Some(Box::new(move || GeminiClient::new(config.clone()))),
            settings: OrchestratorSettings::default(),
        }
    }

    /// Lazy construction from `GEMINI_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::from_config(AiConfig::from_env()?))
    }
}

impl<C: AiClient> ReportOrchestrator<C> {
    /// Explicit injection of an already-constructed client.
    pub fn with_client(client: C) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            factory: None,
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The shared client handle, initializing it on first use.
    async fn client(&self) -> Result<&C, OrchestratorError> {
        self.client
            .get_or_try_init(|| async {
                let factory = self.factory.as_ref().ok_or_else(|| {
                    OrchestratorError::Initialization("no AI client configured".into())
                })?;
                factory().map_err(|e| OrchestratorError::Initialization(e.to_string()))
            })
            .await
    }

    /// Generate a treatment report for a clinical context.
    pub async fn generate_treatment_report(
        &self,
        context: &ClinicalContext,
    ) -> Result<GeneratedReport, ReportFailure> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        let prompt = build_treatment_prompt(context);
        let prompt_validation = validate_prompt_length(&prompt);
        if !prompt_validation.is_valid {
            return Err(ReportFailure::early(format!(
                "Prompt çok uzun: {}/{} karakter",
                prompt_validation.length, prompt_validation.max_length
            )));
        }

        let client = match self.client().await {
            Ok(client) => client,
            Err(error) => return Err(ReportFailure::early(error.to_string())),
        };

        tracing::info!(
            %request_id,
            prompt_chars = prompt_validation.length,
            "generating treatment report"
        );

        let request = GenerationRequest::new(prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let generation = match client.generate_content(&request).await {
            Ok(generation) => generation,
            Err(error) => {
                tracing::warn!(%request_id, error = %error, "generation failed");
                return Err(ReportFailure {
                    message: user_facing_error(&error),
                    metadata: Some(ReportMetadata {
                        processing_time_ms: started.elapsed().as_millis() as u64,
                        prompt_length: prompt_validation.length,
                        response_length: 0,
                        confidence: 0,
                        model: client.model_info(),
                    }),
                });
            }
        };

        let response_length = generation.text.chars().count();
        let (report, validation) = match parse_report(&generation.text) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(%request_id, error = %error, "model response failed to parse");
                return Err(ReportFailure {
                    message: error.to_string(),
                    metadata: Some(ReportMetadata {
                        processing_time_ms: started.elapsed().as_millis() as u64,
                        prompt_length: prompt_validation.length,
                        response_length,
                        confidence: 0,
                        model: client.model_info(),
                    }),
                });
            }
        };

        let metadata = ReportMetadata {
            processing_time_ms: started.elapsed().as_millis() as u64,
            prompt_length: prompt_validation.length,
            response_length,
            confidence: validation.confidence,
            model: client.model_info(),
        };

        tracing::info!(
            %request_id,
            elapsed_ms = metadata.processing_time_ms,
            confidence = metadata.confidence,
            "treatment report generated"
        );

        Ok(GeneratedReport {
            report: clean_report(&report),
            metadata,
        })
    }

    /// Probe the AI service. Initialization failure reports as unhealthy
    /// rather than erroring.
    pub async fn check_health(&self) -> ServiceHealth {
        match self.client().await {
            Ok(client) => service_status(client).await,
            Err(error) => ServiceHealth {
                status: HealthStatus::Unhealthy,
                last_checked: chrono::Utc::now(),
                response_time_ms: None,
                error: Some(error.to_string()),
            },
        }
    }

    /// Generate reports for several contexts, strictly sequentially with a
    /// pause between items.
    pub async fn generate_batch(&self, contexts: &[ClinicalContext]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(contexts.len());

        for (index, context) in contexts.iter().enumerate() {
            let result = self.generate_treatment_report(context).await;
            outcomes.push(BatchOutcome { index, result });

            if index + 1 < contexts.len() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        outcomes
    }
}

/// Map a classified client error to the message shown to clinic staff.
fn user_facing_error(error: &AiClientError) -> String {
    match error {
        AiClientError::RateLimit { .. } => {
            "AI servisi rate limit aşıldı, lütfen daha sonra tekrar deneyin".to_string()
        }
        AiClientError::Network(_) => {
            "AI servisine bağlanılamıyor, internet bağlantınızı kontrol edin".to_string()
        }
        AiClientError::Timeout(_) => {
            "AI servisi çok yavaş yanıt veriyor, lütfen tekrar deneyin".to_string()
        }
        AiClientError::Api { .. } | AiClientError::Unknown(_) => {
            format!("AI servisi hatası: {error}")
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Quality evaluation
// ═══════════════════════════════════════════════════════════

/// Rule-based quality verdict, independent of the parser's confidence.
#[derive(Debug, Clone, Serialize)]
pub struct QualityEvaluation {
    /// 0..=100.
    pub score: u8,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Score a report post hoc: short diagnosis or treatment, a follow-up without
/// a doctor referral, and risk-indicating diagnosis vocabulary without an
/// accompanying warnings list all deduct points.
pub fn evaluate_quality(report: &StructuredReport) -> QualityEvaluation {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut score = 100i32;

    if report.diagnosis.chars().count() < 20 {
        issues.push("Tanı çok kısa".to_string());
        suggestions.push("Daha detaylı tanı açıklaması ekleyin".to_string());
        score -= 20;
    }

    if report.treatment.chars().count() < 20 {
        issues.push("Tedavi önerisi çok kısa".to_string());
        suggestions.push("Tedavi seçeneklerini genişletin".to_string());
        score -= 20;
    }

    if !report.follow_up.contains("doktor") {
        issues.push("Doktor kontrolü önerisi eksik".to_string());
        suggestions.push("Takip için doktor kontrolü önerin".to_string());
        score -= 15;
    }

    let has_warnings = report
        .warnings
        .as_ref()
        .is_some_and(|warnings| !warnings.is_empty());
    if !has_warnings && contains_risky_keywords(&report.diagnosis) {
        issues.push("Risk belirtileri var ama uyarı yok".to_string());
        suggestions.push("Güvenlik uyarısı ekleyin".to_string());
        score -= 25;
    }

    QualityEvaluation {
        score: score.max(0) as u8,
        issues,
        suggestions,
    }
}

fn contains_risky_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    RISKY_DIAGNOSIS_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}
