//! The report service: input gate, context assembly, triage.
//!
//! This is the only surface the treatment workflow calls. It never panics and
//! never returns a bare error — every outcome is a [`ReportResponse`] with an
//! `ai_status` the workflow persists alongside the report fields.

use serde::{Deserialize, Serialize};

use super::heuristics::ComplaintHeuristics;
use crate::client::{AiClient, GeminiClient};
use crate::config::{AiConfig, ConfigError};
use crate::orchestrator::{
    evaluate_quality, BatchOutcome, ReportOrchestrator,
};
use crate::types::{
    ClinicalContext, Complaint, Gender, PatientInfo, ServiceHealth, StructuredReport, TriageStatus,
};

/// Raw input bundle from the treatment workflow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    pub patient_complaint: String,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<Gender>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub medical_history: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    pub doctor_notes: Option<String>,
}

impl ReportRequest {
    pub fn from_complaint(complaint: impl Into<String>) -> Self {
        Self {
            patient_complaint: complaint.into(),
            ..Self::default()
        }
    }
}

/// What the workflow persists: report fields, triage status, confidence.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub ai_response: Option<StructuredReport>,
    pub ai_status: TriageStatus,
    pub processing_time_ms: u64,
    /// 0..=100, from the post-hoc quality evaluation.
    pub confidence: u8,
    pub error: Option<String>,
}

impl ReportResponse {
    fn rejected(error: String, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            ai_response: None,
            ai_status: TriageStatus::Rejected,
            processing_time_ms,
            confidence: 0,
            error: Some(error),
        }
    }
}

/// Confidence cut-offs for the automated trust gate.
#[derive(Debug, Clone, Copy)]
pub struct TriageThresholds {
    /// At or above: surfaced as generated.
    pub generated: u8,
    /// At or above (but below `generated`): queued for review.
    pub under_review: u8,
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self {
            generated: 80,
            under_review: 60,
        }
    }
}

/// Complaint length bounds and the blocked-phrase table.
#[derive(Debug, Clone)]
pub struct ComplaintLimits {
    pub min_chars: usize,
    pub max_chars: usize,
    pub blocked_phrases: Vec<String>,
}

impl Default for ComplaintLimits {
    fn default() -> Self {
        Self {
            min_chars: 5,
            max_chars: 2000,
            blocked_phrases: vec!["öldür".into(), "zarar ver".into(), "intihara".into()],
        }
    }
}

/// Capability descriptor shown in the clinic UI.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCapabilities {
    pub model: &'static str,
    pub version: &'static str,
    pub capabilities: &'static [&'static str],
}

// ═══════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════

/// Externally consumed entry point of the pipeline.
pub struct ReportService<C: AiClient = GeminiClient> {
    orchestrator: ReportOrchestrator<C>,
    heuristics: ComplaintHeuristics,
    thresholds: TriageThresholds,
    limits: ComplaintLimits,
}

impl ReportService<GeminiClient> {
    pub fn from_config(config: AiConfig) -> Self {
        Self::new(ReportOrchestrator::from_config(config))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ReportOrchestrator::from_env()?))
    }
}

impl<C: AiClient> ReportService<C> {
    pub fn new(orchestrator: ReportOrchestrator<C>) -> Self {
        Self {
            orchestrator,
            heuristics: ComplaintHeuristics::default(),
            thresholds: TriageThresholds::default(),
            limits: ComplaintLimits::default(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: ComplaintHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_thresholds(mut self, thresholds: TriageThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_limits(mut self, limits: ComplaintLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Generate a report for a raw request.
    ///
    /// Input violations reject immediately, before any AI call. A successful
    /// generation is triaged by the independent quality score; `success` stays
    /// true even when triage rejects, since generation itself worked.
    pub async fn generate_report(&self, request: &ReportRequest) -> ReportResponse {
        if let Err(message) = self.validate_input(request) {
            tracing::debug!(error = %message, "report request rejected at input gate");
            return ReportResponse::rejected(message, 0);
        }

        let context = self.build_context(request);

        let generated = match self.orchestrator.generate_treatment_report(&context).await {
            Ok(generated) => generated,
            Err(failure) => {
                let elapsed = failure
                    .metadata
                    .as_ref()
                    .map(|metadata| metadata.processing_time_ms)
                    .unwrap_or(0);
                return ReportResponse::rejected(failure.message, elapsed);
            }
        };

        let quality = evaluate_quality(&generated.report);
        let ai_status = self.triage(quality.score);

        tracing::info!(
            confidence = quality.score,
            status = %ai_status,
            "treatment report triaged"
        );

        ReportResponse {
            success: true,
            ai_response: Some(generated.report),
            ai_status,
            processing_time_ms: generated.metadata.processing_time_ms,
            confidence: quality.score,
            error: None,
        }
    }

    /// Delegate the health probe to the orchestrator.
    pub async fn check_health(&self) -> ServiceHealth {
        self.orchestrator.check_health().await
    }

    /// Build contexts for all requests and run them as a sequential batch.
    pub async fn generate_batch(&self, requests: &[ReportRequest]) -> Vec<BatchOutcome> {
        let contexts: Vec<ClinicalContext> = requests
            .iter()
            .map(|request| self.build_context(request))
            .collect();
        self.orchestrator.generate_batch(&contexts).await
    }

    /// Static capability descriptor for client display.
    pub fn model_capabilities() -> ModelCapabilities {
        ModelCapabilities {
            model: "Google Gemini",
            version: "1.5-flash",
            capabilities: &[
                "Tedavi önerisi",
                "Tanı desteği",
                "Takip önerisi",
                "Genel sağlık tavsiyeleri",
            ],
        }
    }

    fn validate_input(&self, request: &ReportRequest) -> Result<(), String> {
        let complaint = request.patient_complaint.trim();

        if complaint.chars().count() < self.limits.min_chars {
            return Err(format!(
                "Hasta şikayeti en az {} karakter olmalıdır",
                self.limits.min_chars
            ));
        }

        if request.patient_complaint.chars().count() > self.limits.max_chars {
            return Err(format!(
                "Hasta şikayeti çok uzun (max {} karakter)",
                self.limits.max_chars
            ));
        }

        let lower = complaint.to_lowercase();
        if self
            .limits
            .blocked_phrases
            .iter()
            .any(|phrase| lower.contains(phrase))
        {
            return Err("Uygunsuz içerik tespit edildi".to_string());
        }

        Ok(())
    }

    /// Assemble the clinical context, deriving duration and severity from the
    /// complaint text.
    fn build_context(&self, request: &ReportRequest) -> ClinicalContext {
        ClinicalContext {
            patient: PatientInfo {
                age: request.patient_age,
                gender: request.patient_gender,
                medical_history: request.medical_history.clone(),
                allergies: request.allergies.clone(),
                current_medications: request.current_medications.clone(),
            },
            complaint: Complaint {
                primary: request.patient_complaint.clone(),
                symptoms: request.symptoms.clone(),
                duration: self.heuristics.extract_duration(&request.patient_complaint),
                severity: self.heuristics.extract_severity(&request.patient_complaint),
            },
            doctor_notes: request.doctor_notes.clone(),
        }
    }

    fn triage(&self, confidence: u8) -> TriageStatus {
        if confidence >= self.thresholds.generated {
            TriageStatus::Generated
        } else if confidence >= self.thresholds.under_review {
            TriageStatus::UnderReview
        } else {
            TriageStatus::Rejected
        }
    }
}
