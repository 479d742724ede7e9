//! Shared data model for the treatment report pipeline.
//!
//! Everything here is a plain value object: constructed per request, never
//! mutated afterwards. Types that cross the API boundary derive `Serialize`
//! so the backend can hand them to its formatters unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Clinical context
// ═══════════════════════════════════════════════════════════

/// Severity of a patient complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Turkish label used when rendering the complaint block of a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mild => "Hafif",
            Self::Moderate => "Orta",
            Self::Severe => "Şiddetli",
        }
    }
}

/// Patient gender as recorded by the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Erkek"),
            Self::Female => write!(f, "Kadın"),
            Self::Other => write!(f, "Diğer"),
        }
    }
}

/// Demographic and clinical background for the patient. All fields optional —
/// the prompt renderer only emits what is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub medical_history: Option<String>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<String>,
}

/// The complaint driving the report request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    /// Primary complaint text. Always present.
    pub primary: String,
    pub symptoms: Vec<String>,
    /// Free-text duration ("3 gün", "2 hafta", ...).
    pub duration: Option<String>,
    pub severity: Option<Severity>,
}

impl Complaint {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            symptoms: Vec::new(),
            duration: None,
            severity: None,
        }
    }
}

/// Full clinical context a prompt is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalContext {
    pub patient: PatientInfo,
    pub complaint: Complaint,
    pub doctor_notes: Option<String>,
}

impl ClinicalContext {
    /// Context carrying only a complaint, no background.
    pub fn from_complaint(primary: impl Into<String>) -> Self {
        Self {
            patient: PatientInfo::default(),
            complaint: Complaint::new(primary),
            doctor_notes: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Structured report
// ═══════════════════════════════════════════════════════════

/// Structured treatment report extracted from model output.
///
/// The four text fields are the contract the treatment workflow depends on;
/// a report only leaves the parser when all four are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub diagnosis: String,
    pub treatment: String,
    pub recommendations: String,
    #[serde(rename = "followUp")]
    pub follow_up: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Quality tier assigned by response validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportQuality {
    High,
    Medium,
    Low,
}

/// Result of validating a parsed model response.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub quality: ReportQuality,
    pub issues: Vec<String>,
    /// 0..=100.
    pub confidence: u8,
    pub missing_fields: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Triage
// ═══════════════════════════════════════════════════════════

/// Review state a generated report enters on creation.
///
/// The pipeline only ever produces `Generated`, `UnderReview` or `Rejected`;
/// `Approved` is set by a reviewing doctor in the treatment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Generated,
    UnderReview,
    Approved,
    Rejected,
}

impl std::fmt::Display for TriageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::UnderReview => write!(f, "under_review"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Service health
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

/// Snapshot of the upstream AI service's availability.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
