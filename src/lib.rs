//! AI-assisted treatment report pipeline for the Klinik backend.
//!
//! The treatment workflow hands a raw complaint bundle to [`ReportService`];
//! the service validates it, renders a clinical prompt, calls the upstream
//! generation API through a retrying client, parses the semi-structured
//! response into a [`StructuredReport`] and triages it by an independent
//! quality score. The caller persists the result — this crate stores nothing.
//!
//! ```no_run
//! use klinik_ai::{ReportRequest, ReportService};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ReportService::from_env()?;
//! let request = ReportRequest::from_complaint("3 gündür şiddetli baş ağrısı var");
//! let response = service.generate_report(&request).await;
//! println!("{:?} ({}%)", response.ai_status, response.confidence);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod types;

pub use client::{AiClient, AiClientError, GeminiClient, Generation, GenerationRequest};
pub use config::{AiConfig, ConfigError};
pub use orchestrator::{GeneratedReport, ReportFailure, ReportOrchestrator};
pub use report::{ReportRequest, ReportResponse, ReportService};
pub use types::{
    ClinicalContext, ServiceHealth, Severity, StructuredReport, TriageStatus, ValidationOutcome,
};
