//! Report service — the entry point the treatment workflow consumes.
//!
//! `heuristics` derives complaint metadata from free text; `service` gates
//! input, drives the orchestrator and triages the result.

pub mod heuristics;
pub mod service;

pub use heuristics::{ComplaintHeuristics, SeverityRule};
pub use service::{
    ComplaintLimits, ModelCapabilities, ReportRequest, ReportResponse, ReportService,
    TriageThresholds,
};
