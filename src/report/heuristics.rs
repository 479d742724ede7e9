//! Complaint text heuristics.
//!
//! Doctors rarely fill in duration and severity separately — both usually sit
//! inside the complaint text. These tables pull them out. The matching is
//! language-specific; the tables are data, so a deployment for another locale
//! swaps them without touching the pipeline.

use regex::Regex;

use crate::types::Severity;

/// Keyword set mapping to a severity level.
#[derive(Debug, Clone)]
pub struct SeverityRule {
    pub keywords: Vec<String>,
    pub severity: Severity,
}

/// Swappable duration/severity extraction tables.
#[derive(Debug, Clone)]
pub struct ComplaintHeuristics {
    duration_patterns: Vec<Regex>,
    /// Checked in order; the first matching rule wins.
    severity_rules: Vec<SeverityRule>,
}

impl ComplaintHeuristics {
    /// The product's Turkish tables (with the English alternates the clinic's
    /// bilingual staff use).
    pub fn turkish() -> Self {
        let duration_patterns = [
            r"(?i)(\d+)\s*(gün|day)",
            r"(?i)(\d+)\s*(hafta|week)",
            r"(?i)(\d+)\s*(ay|month)",
            r"(?i)(dün|yesterday)",
            r"(?i)(bugün|today)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Invalid duration pattern"))
        .collect();

        let severity_rules = vec![
            SeverityRule {
                keywords: vec!["çok şiddetli".into(), "dayanılmaz".into()],
                severity: Severity::Severe,
            },
            SeverityRule {
                keywords: vec!["şiddetli".into(), "kötü".into()],
                severity: Severity::Moderate,
            },
            SeverityRule {
                keywords: vec!["hafif".into(), "az".into()],
                severity: Severity::Mild,
            },
        ];

        Self {
            duration_patterns,
            severity_rules,
        }
    }

    /// Custom tables, for non-Turkish deployments.
    pub fn new(duration_patterns: Vec<Regex>, severity_rules: Vec<SeverityRule>) -> Self {
        Self {
            duration_patterns,
            severity_rules,
        }
    }

    /// First duration-pattern match in the complaint, verbatim.
    pub fn extract_duration(&self, complaint: &str) -> Option<String> {
        self.duration_patterns
            .iter()
            .find_map(|pattern| pattern.find(complaint))
            .map(|matched| matched.as_str().to_string())
    }

    /// First severity rule whose keyword appears in the complaint.
    pub fn extract_severity(&self, complaint: &str) -> Option<Severity> {
        let lower = complaint.to_lowercase();
        self.severity_rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|keyword| lower.contains(keyword)))
            .map(|rule| rule.severity)
    }
}

impl Default for ComplaintHeuristics {
    fn default() -> Self {
        Self::turkish()
    }
}
