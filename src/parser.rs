//! Parsing and validation of model output into a [`StructuredReport`].
//!
//! The model is instructed to answer with strict JSON but does not always
//! comply; extraction tries the whole text, then the first brace-delimited
//! object, then a fenced code block. Nothing is ever guessed — if no JSON is
//! found, parsing fails with an explicit error.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{ReportQuality, StructuredReport, ValidationOutcome};

/// Fields a usable report must carry as non-empty strings.
pub const REQUIRED_FIELDS: [&str; 4] = ["diagnosis", "treatment", "recommendations", "followUp"];

/// Fields shorter than this count as a secondary quality issue.
const MIN_FIELD_LENGTH: usize = 10;

/// Content markers of the templated emergency directive. Emergency output is
/// canned, so its fields are exempt from field-length quality checks.
const EMERGENCY_CONTENT_KEYWORDS: &[&str] = &[
    "acil", "hemen", "112", "ambulans", "hastane", "derhal", "ivedi", "tehlike", "kritik",
];

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid JSON object pattern"));

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("Invalid fenced JSON pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("AI yanıtında geçerli JSON bulunamadı")]
    NoJsonFound,

    #[error("Eksik alanlar: {}", .validation.missing_fields.join(", "))]
    IncompleteReport { validation: ValidationOutcome },
}

/// Parse raw model output into a validated report.
///
/// Missing-field failures carry the full [`ValidationOutcome`] so the caller
/// can log what exactly was wrong with the response.
pub fn parse_report(raw: &str) -> Result<(StructuredReport, ValidationOutcome), ParseError> {
    let value = extract_json(raw).ok_or(ParseError::NoJsonFound)?;

    let validation = validate_report_value(&value);
    if !validation.is_valid {
        return Err(ParseError::IncompleteReport { validation });
    }

    let report = StructuredReport {
        diagnosis: field_string(&value, "diagnosis"),
        treatment: field_string(&value, "treatment"),
        recommendations: field_string(&value, "recommendations"),
        follow_up: field_string(&value, "followUp"),
        warnings: value
            .get("warnings")
            .and_then(Value::as_array)
            .map(|warnings| {
                warnings
                    .iter()
                    .filter_map(|w| w.as_str().map(str::to_string))
                    .collect()
            }),
    };

    Ok((report, validation))
}

/// Extraction order: whole text, first brace-delimited object, fenced block.
/// First successful parse wins.
fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    if let Some(candidate) = JSON_OBJECT.find(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate.as_str()) {
            return Some(value);
        }
    }

    let fenced = FENCED_JSON.captures(text)?;
    serde_json::from_str(fenced.get(1)?.as_str()).ok()
}

/// Validate field presence and quality, scoring confidence in [0, 100]:
/// −25 per missing required field, −10 per secondary issue.
fn validate_report_value(value: &Value) -> ValidationOutcome {
    let mut missing_fields = Vec::new();
    let mut issues = Vec::new();

    for field in REQUIRED_FIELDS {
        let present = value
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|text| !text.trim().is_empty());
        if !present {
            missing_fields.push(field.to_string());
        }
    }

    let diagnosis = value.get("diagnosis").and_then(Value::as_str).unwrap_or("");
    let treatment = value.get("treatment").and_then(Value::as_str).unwrap_or("");

    // Templated emergency output is deliberately terse; skip length checks.
    let emergency = contains_emergency_content(&format!("{diagnosis} {treatment}"));
    if !emergency {
        if !diagnosis.is_empty() && diagnosis.chars().count() < MIN_FIELD_LENGTH {
            issues.push("Tanı çok kısa".to_string());
        }
        if !treatment.is_empty() && treatment.chars().count() < MIN_FIELD_LENGTH {
            issues.push("Tedavi önerisi çok kısa".to_string());
        }
    }

    let quality = if !missing_fields.is_empty() {
        ReportQuality::Low
    } else if !issues.is_empty() {
        ReportQuality::Medium
    } else {
        ReportQuality::High
    };

    let confidence =
        (100i32 - 25 * missing_fields.len() as i32 - 10 * issues.len() as i32).max(0) as u8;

    ValidationOutcome {
        is_valid: missing_fields.is_empty(),
        quality,
        issues,
        confidence,
        missing_fields,
    }
}

fn contains_emergency_content(text: &str) -> bool {
    let lower = text.to_lowercase();
    EMERGENCY_CONTENT_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

fn field_string(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ── Cleaning ────────────────────────────────────────────────

/// Normalize whitespace and quotation marks across every report field.
pub fn clean_report(report: &StructuredReport) -> StructuredReport {
    StructuredReport {
        diagnosis: clean_text(&report.diagnosis),
        treatment: clean_text(&report.treatment),
        recommendations: clean_text(&report.recommendations),
        follow_up: clean_text(&report.follow_up),
        warnings: report
            .warnings
            .as_ref()
            .map(|warnings| warnings.iter().map(|w| clean_text(w)).collect()),
    }
}

/// Collapse whitespace runs to single spaces, trim ends, and normalize curly
/// quote variants to straight quotes. Idempotent.
fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    collapsed
        .trim()
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' => '"',
            other => other,
        })
        .collect()
}

// ── Summary ─────────────────────────────────────────────────

/// Turkish medical vocabulary scanned for the key-topic summary.
const MEDICAL_TOPIC_KEYWORDS: &[&str] = &[
    "ağrı", "ateş", "baş", "karın", "göğüs", "nefes", "kalp", "ilaç", "tedavi", "istirahat",
    "doktor", "kontrol", "test",
];

/// Shape summary of a report, for logging and review screens.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub diagnosis_length: usize,
    pub treatment_length: usize,
    pub has_warnings: bool,
    pub total_length: usize,
    pub key_topics: Vec<String>,
}

pub fn summarize_report(report: &StructuredReport) -> ReportSummary {
    let all_text = format!(
        "{} {} {} {}",
        report.diagnosis, report.treatment, report.recommendations, report.follow_up
    );
    let lower = all_text.to_lowercase();

    ReportSummary {
        diagnosis_length: report.diagnosis.chars().count(),
        treatment_length: report.treatment.chars().count(),
        has_warnings: report
            .warnings
            .as_ref()
            .is_some_and(|warnings| !warnings.is_empty()),
        total_length: all_text.chars().count(),
        key_topics: MEDICAL_TOPIC_KEYWORDS
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_json() -> String {
        serde_json::json!({
            "diagnosis": "Gerilim tipi baş ağrısı olasılığı yüksek",
            "treatment": "İstirahat, bol sıvı ve gerekirse parasetamol",
            "recommendations": "Ekran süresini azaltın, düzenli uyuyun",
            "followUp": "Bir hafta içinde geçmezse doktora başvurun",
            "warnings": ["Ani görme kaybında acil servise gidin"]
        })
        .to_string()
    }

    #[test]
    fn parses_whole_text_json() {
        let (report, validation) = parse_report(&report_json()).unwrap();
        assert!(report.diagnosis.contains("baş ağrısı"));
        assert!(validation.is_valid);
        assert_eq!(validation.quality, ReportQuality::High);
        assert_eq!(validation.confidence, 100);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let text = format!("Elbette, rapor aşağıdadır:\n\n{}\n\nGeçmiş olsun.", report_json());
        let (report, _) = parse_report(&text).unwrap();
        assert!(report.follow_up.contains("doktora"));
    }

    #[test]
    fn parses_json_inside_fenced_code_block() {
        // The stray closing brace after the fence defeats the greedy
        // brace-substring pass, so the fenced pass must succeed.
        let text = format!(
            "Rapor:\n```json\n{}\n```\nNot: format }} içerir.",
            report_json()
        );
        let (report, validation) = parse_report(&text).unwrap();
        assert!(report.treatment.contains("İstirahat"));
        assert!(validation.is_valid);
    }

    #[test]
    fn no_json_reports_explicit_error() {
        let result = parse_report("Üzgünüm, bu konuda yardımcı olamam.");
        match result {
            Err(ParseError::NoJsonFound) => {
                assert_eq!(
                    ParseError::NoJsonFound.to_string(),
                    "AI yanıtında geçerli JSON bulunamadı"
                );
            }
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_named_and_scored() {
        let text = serde_json::json!({
            "diagnosis": "Mevsimsel alerjik rinit bulguları",
            "treatment": "Antihistaminik ve burun spreyi önerilir",
            "recommendations": "Polen saatlerinde dışarı çıkmayın"
        })
        .to_string();

        match parse_report(&text) {
            Err(ParseError::IncompleteReport { validation }) => {
                assert_eq!(validation.missing_fields, vec!["followUp".to_string()]);
                assert_eq!(validation.quality, ReportQuality::Low);
                assert_eq!(validation.confidence, 75);
                assert!(!validation.is_valid);
            }
            other => panic!("expected IncompleteReport, got {other:?}"),
        }
    }

    #[test]
    fn empty_string_field_counts_as_missing() {
        let text = serde_json::json!({
            "diagnosis": "   ",
            "treatment": "Bol sıvı tüketimi ve istirahat",
            "recommendations": "Sigara içilen ortamlardan uzak durun",
            "followUp": "Üç gün içinde kontrole gelin"
        })
        .to_string();

        match parse_report(&text) {
            Err(ParseError::IncompleteReport { validation }) => {
                assert_eq!(validation.missing_fields, vec!["diagnosis".to_string()]);
            }
            other => panic!("expected IncompleteReport, got {other:?}"),
        }
    }

    #[test]
    fn all_fields_missing_floors_confidence_at_zero() {
        match parse_report("{\"unrelated\": true}") {
            Err(ParseError::IncompleteReport { validation }) => {
                assert_eq!(validation.missing_fields.len(), 4);
                assert_eq!(validation.confidence, 0);
            }
            other => panic!("expected IncompleteReport, got {other:?}"),
        }
    }

    #[test]
    fn short_fields_downgrade_to_medium() {
        let text = serde_json::json!({
            "diagnosis": "Soğuk",
            "treatment": "Dinlen",
            "recommendations": "Bol sıvı tüketin ve istirahat edin",
            "followUp": "Bir hafta içinde doktora görünün"
        })
        .to_string();

        let (_, validation) = parse_report(&text).unwrap();
        assert!(validation.is_valid);
        assert_eq!(validation.quality, ReportQuality::Medium);
        assert_eq!(validation.issues.len(), 2);
        assert_eq!(validation.confidence, 80);
    }

    #[test]
    fn emergency_content_skips_field_length_checks() {
        // Emergency template fields are canned; "112" marks them as such.
        let text = serde_json::json!({
            "diagnosis": "ACİL DURUM",
            "treatment": "112'yi ara",
            "recommendations": "Zaman kaybetmeden acil servise gidin",
            "followUp": "Bu durum acil müdahale gerektirmektedir"
        })
        .to_string();

        let (_, validation) = parse_report(&text).unwrap();
        assert!(validation.issues.is_empty());
        assert_eq!(validation.quality, ReportQuality::High);
        assert_eq!(validation.confidence, 100);
    }

    #[test]
    fn clean_collapses_whitespace_and_quotes() {
        let report = StructuredReport {
            diagnosis: "  Muhtemel\n\tgrip   enfeksiyonu  ".into(),
            treatment: "Bol  sıvı".into(),
            recommendations: "\u{201C}İstirahat\u{201D} önerilir".into(),
            follow_up: "Kontrole\r\ngelin".into(),
            warnings: Some(vec!["  Ateş   yükselirse\u{2019}  ".into()]),
        };

        let cleaned = clean_report(&report);
        assert_eq!(cleaned.diagnosis, "Muhtemel grip enfeksiyonu");
        assert_eq!(cleaned.treatment, "Bol sıvı");
        assert_eq!(cleaned.recommendations, "\"İstirahat\" önerilir");
        assert_eq!(cleaned.follow_up, "Kontrole gelin");
        assert_eq!(cleaned.warnings.unwrap()[0], "Ateş yükselirse\"");
    }

    #[test]
    fn clean_is_idempotent() {
        let (report, _) = parse_report(&report_json()).unwrap();
        let once = clean_report(&report);
        let twice = clean_report(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn summary_counts_and_topics() {
        let (report, _) = parse_report(&report_json()).unwrap();
        let summary = summarize_report(&report);

        assert!(summary.has_warnings);
        assert_eq!(
            summary.diagnosis_length,
            report.diagnosis.chars().count()
        );
        assert!(summary.key_topics.contains(&"baş".to_string()));
        assert!(summary.key_topics.contains(&"doktor".to_string()));
        assert!(!summary.key_topics.contains(&"karın".to_string()));
    }
}
