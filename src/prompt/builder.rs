//! Prompt composition and length validation.

use serde::Serialize;

use super::template;
use crate::types::ClinicalContext;

/// Character budget for a rendered prompt.
pub const MAX_PROMPT_LENGTH: usize = 4000;

/// Outcome of a length check. Reports only — never truncates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PromptValidation {
    pub is_valid: bool,
    pub length: usize,
    pub max_length: usize,
}

/// Build the full treatment prompt for a clinical context.
///
/// A complaint matching an emergency indicator bypasses composition entirely
/// and yields the fixed emergency directive, whatever else the context holds.
pub fn build_treatment_prompt(context: &ClinicalContext) -> String {
    if template::is_emergency(&context.complaint.primary, template::EMERGENCY_INDICATORS) {
        return template::EMERGENCY_TEMPLATE.to_string();
    }
    normal_prompt(context)
}

/// Fixed-order composition: system role, patient context, complaint, doctor
/// notes, safety guidelines, response format. Empty blocks are dropped.
fn normal_prompt(context: &ClinicalContext) -> String {
    let parts = [
        template::SYSTEM_ROLE.to_string(),
        template::patient_context_block(&context.patient),
        template::complaint_block(&context.complaint),
        template::doctor_notes_block(context.doctor_notes.as_deref()),
        template::SAFETY_GUIDELINES.to_string(),
        template::RESPONSE_FORMAT.to_string(),
    ];

    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Check a rendered prompt against the character budget.
pub fn validate_prompt_length(prompt: &str) -> PromptValidation {
    let length = prompt.chars().count();
    PromptValidation {
        is_valid: length <= MAX_PROMPT_LENGTH,
        length,
        max_length: MAX_PROMPT_LENGTH,
    }
}

/// Which sections a prompt would contain. Used by the preview endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PromptSections {
    pub has_patient_info: bool,
    pub has_complaint: bool,
    pub has_doctor_notes: bool,
    pub is_emergency: bool,
}

/// A rendered prompt together with its section map and validation.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPreview {
    pub prompt: String,
    pub sections: PromptSections,
    pub validation: PromptValidation,
}

/// Render a prompt without sending it, for display to the doctor.
pub fn preview_prompt(context: &ClinicalContext) -> PromptPreview {
    let prompt = build_treatment_prompt(context);
    let validation = validate_prompt_length(&prompt);

    PromptPreview {
        sections: PromptSections {
            has_patient_info: !template::patient_context_block(&context.patient).is_empty(),
            has_complaint: !context.complaint.primary.is_empty(),
            has_doctor_notes: context
                .doctor_notes
                .as_deref()
                .is_some_and(|n| !n.trim().is_empty()),
            is_emergency: template::is_emergency(
                &context.complaint.primary,
                template::EMERGENCY_INDICATORS,
            ),
        },
        validation,
        prompt,
    }
}
