//! Prompt construction for treatment report generation.
//!
//! `template` holds the fixed Turkish product text and the block renderers;
//! `builder` composes them in fixed order and validates the character budget.

pub mod builder;
pub mod template;

pub use builder::{
    build_treatment_prompt, preview_prompt, validate_prompt_length, PromptPreview,
    PromptSections, PromptValidation, MAX_PROMPT_LENGTH,
};
pub use template::{is_emergency, EMERGENCY_INDICATORS};
