//! Fixed prompt text and block renderers.
//!
//! The templates are the product's Turkish clinical wording. Renderers emit
//! nothing for blocks with no content, so the builder can drop them instead
//! of producing empty sections.

use crate::types::{Complaint, PatientInfo};

/// System-role preamble for the normal composition path.
pub const SYSTEM_ROLE: &str = "\
Sen deneyimli bir aile hekimisin. Hastalardan gelen şikayetlere göre ön değerlendirme yapıyorsun.
Verdiğin öneriler genel bilgilendirme amaçlıdır ve kesin tanı yerine geçmez.
Her zaman hastayı doktora yönlendirmeyi unutma.";

/// Fixed safety-guidelines block.
pub const SAFETY_GUIDELINES: &str = "\
ÖNEMLİ UYARILAR:
- Kesin tanı koymaya çalışma
- İlaç dozajı belirtme
- Acil durumları tespit et ve hemen doktora yönlendir
- Şüpheli durumlarda \"derhal doktora başvurun\" de";

/// Response-format directive instructing strictly-JSON output.
pub const RESPONSE_FORMAT: &str = r#"YANIT FORMATINI KESİNLİKLE ŞÖYLE VER:

{
  "diagnosis": "Muhtemel tanı ve açıklama",
  "treatment": "Önerilen tedavi yöntemleri",
  "recommendations": "Genel öneriler ve yaşam tarzı tavsiyeleri",
  "followUp": "Takip süreci ve ne zaman doktora başvurmalı"
}

SADECE JSON FORMATINDA YANIT VER, BAŞKA BİR ŞEY YAZMA."#;

/// Safety-first canned directive returned when the complaint matches an
/// emergency indicator. Its four fields are templated, not model-derived.
pub const EMERGENCY_TEMPLATE: &str = r#"BU DURUM ACİL!

{
  "diagnosis": "ACİL DURUM TESPİT EDİLDİ - Derhal değerlendirme gerekli",
  "treatment": "HEMEN EN YAKIN SAĞLIK KURULUŞUNA BAŞVURUN veya 112'yi arayın",
  "recommendations": "Zaman kaybetmeden acil servise gidin",
  "followUp": "Bu durum acil müdahale gerektirmektedir"
}"#;

/// Complaint phrases that short-circuit normal prompt composition.
pub const EMERGENCY_INDICATORS: &[&str] = &[
    "göğüs ağrısı",
    "nefes darlığı",
    "bilinç kaybı",
    "yüksek ateş",
    "şiddetli karın ağrısı",
    "kalp çarpıntısı",
    "felç belirtileri",
    "şiddetli baş ağrısı",
];

/// Case-insensitive substring check against an indicator table.
pub fn is_emergency(complaint: &str, indicators: &[&str]) -> bool {
    let lower = complaint.to_lowercase();
    indicators.iter().any(|indicator| lower.contains(indicator))
}

/// Render the patient-context block. Empty when no field is present.
pub fn patient_context_block(patient: &PatientInfo) -> String {
    let mut lines = Vec::new();

    if let Some(age) = patient.age {
        lines.push(format!("- Yaş: {age}"));
    }
    if let Some(gender) = patient.gender {
        lines.push(format!("- Cinsiyet: {gender}"));
    }
    if let Some(history) = patient
        .medical_history
        .as_deref()
        .filter(|h| !h.trim().is_empty())
    {
        lines.push(format!("- Tıbbi Geçmiş: {history}"));
    }
    if !patient.allergies.is_empty() {
        lines.push(format!("- Alerjiler: {}", patient.allergies.join(", ")));
    }
    if !patient.current_medications.is_empty() {
        lines.push(format!(
            "- Mevcut İlaçlar: {}",
            patient.current_medications.join(", ")
        ));
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("HASTA BİLGİLERİ:\n{}", lines.join("\n"))
}

/// Render the complaint block. The primary complaint is always included.
pub fn complaint_block(complaint: &Complaint) -> String {
    let mut lines = vec![format!("- Ana Şikayet: {}", complaint.primary)];

    if !complaint.symptoms.is_empty() {
        lines.push(format!(
            "- Eşlik Eden Semptomlar: {}",
            complaint.symptoms.join(", ")
        ));
    }
    if let Some(duration) = complaint.duration.as_deref() {
        lines.push(format!("- Süre: {duration}"));
    }
    if let Some(severity) = complaint.severity {
        lines.push(format!("- Şiddet: {}", severity.label()));
    }

    format!("HASTA ŞİKAYETİ:\n{}", lines.join("\n"))
}

/// Render the doctor-notes block. Empty when there are no notes.
pub fn doctor_notes_block(notes: Option<&str>) -> String {
    match notes.filter(|n| !n.trim().is_empty()) {
        Some(notes) => format!("DOKTOR NOTLARI:\n{notes}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gender, Severity};

    #[test]
    fn system_role_redirects_to_doctor() {
        assert!(SYSTEM_ROLE.contains("doktora yönlendirmeyi unutma"));
    }

    #[test]
    fn response_format_demands_strict_json() {
        assert!(RESPONSE_FORMAT.contains("SADECE JSON FORMATINDA"));
        assert!(RESPONSE_FORMAT.contains("\"followUp\""));
    }

    #[test]
    fn emergency_template_contains_all_four_fields() {
        for field in ["diagnosis", "treatment", "recommendations", "followUp"] {
            assert!(
                EMERGENCY_TEMPLATE.contains(&format!("\"{field}\"")),
                "missing field {field}"
            );
        }
        assert!(EMERGENCY_TEMPLATE.contains("112"));
    }

    #[test]
    fn emergency_detection_is_case_insensitive() {
        assert!(is_emergency("göğüs ağrısı var", EMERGENCY_INDICATORS));
        assert!(is_emergency(
            "dünden beri Nefes darlığı yaşıyorum",
            EMERGENCY_INDICATORS
        ));
        assert!(is_emergency("YÜKSEK ATEŞ şikayeti", EMERGENCY_INDICATORS));
        assert!(!is_emergency("hafif boğaz ağrısı", EMERGENCY_INDICATORS));
    }

    #[test]
    fn emergency_detection_uses_given_table() {
        assert!(!is_emergency("göğüs ağrısı", &["baş dönmesi"]));
        assert!(is_emergency("baş dönmesi var", &["baş dönmesi"]));
    }

    #[test]
    fn patient_block_includes_only_present_fields() {
        let patient = PatientInfo {
            age: Some(45),
            gender: Some(Gender::Female),
            medical_history: None,
            allergies: vec!["penisilin".into()],
            current_medications: Vec::new(),
        };
        let block = patient_context_block(&patient);
        assert!(block.starts_with("HASTA BİLGİLERİ:"));
        assert!(block.contains("- Yaş: 45"));
        assert!(block.contains("- Cinsiyet: Kadın"));
        assert!(block.contains("- Alerjiler: penisilin"));
        assert!(!block.contains("Tıbbi Geçmiş"));
        assert!(!block.contains("Mevcut İlaçlar"));
    }

    #[test]
    fn empty_patient_block_is_omitted_entirely() {
        assert_eq!(patient_context_block(&PatientInfo::default()), "");
    }

    #[test]
    fn complaint_block_always_has_primary() {
        let block = complaint_block(&Complaint::new("boğaz ağrısı"));
        assert_eq!(block, "HASTA ŞİKAYETİ:\n- Ana Şikayet: boğaz ağrısı");
    }

    #[test]
    fn complaint_block_renders_severity_label() {
        let mut complaint = Complaint::new("baş ağrısı");
        complaint.severity = Some(Severity::Severe);
        complaint.duration = Some("3 gün".into());
        complaint.symptoms = vec!["bulantı".into(), "ışığa hassasiyet".into()];

        let block = complaint_block(&complaint);
        assert!(block.contains("- Şiddet: Şiddetli"));
        assert!(block.contains("- Süre: 3 gün"));
        assert!(block.contains("- Eşlik Eden Semptomlar: bulantı, ışığa hassasiyet"));
    }

    #[test]
    fn doctor_notes_block_empty_without_notes() {
        assert_eq!(doctor_notes_block(None), "");
        assert_eq!(doctor_notes_block(Some("   ")), "");
        assert_eq!(
            doctor_notes_block(Some("Tansiyon takibi önerilir")),
            "DOKTOR NOTLARI:\nTansiyon takibi önerilir"
        );
    }
}
