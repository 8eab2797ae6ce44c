use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const TYPE_OF_DOCTORS_MIN_LEN: usize = 2;
pub const TYPE_OF_DOCTORS_MAX_LEN: usize = 255;
pub const DETAILED_ANALYSIS_MIN_LEN: usize = 10;

/// Structured analysis returned by the report analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAnalysis {
    #[serde(deserialize_with = "text_or_joined_list")]
    pub detailed_analysis: String,
    #[serde(deserialize_with = "list_or_single_text")]
    pub precautions: Vec<String>,
    #[serde(deserialize_with = "text_or_joined_list")]
    pub type_of_doctors: String,
    #[serde(deserialize_with = "list_or_single_text")]
    pub predictions: Vec<String>,
}

// Models are told which shape each field takes but do not always comply.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

fn text_or_joined_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrList::deserialize(deserializer)? {
        TextOrList::Text(text) => text,
        TextOrList::List(items) => items.join(", "),
    })
}

fn list_or_single_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrList::deserialize(deserializer)? {
        TextOrList::Text(text) if text.trim().is_empty() => Vec::new(),
        TextOrList::Text(text) => vec![text],
        TextOrList::List(items) => items,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub id: i32,
    pub patient_id: i32,
    pub caretaker_id: i32,
    pub doctor_id: i32,
    pub symptoms: String,
    pub detailed_analysis: String,
    pub precautions: Vec<String>,
    pub type_of_doctors: String,
    pub predictions: Vec<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing projection used by the caretaker and doctor views.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: i32,
    pub patient_id: i32,
    pub detailed_analysis: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&MedicalReport> for ReportSummary {
    fn from(report: &MedicalReport) -> Self {
        Self {
            id: report.id,
            patient_id: report.patient_id,
            detailed_analysis: report.detailed_analysis.clone(),
            verified: report.verified,
            created_at: report.created_at,
        }
    }
}

/// Absent fields decode to their defaults so `validate` can report them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMedicalReport {
    pub patient_id: i32,
    pub caretaker_id: i32,
    pub doctor_id: i32,
    pub symptoms: String,
    pub detailed_analysis: String,
    pub precautions: Vec<String>,
    pub type_of_doctors: String,
    pub predictions: Vec<String>,
    pub verified: bool,
}

pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

impl NewMedicalReport {
    /// Returns every failing field at once, keyed by its wire name.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut fail = |field: &'static str, message: &str| {
            errors.entry(field).or_default().push(message.to_string());
        };

        for (field, id) in [
            ("patientId", self.patient_id),
            ("caretakerId", self.caretaker_id),
            ("doctorId", self.doctor_id),
        ] {
            if id <= 0 {
                fail(field, "Must be a positive integer");
            }
        }
        if self.symptoms.trim().is_empty() {
            fail("symptoms", "Symptoms are required");
        }
        if self.detailed_analysis.trim().chars().count() < DETAILED_ANALYSIS_MIN_LEN {
            fail("detailedAnalysis", "Detailed analysis is required");
        }
        if self.precautions.is_empty() {
            fail("precautions", "At least one precaution is required");
        }
        let doctors_len = self.type_of_doctors.trim().chars().count();
        if doctors_len < TYPE_OF_DOCTORS_MIN_LEN {
            fail("typeOfDoctors", "Type of doctors is required");
        } else if doctors_len > TYPE_OF_DOCTORS_MAX_LEN {
            fail("typeOfDoctors", "Type of doctors cannot exceed 255 characters");
        }
        if self.predictions.is_empty() {
            fail("predictions", "At least one prediction is required");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateReportRequest {
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One earlier exchange, supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
