use derive_new::new;
use serde::{Deserialize, Serialize};

use super::draft::{MedicationLine, PrescriptionDraft};

/// One dispensing request targeting a single prescription. The note is
/// validated upstream by the dispensing flow before this is built.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, new)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    pub patient_id: String,
    pub prescription_id: String,
    pub pharmacist_id: String,
    pub note: String,
}

/// A new prescription batch: one diagnosis, one or more medication lines,
/// submitted atomically. The record system assigns prescription ids.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescriptionBatch {
    pub patient_id: String,
    pub doctor_id: String,
    pub diagnosis: String,
    pub medications: Vec<MedicationLine>,
}

impl NewPrescriptionBatch {
    pub fn from_draft(draft: &PrescriptionDraft, patient_id: &str, doctor_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            diagnosis: draft.diagnosis.trim().to_string(),
            medications: draft.lines.clone(),
        }
    }
}
