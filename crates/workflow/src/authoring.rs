use std::sync::Arc;

use domain::prescriptions::{NewPrescriptionBatch, PrescriptionDraft};

use crate::errors::Error;
use crate::records::RecordsApi;
use crate::session::SessionContext;

/// Doctor-side authoring workflow: compose one diagnosis plus one or more
/// medication lines and submit them as a single atomic batch.
pub struct AuthoringWorkflow {
    api: Arc<dyn RecordsApi>,
    draft: PrescriptionDraft,
    submitting: bool,
}

impl AuthoringWorkflow {
    pub fn new(api: Arc<dyn RecordsApi>) -> Self {
        Self {
            api,
            draft: PrescriptionDraft::new(),
            submitting: false,
        }
    }

    pub fn draft(&self) -> &PrescriptionDraft {
        &self.draft
    }

    pub fn set_diagnosis(&mut self, diagnosis: &str) {
        self.draft.diagnosis = diagnosis.to_string();
    }

    pub fn add_line(&mut self) {
        self.draft.add_line();
    }

    pub fn remove_line(&mut self, slot: usize) {
        self.draft.remove_line(slot);
    }

    /// Duplicate names across slots are refused here, at selection time.
    pub fn set_medication(&mut self, slot: usize, name: &str) -> Result<(), Error> {
        Ok(self.draft.set_medication(slot, name)?)
    }

    pub fn set_dosage(&mut self, slot: usize, dosage: &str) -> Result<(), Error> {
        let line = self.line_mut(slot)?;
        line.dosage = dosage.to_string();
        Ok(())
    }

    pub fn set_frequency(&mut self, slot: usize, frequency: &str) -> Result<(), Error> {
        let line = self.line_mut(slot)?;
        line.frequency = frequency.to_string();
        Ok(())
    }

    pub fn set_instructions(&mut self, slot: usize, instructions: &str) -> Result<(), Error> {
        let line = self.line_mut(slot)?;
        line.instructions = instructions.to_string();
        Ok(())
    }

    /// Submit the batch. Gated on a verified patient; validated locally
    /// before any network call. On success the draft is cleared and the
    /// verified patient stays in place so the next prescription needs no
    /// re-verification; on failure the operator's entered data is kept.
    pub async fn submit(&mut self, session: &SessionContext) -> Result<(), Error> {
        let patient = session.require_verified()?;

        if self.submitting {
            return Err(domain::Error::validation("A submission is already in progress").into());
        }
        self.draft.validate()?;

        let batch =
            NewPrescriptionBatch::from_draft(&self.draft, &patient.id, &session.practitioner_id);

        self.submitting = true;
        let result = self.api.create_prescriptions(&batch).await;
        self.submitting = false;

        match result {
            Ok(()) => {
                tracing::info!(
                    patient_id = %batch.patient_id,
                    doctor_id = %batch.doctor_id,
                    medications = batch.medications.len(),
                    "prescription batch created"
                );
                self.draft.clear();
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    patient_id = %batch.patient_id,
                    doctor_id = %batch.doctor_id,
                    error = %err,
                    "prescription batch submission failed"
                );
                Err(err)
            }
        }
    }

    fn line_mut(&mut self, slot: usize) -> Result<&mut domain::prescriptions::MedicationLine, Error> {
        self.draft.lines.get_mut(slot).ok_or_else(|| {
            Error::Validation(domain::Error::NotFound {
                entity: format!("medication line {slot}"),
            })
        })
    }
}
