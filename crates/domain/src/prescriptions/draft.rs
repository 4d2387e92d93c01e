use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::selection::selected_elsewhere;

/// One medication line within a draft prescription batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq, new)]
pub struct MedicationLine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
}

impl MedicationLine {
    fn validate(&self, slot: usize) -> Result<(), Error> {
        for (value, field) in [
            (&self.name, "medication name"),
            (&self.dosage, "dosage"),
            (&self.frequency, "frequency"),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Medication line {}: {} is required",
                    slot + 1,
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Doctor-side draft: one diagnosis, one or more medication lines,
/// submitted atomically. Prescription ids are assigned by the record
/// system, never here.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PrescriptionDraft {
    pub diagnosis: String,
    pub lines: Vec<MedicationLine>,
}

impl Default for PrescriptionDraft {
    fn default() -> Self {
        Self {
            diagnosis: String::new(),
            lines: vec![MedicationLine::default()],
        }
    }
}

impl PrescriptionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self) {
        self.lines.push(MedicationLine::default());
    }

    pub fn remove_line(&mut self, slot: usize) {
        if slot < self.lines.len() && self.lines.len() > 1 {
            self.lines.remove(slot);
        }
    }

    /// Assign a medication name to a slot, refusing a name already held
    /// by a different slot. Refusal leaves the slot unchanged.
    pub fn set_medication(&mut self, slot: usize, name: &str) -> Result<(), Error> {
        if slot >= self.lines.len() {
            return Err(Error::NotFound {
                entity: format!("medication line {slot}"),
            });
        }

        let names: Vec<&str> = self.lines.iter().map(|l| l.name.as_str()).collect();
        if selected_elsewhere(&names, name, slot) {
            return Err(Error::DuplicateMedication {
                name: name.trim().to_string(),
            });
        }

        self.lines[slot].name = name.trim().to_string();
        Ok(())
    }

    /// Full pre-submission validation: diagnosis present, every line
    /// complete, no medication repeated across lines.
    pub fn validate(&self) -> Result<(), Error> {
        if self.diagnosis.trim().is_empty() {
            return Err(Error::validation("A diagnosis is required"));
        }
        if self.lines.is_empty() {
            return Err(Error::validation("At least one medication is required"));
        }

        for (slot, line) in self.lines.iter().enumerate() {
            line.validate(slot)?;

            let names: Vec<&str> = self.lines.iter().map(|l| l.name.as_str()).collect();
            if selected_elsewhere(&names, &line.name, slot) {
                return Err(Error::DuplicateMedication {
                    name: line.name.trim().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Reset to a single empty line after a successful submission.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_line(name: &str) -> MedicationLine {
        MedicationLine::new(
            name.to_string(),
            "500mg".to_string(),
            "twice daily".to_string(),
            "after meals".to_string(),
        )
    }

    fn valid_draft() -> PrescriptionDraft {
        PrescriptionDraft {
            diagnosis: "Sinusitis".to_string(),
            lines: vec![complete_line("Amoxicillin"), complete_line("Ibuprofen")],
        }
    }

    #[test]
    fn valid_draft_passes() {
        valid_draft().validate().unwrap();
    }

    #[test]
    fn empty_diagnosis_is_refused() {
        let mut draft = valid_draft();
        draft.diagnosis = "  ".to_string();
        assert!(matches!(draft.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn incomplete_line_is_refused() {
        let mut draft = valid_draft();
        draft.lines[1].dosage = String::new();
        assert!(matches!(draft.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn duplicate_name_refused_at_selection_time() {
        let mut draft = valid_draft();
        let err = draft.set_medication(1, "amoxicillin").unwrap_err();
        assert!(matches!(err, Error::DuplicateMedication { .. }));
        // Slot 1 keeps what it had.
        assert_eq!(draft.lines[1].name, "Ibuprofen");
    }

    #[test]
    fn reassigning_own_slot_is_allowed() {
        let mut draft = valid_draft();
        draft.set_medication(0, "Amoxicillin").unwrap();
        draft.set_medication(0, "Paracetamol").unwrap();
        assert_eq!(draft.lines[0].name, "Paracetamol");
    }

    #[test]
    fn duplicate_across_lines_caught_at_validation_too() {
        let mut draft = valid_draft();
        draft.lines[1].name = "Amoxicillin".to_string();
        assert!(matches!(
            draft.validate(),
            Err(Error::DuplicateMedication { .. })
        ));
    }

    #[test]
    fn last_line_cannot_be_removed() {
        let mut draft = PrescriptionDraft::new();
        draft.remove_line(0);
        assert_eq!(draft.lines.len(), 1);
    }

    #[test]
    fn clear_resets_to_one_empty_line() {
        let mut draft = valid_draft();
        draft.clear();
        assert_eq!(draft, PrescriptionDraft::default());
    }
}
