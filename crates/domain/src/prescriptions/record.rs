use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Prescription lifecycle status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Issued and awaiting dispensing
    Active,
    /// Recorded but not yet active (default for unknown wire values)
    Pending,
    /// Patient identity confirmed against the prescription
    Verified,
    /// Fulfilled by a pharmacist - terminal
    Dispensed,
    /// Withdrawn by an administrative action - terminal
    Revoked,
    /// Refused by the record system - terminal
    Rejected,
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl PrescriptionStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Dispensed | Self::Revoked | Self::Rejected)
    }

    pub fn is_dispensable(self) -> bool {
        !self.is_terminal()
    }

    /// Parse a wire status, tolerating arbitrary casing and the
    /// `Completed` alias some responses use for `Dispensed`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "verified" => Self::Verified,
            "dispensed" | "completed" => Self::Dispensed,
            "revoked" => Self::Revoked,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Dispensed => "dispensed",
            Self::Revoked => "revoked",
            Self::Rejected => "rejected",
        }
    }
}

/// Canonical prescription record, one medication line per record.
///
/// The dispensing fields are populated exactly once, by a successful
/// dispensing transition; they are `None` in every other state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub instructions: String,
    pub diagnosis: String,
    pub status: PrescriptionStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,

    pub dispensed_by: Option<String>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub dispensing_note: Option<String>,
    pub transaction_id: Option<String>,
}

impl Prescription {
    /// Record a successful dispensing. Refused once the record is terminal.
    pub fn mark_dispensed(
        &mut self,
        pharmacist_id: &str,
        note: &str,
        transaction_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.validate_transition(PrescriptionStatus::Dispensed)?;
        self.status = PrescriptionStatus::Dispensed;
        self.dispensed_by = Some(pharmacist_id.to_string());
        self.dispensed_at = Some(at);
        self.dispensing_note = Some(note.to_string());
        self.transaction_id = transaction_id;
        Ok(())
    }

    /// Administrative revoke. Refused once the record is terminal.
    pub fn revoke(&mut self) -> Result<(), Error> {
        self.validate_transition(PrescriptionStatus::Revoked)?;
        self.status = PrescriptionStatus::Revoked;
        Ok(())
    }

    fn validate_transition(&self, to: PrescriptionStatus) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(id: &str) -> Prescription {
        Prescription {
            id: id.to_string(),
            status: PrescriptionStatus::Active,
            ..Default::default()
        }
    }

    #[test]
    fn dispense_from_active() {
        let mut rx = active("rx001");
        rx.mark_dispensed("ph1", "picked up in person", Some("0xabc".into()), Utc::now())
            .unwrap();

        assert_eq!(rx.status, PrescriptionStatus::Dispensed);
        assert_eq!(rx.dispensed_by.as_deref(), Some("ph1"));
        assert_eq!(rx.transaction_id.as_deref(), Some("0xabc"));
    }

    #[test]
    fn terminal_statuses_refuse_further_transitions() {
        for status in [
            PrescriptionStatus::Dispensed,
            PrescriptionStatus::Revoked,
            PrescriptionStatus::Rejected,
        ] {
            let mut rx = active("rx001");
            rx.status = status;

            let err = rx.mark_dispensed("ph1", "note", None, Utc::now()).unwrap_err();
            assert!(matches!(err, Error::InvalidStateTransition { .. }));
            assert_eq!(rx.status, status);

            assert!(rx.revoke().is_err());
        }
    }

    #[test]
    fn revoke_from_pending() {
        let mut rx = active("rx001");
        rx.status = PrescriptionStatus::Pending;
        rx.revoke().unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Revoked);
    }

    #[test]
    fn wire_status_parsing() {
        assert_eq!(PrescriptionStatus::from_wire("Active"), PrescriptionStatus::Active);
        assert_eq!(PrescriptionStatus::from_wire("completed"), PrescriptionStatus::Dispensed);
        assert_eq!(PrescriptionStatus::from_wire("DISPENSED"), PrescriptionStatus::Dispensed);
        assert_eq!(PrescriptionStatus::from_wire("something else"), PrescriptionStatus::Pending);
    }
}
