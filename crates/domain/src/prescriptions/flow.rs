use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::selection::MedicationSelectionSet;

/// Dispensing workflow state machine.
///
/// One flow instance lives for one dispensing modal/session:
///
/// `Idle → Selecting → Confirming → Submitting → {Succeeded | PartiallyFailed | Failed}`
///
/// Confirming may return to Selecting for revisions; every other illegal
/// transition is refused with `InvalidStateTransition`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DispenseFlow {
    #[default]
    Idle,
    Selecting {
        selection: MedicationSelectionSet,
    },
    Confirming {
        selection: MedicationSelectionSet,
        note: String,
    },
    Submitting {
        selection: MedicationSelectionSet,
        note: String,
    },
    Succeeded {
        dispensed: usize,
    },
    PartiallyFailed {
        dispensed: usize,
        failed: usize,
    },
    Failed {
        failed: usize,
    },
}

impl DispenseFlow {
    /// Open the workflow. Requires at least one dispensable prescription;
    /// the verified-patient gate is enforced by the coordinator before
    /// this is reached.
    pub fn begin(&mut self, dispensable: usize) -> Result<(), Error> {
        match self {
            Self::Idle | Self::Succeeded { .. } | Self::PartiallyFailed { .. } | Self::Failed { .. } => {
                if dispensable == 0 {
                    return Err(Error::validation(
                        "No active prescriptions available to dispense",
                    ));
                }
                *self = Self::Selecting {
                    selection: MedicationSelectionSet::new(),
                };
                Ok(())
            }
            _ => Err(self.refused("selecting")),
        }
    }

    /// Toggle a medication while selecting.
    pub fn toggle(&mut self, name: &str) -> Result<bool, Error> {
        match self {
            Self::Selecting { selection } => Ok(selection.toggle(name)),
            _ => Err(self.refused("selecting")),
        }
    }

    /// Move to the review step. Pure transition, no side effect.
    pub fn confirm(&mut self) -> Result<(), Error> {
        match self {
            Self::Selecting { selection } => {
                if selection.is_empty() {
                    return Err(Error::validation("No medications selected"));
                }
                *self = Self::Confirming {
                    selection: std::mem::take(selection),
                    note: String::new(),
                };
                Ok(())
            }
            _ => Err(self.refused("confirming")),
        }
    }

    /// Return from review to selection, keeping the working set.
    pub fn revise(&mut self) -> Result<(), Error> {
        match self {
            Self::Confirming { selection, .. } => {
                *self = Self::Selecting {
                    selection: std::mem::take(selection),
                };
                Ok(())
            }
            _ => Err(self.refused("selecting")),
        }
    }

    /// Record the mandatory dispensing note while reviewing.
    pub fn set_note(&mut self, value: &str) -> Result<(), Error> {
        match self {
            Self::Confirming { note, .. } => {
                *note = value.to_string();
                Ok(())
            }
            _ => Err(self.refused("confirming")),
        }
    }

    /// The last local validation gate: the note must be non-empty after
    /// trimming. Returns the selection and note the coordinator submits.
    pub fn begin_submit(&mut self) -> Result<(MedicationSelectionSet, String), Error> {
        match self {
            Self::Confirming { selection, note } => {
                let trimmed = note.trim();
                if trimmed.is_empty() {
                    return Err(Error::validation("A dispensing note is required"));
                }
                let selection = std::mem::take(selection);
                let note = trimmed.to_string();
                *self = Self::Submitting {
                    selection: selection.clone(),
                    note: note.clone(),
                };
                Ok((selection, note))
            }
            _ => Err(self.refused("submitting")),
        }
    }

    /// Settle the aggregate outcome once every item has resolved.
    pub fn finish(&mut self, dispensed: usize, failed: usize) -> Result<(), Error> {
        match self {
            Self::Submitting { .. } => {
                *self = match (dispensed, failed) {
                    (0, failed) => Self::Failed { failed },
                    (dispensed, 0) => Self::Succeeded { dispensed },
                    (dispensed, failed) => Self::PartiallyFailed { dispensed, failed },
                };
                Ok(())
            }
            _ => Err(self.refused("finished")),
        }
    }

    /// Discard local state. An in-flight request is never aborted by
    /// cancellation; its eventual result still drives a catalog refetch.
    pub fn cancel(&mut self) {
        *self = Self::Idle;
    }

    pub fn selection(&self) -> Option<&MedicationSelectionSet> {
        match self {
            Self::Selecting { selection }
            | Self::Confirming { selection, .. }
            | Self::Submitting { selection, .. } => Some(selection),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selecting { .. } => "selecting",
            Self::Confirming { .. } => "confirming",
            Self::Submitting { .. } => "submitting",
            Self::Succeeded { .. } => "succeeded",
            Self::PartiallyFailed { .. } => "partially_failed",
            Self::Failed { .. } => "failed",
        }
    }

    fn refused(&self, to: &str) -> Error {
        Error::InvalidStateTransition {
            from: self.name().to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_in_confirming() -> DispenseFlow {
        let mut flow = DispenseFlow::default();
        flow.begin(2).unwrap();
        flow.toggle("Amoxicillin").unwrap();
        flow.confirm().unwrap();
        flow
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let mut flow = flow_in_confirming();
        flow.set_note("collected at counter").unwrap();
        let (selection, note) = flow.begin_submit().unwrap();

        assert_eq!(selection.drugs(), ["Amoxicillin"]);
        assert_eq!(note, "collected at counter");
        assert_eq!(flow.name(), "submitting");

        flow.finish(1, 0).unwrap();
        assert_eq!(flow, DispenseFlow::Succeeded { dispensed: 1 });
    }

    #[test]
    fn begin_requires_a_dispensable_prescription() {
        let mut flow = DispenseFlow::default();
        let err = flow.begin(0).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(flow, DispenseFlow::Idle);
    }

    #[test]
    fn confirm_requires_nonempty_selection() {
        let mut flow = DispenseFlow::default();
        flow.begin(1).unwrap();
        assert!(flow.confirm().is_err());
        assert_eq!(flow.name(), "selecting");
    }

    #[test]
    fn whitespace_note_is_refused_before_submit() {
        let mut flow = flow_in_confirming();
        flow.set_note("   ").unwrap();
        let err = flow.begin_submit().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        // Still reviewing; nothing was submitted.
        assert_eq!(flow.name(), "confirming");
    }

    #[test]
    fn revise_returns_selection_for_edits() {
        let mut flow = flow_in_confirming();
        flow.revise().unwrap();
        assert_eq!(flow.name(), "selecting");
        flow.toggle("Ibuprofen").unwrap();
        assert_eq!(flow.selection().unwrap().len(), 2);
    }

    #[test]
    fn illegal_transitions_are_refused() {
        let mut flow = DispenseFlow::default();
        assert!(flow.confirm().is_err());
        assert!(flow.begin_submit().is_err());
        assert!(flow.finish(1, 0).is_err());
        assert!(flow.toggle("Amoxicillin").is_err());
        assert_eq!(flow, DispenseFlow::Idle);
    }

    #[test]
    fn aggregate_outcomes_by_counts() {
        for (dispensed, failed, expected) in [
            (3, 0, DispenseFlow::Succeeded { dispensed: 3 }),
            (2, 1, DispenseFlow::PartiallyFailed { dispensed: 2, failed: 1 }),
            (0, 2, DispenseFlow::Failed { failed: 2 }),
        ] {
            let mut flow = flow_in_confirming();
            flow.set_note("note").unwrap();
            flow.begin_submit().unwrap();
            flow.finish(dispensed, failed).unwrap();
            assert_eq!(flow, expected);
        }
    }

    #[test]
    fn terminal_flow_can_reopen() {
        let mut flow = flow_in_confirming();
        flow.set_note("note").unwrap();
        flow.begin_submit().unwrap();
        flow.finish(1, 0).unwrap();

        flow.begin(1).unwrap();
        assert_eq!(flow.name(), "selecting");
        assert!(flow.selection().unwrap().is_empty());
    }

    #[test]
    fn cancel_discards_local_state() {
        let mut flow = flow_in_confirming();
        flow.cancel();
        assert_eq!(flow, DispenseFlow::Idle);
    }
}
