/// Canonical prescription record and status machine
pub mod record;

/// Response normalization (casing-tolerant)
pub mod normalize;

/// Medication selection for one dispensing session
pub mod selection;

/// Dispensing workflow state machine
pub mod flow;

/// Authoring draft (doctor side)
pub mod draft;

/// Wire DTOs
pub mod inputs;

pub use draft::{MedicationLine, PrescriptionDraft};
pub use flow::DispenseFlow;
pub use inputs::{DispenseRequest, NewPrescriptionBatch};
pub use record::{Prescription, PrescriptionStatus};
pub use selection::{selected_elsewhere, MedicationSelectionSet};
