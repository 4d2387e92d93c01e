//! Dispensing coordinator: turns a confirmed selection plus a mandatory
//! note into exactly one terminal status change per targeted prescription.

use std::collections::HashSet;
use std::sync::Arc;

use ulid::Ulid;

use domain::prescriptions::{DispenseFlow, DispenseRequest, Prescription};

use crate::catalog::Catalog;
use crate::errors::Error;
use crate::records::{DispenseReceipt, RecordsApi};
use crate::session::SessionContext;

/// Aggregate outcome of one operator action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BatchOutcome {
    Succeeded { dispensed: usize },
    PartiallyFailed { dispensed: usize, failed: usize },
    Failed { failed: usize },
}

/// Per-item results of a batch submission. Item outcomes are independent;
/// one failure never rolls back the others.
#[derive(Debug)]
pub struct DispenseReport {
    pub dispensed: Vec<(String, DispenseReceipt)>,
    pub failed: Vec<(String, Error)>,
    /// Refetched catalog after ≥1 success, so Active→Dispensed becomes
    /// visible without optimistic local mutation. `None` when nothing
    /// succeeded or the refetch itself failed (callers render the stale
    /// list plus the error).
    pub refreshed: Option<Vec<Prescription>>,
}

impl DispenseReport {
    pub fn outcome(&self) -> BatchOutcome {
        match (self.dispensed.len(), self.failed.len()) {
            (0, failed) => BatchOutcome::Failed { failed },
            (dispensed, 0) => BatchOutcome::Succeeded { dispensed },
            (dispensed, failed) => BatchOutcome::PartiallyFailed { dispensed, failed },
        }
    }
}

pub struct DispensingCoordinator {
    api: Arc<dyn RecordsApi>,
    catalog: Catalog,
    flow: DispenseFlow,
    /// Busy guard keyed by prescription id: a prescription with a request
    /// in flight is not independently re-actionable, unrelated ones are.
    in_flight: HashSet<String>,
}

impl DispensingCoordinator {
    pub fn new(api: Arc<dyn RecordsApi>) -> Self {
        Self {
            catalog: Catalog::new(api.clone()),
            api,
            flow: DispenseFlow::default(),
            in_flight: HashSet::new(),
        }
    }

    pub fn flow(&self) -> &DispenseFlow {
        &self.flow
    }

    /// Open the dispensing workflow. Requires a verified patient and at
    /// least one dispensable prescription; otherwise the caller redirects
    /// to verification or shows an empty state.
    pub fn open(
        &mut self,
        session: &SessionContext,
        prescriptions: &[Prescription],
    ) -> Result<(), Error> {
        session.require_verified()?;
        let dispensable = prescriptions
            .iter()
            .filter(|p| p.status.is_dispensable())
            .count();
        self.flow.begin(dispensable)?;
        Ok(())
    }

    pub fn toggle(&mut self, name: &str) -> Result<bool, Error> {
        Ok(self.flow.toggle(name)?)
    }

    pub fn confirm(&mut self) -> Result<(), Error> {
        Ok(self.flow.confirm()?)
    }

    pub fn revise(&mut self) -> Result<(), Error> {
        Ok(self.flow.revise()?)
    }

    pub fn set_note(&mut self, note: &str) -> Result<(), Error> {
        Ok(self.flow.set_note(note)?)
    }

    /// Discard local workflow state. Anything already in flight is not
    /// aborted; its result still lands in the record system and the next
    /// fetch reflects the true state.
    pub fn cancel(&mut self) {
        self.flow.cancel();
    }

    /// Submit the confirmed selection: one request per selected
    /// prescription, every item resolved before the aggregate is
    /// reported. Local validation failures never reach the network.
    pub async fn submit(
        &mut self,
        session: &SessionContext,
        prescriptions: &[Prescription],
    ) -> Result<DispenseReport, Error> {
        let patient = session.require_verified()?.clone();
        let (selection, note) = self.flow.begin_submit()?;

        let targets: Vec<&Prescription> = prescriptions
            .iter()
            .filter(|p| selection.contains(&p.medication_name))
            .collect();

        let mut dispensed = Vec::new();
        let mut failed = Vec::new();

        for target in targets {
            if target.status.is_terminal() {
                failed.push((
                    target.id.clone(),
                    Error::Validation(domain::Error::InvalidStateTransition {
                        from: target.status.as_str().to_string(),
                        to: "dispensed".to_string(),
                    }),
                ));
                continue;
            }
            if !self.in_flight.insert(target.id.clone()) {
                tracing::warn!(prescription_id = %target.id, "dispense already in flight, skipping");
                continue;
            }

            let request = DispenseRequest::new(
                patient.id.clone(),
                target.id.clone(),
                session.practitioner_id.clone(),
                note.clone(),
            );

            let result = self.dispense_once(&request).await;
            self.in_flight.remove(&target.id);

            match result {
                Ok(receipt) => dispensed.push((target.id.clone(), receipt)),
                Err(err) => failed.push((target.id.clone(), err)),
            }
        }

        self.flow.finish(dispensed.len(), failed.len())?;

        let refreshed = if dispensed.is_empty() {
            None
        } else {
            self.catalog.for_patient(session).await.ok()
        };

        Ok(DispenseReport {
            dispensed,
            failed,
            refreshed,
        })
    }

    /// Dispense one targeted prescription outside the batch modal (the
    /// per-row action). Same gates: verified patient, non-empty note,
    /// non-terminal status, busy guard.
    pub async fn submit_single(
        &mut self,
        session: &SessionContext,
        prescription: &Prescription,
        note: &str,
    ) -> Result<DispenseReceipt, Error> {
        let patient = session.require_verified()?.clone();

        let note = note.trim();
        if note.is_empty() {
            return Err(domain::Error::validation("A dispensing note is required").into());
        }
        if prescription.status.is_terminal() {
            return Err(domain::Error::InvalidStateTransition {
                from: prescription.status.as_str().to_string(),
                to: "dispensed".to_string(),
            }
            .into());
        }
        if !self.in_flight.insert(prescription.id.clone()) {
            return Err(domain::Error::validation(format!(
                "Dispensing of {} is already in progress",
                prescription.id
            ))
            .into());
        }

        let request = DispenseRequest::new(
            patient.id.clone(),
            prescription.id.clone(),
            session.practitioner_id.clone(),
            note.to_string(),
        );

        let result = self.dispense_once(&request).await;
        self.in_flight.remove(&prescription.id);
        result
    }

    /// Primary endpoint, then at most one fallback attempt - and only
    /// when the primary failed at transport level. A business-level
    /// rejection is final; retrying it would risk a duplicate dispensing
    /// record.
    async fn dispense_once(&self, request: &DispenseRequest) -> Result<DispenseReceipt, Error> {
        let operation_id = Ulid::new().to_string();

        tracing::info!(
            operation_id = %operation_id,
            prescription_id = %request.prescription_id,
            pharmacist_id = %request.pharmacist_id,
            "dispense attempt"
        );

        let result = match self.api.dispense(request).await {
            Err(err) if err.is_transport() => {
                tracing::warn!(
                    operation_id = %operation_id,
                    prescription_id = %request.prescription_id,
                    error = %err,
                    "primary dispense endpoint unreachable, trying fallback"
                );
                self.api.dispense_fallback(request).await
            }
            other => other,
        };

        match &result {
            Ok(receipt) => tracing::info!(
                operation_id = %operation_id,
                prescription_id = %request.prescription_id,
                pharmacist_id = %request.pharmacist_id,
                transaction_id = receipt.transaction_id.as_deref().unwrap_or("n/a"),
                "dispense succeeded"
            ),
            Err(err) => tracing::error!(
                operation_id = %operation_id,
                prescription_id = %request.prescription_id,
                pharmacist_id = %request.pharmacist_id,
                error = %err,
                "dispense failed"
            ),
        }

        result
    }
}
