use std::sync::Arc;

use domain::prescriptions::{normalize, Prescription};

use crate::errors::Error;
use crate::records::RecordsApi;
use crate::session::SessionContext;

/// Read side of the record system: fetch, normalize, sort.
///
/// Remote ordering is never trusted; results are sorted most-recent-first
/// by issued timestamp here. On error the caller renders an empty
/// collection plus the message - nothing in this layer panics.
pub struct Catalog {
    api: Arc<dyn RecordsApi>,
}

impl Catalog {
    pub fn new(api: Arc<dyn RecordsApi>) -> Self {
        Self { api }
    }

    /// Prescriptions for the session's verified patient. Gated: without a
    /// verified patient no request is made.
    pub async fn for_patient(&self, session: &SessionContext) -> Result<Vec<Prescription>, Error> {
        let patient = session.require_verified()?;
        let data = self.api.prescriptions_for_patient(&patient.id).await?;
        Ok(Self::canonical(&data))
    }

    /// Prescriptions issued or dispensed by the session's practitioner.
    pub async fn for_practitioner(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<Prescription>, Error> {
        let data = self
            .api
            .prescriptions_for_practitioner(&session.practitioner_id)
            .await?;
        Ok(Self::canonical(&data))
    }

    fn canonical(data: &serde_json::Value) -> Vec<Prescription> {
        let mut prescriptions = normalize::prescriptions_from_response(data);
        prescriptions.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        prescriptions
    }
}
