//! HTTP boundary to the remote record system.
//!
//! Every response uses the envelope `{ success, data, error?, details? }`.
//! Connectivity failures map to `Transport`; a reachable server answering
//! with a non-success envelope maps to `Rejected` carrying the remote
//! message and details.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use domain::prescriptions::{DispenseRequest, NewPrescriptionBatch};

use crate::config::Config;
use crate::errors::Error;

/// Primary dispense path; `/doctor/prescriptions/dispense` in some older
/// clients is treated as a copy-paste artifact of the same endpoint.
const DISPENSE_PATH: &str = "/prescriptions/dispense";
const DISPENSE_FALLBACK_PATH: &str = "/pharmacist/dispense";

const GENERIC_FETCH_ERROR: &str = "Failed to fetch prescriptions";

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    pub error: Option<String>,
    pub details: Option<Value>,
}

impl Envelope {
    /// Unwrap the envelope, turning a business-level non-success into a
    /// `Rejected` error with the remote message.
    pub fn into_data(self) -> Result<Value, Error> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FETCH_ERROR.to_string());
        let details = self.details.map(|d| match d {
            Value::String(s) => s,
            other => other.to_string(),
        });
        Err(Error::rejected(message, details))
    }
}

/// Acknowledgement of a dispensing write; the ledger transaction id when
/// the record system reports one.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispenseReceipt {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// The seam the coordinator, catalog, and authoring workflow depend on.
/// Raw `Value` payloads are returned for the reads because the remote
/// shapes are heterogeneous; normalization happens in the domain layer.
#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn prescriptions_for_patient(&self, patient_id: &str) -> Result<Value, Error>;

    async fn prescriptions_for_practitioner(&self, practitioner_id: &str)
        -> Result<Value, Error>;

    /// Primary dispense endpoint.
    async fn dispense(&self, request: &DispenseRequest) -> Result<DispenseReceipt, Error>;

    /// Documented fallback with an equivalent payload shape. Callers
    /// attempt it at most once, and only after a transport-level failure
    /// of the primary.
    async fn dispense_fallback(&self, request: &DispenseRequest)
        -> Result<DispenseReceipt, Error>;

    /// Submit a new prescription batch atomically.
    async fn create_prescriptions(&self, batch: &NewPrescriptionBatch) -> Result<(), Error>;
}

pub struct HttpRecordsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRecordsClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.records_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, Error> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> Result<Value, Error> {
        let status = response.status();
        let envelope: Envelope = response.json().await.map_err(|e| {
            if status.is_success() {
                Error::transport(format!("Malformed response: {e}"))
            } else {
                Error::rejected(format!("Request failed with status {status}"), None)
            }
        })?;
        envelope.into_data()
    }
}

#[async_trait]
impl RecordsApi for HttpRecordsClient {
    async fn prescriptions_for_patient(&self, patient_id: &str) -> Result<Value, Error> {
        self.get(&format!("/prescriptions/patient/{patient_id}")).await
    }

    async fn prescriptions_for_practitioner(
        &self,
        practitioner_id: &str,
    ) -> Result<Value, Error> {
        self.get(&format!("/prescriptions/practitioner/{practitioner_id}"))
            .await
    }

    async fn dispense(&self, request: &DispenseRequest) -> Result<DispenseReceipt, Error> {
        let data = self.post(DISPENSE_PATH, request).await?;
        Ok(serde_json::from_value(data).unwrap_or_default())
    }

    async fn dispense_fallback(
        &self,
        request: &DispenseRequest,
    ) -> Result<DispenseReceipt, Error> {
        let data = self.post(DISPENSE_FALLBACK_PATH, request).await?;
        Ok(serde_json::from_value(data).unwrap_or_default())
    }

    async fn create_prescriptions(&self, batch: &NewPrescriptionBatch) -> Result<(), Error> {
        self.post("/prescriptions", batch).await.map(|_| ())
    }
}
