use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Session-scoped assertion that patient identity has been verified.
/// Held until the operator explicitly verifies a different patient.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct VerifiedPatient {
    pub id: String,
    pub name: String,
    pub birthday: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Pharmacist,
    Patient,
    Admin,
}

/// Explicit session context, created at login and passed by reference to
/// every component that needs it. No ambient global lookups.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SessionContext {
    pub role: Role,
    pub practitioner_id: String,
    pub practitioner_name: String,
    verified_patient: Option<VerifiedPatient>,
}

impl SessionContext {
    pub fn new(role: Role, practitioner_id: &str, practitioner_name: &str) -> Self {
        Self {
            role,
            practitioner_id: practitioner_id.to_string(),
            practitioner_name: practitioner_name.to_string(),
            verified_patient: None,
        }
    }

    pub fn verified_patient(&self) -> Option<&VerifiedPatient> {
        self.verified_patient.as_ref()
    }

    pub fn set_verified(&mut self, patient: VerifiedPatient) {
        self.verified_patient = Some(patient);
    }

    /// Discard the current assertion; protected operations re-gate.
    pub fn clear_verification(&mut self) {
        self.verified_patient = None;
    }

    /// The gate every prescription-affecting operation passes first.
    pub fn require_verified(&self) -> Result<&VerifiedPatient, Error> {
        self.verified_patient.as_ref().ok_or_else(|| {
            Error::verification("No verified patient; identity verification is required")
        })
    }
}

/// Durable persistence of the session so a reload does not force
/// re-verification.
pub trait SessionStore {
    fn load(&self) -> Result<Option<SessionContext>, Error>;
    fn save(&self, session: &SessionContext) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// JSON file under the user's home directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rxledger")
                .join("session.json")
        });
        Self { path }
    }

    fn store_error(err: impl std::fmt::Display) -> Error {
        Error::Store {
            message: err.to_string(),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionContext>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(Self::store_error)?;
        let session = serde_json::from_str(&raw).map_err(Self::store_error)?;
        Ok(Some(session))
    }

    fn save(&self, session: &SessionContext) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(Self::store_error)?;
        }
        let raw = serde_json::to_string_pretty(session).map_err(Self::store_error)?;
        fs::write(&self.path, raw).map_err(Self::store_error)
    }

    fn clear(&self) -> Result<(), Error> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(Self::store_error)?;
        }
        Ok(())
    }
}
